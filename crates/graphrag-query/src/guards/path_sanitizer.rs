//! Path sanitizer (spec §4.10, P10), ported from
//! `original_source/src/mcp/utils/path_sanitizer.py`.

use std::path::{Path, PathBuf};

use graphrag_core::{Error, Result};

/// Rejects null bytes and `..` traversal outright, then (if `allowed_base`
/// is given) confirms the normalized path stays within it.
pub fn sanitize_path(user_path: &str, allowed_base: Option<&Path>) -> Result<PathBuf> {
    if user_path.is_empty() {
        return Err(Error::user_input("empty path provided"));
    }
    if user_path.contains('\0') {
        return Err(Error::user_input("null byte in path"));
    }
    if user_path.contains("..") {
        return Err(Error::user_input("path traversal detected: '..' not allowed"));
    }

    let normalized = PathBuf::from(user_path);
    if normalized.is_absolute() {
        return Err(Error::user_input("absolute paths not allowed"));
    }

    let Some(base) = allowed_base else {
        return Ok(normalized);
    };
    let full_path = base.join(&normalized);
    if !full_path.starts_with(base) {
        return Err(Error::user_input(format!("path escapes allowed directory: {}", base.display())));
    }
    Ok(full_path)
}

/// Returns `true` iff `sanitize_path` would accept `user_path`.
pub fn is_safe_path(user_path: &str, allowed_base: Option<&Path>) -> bool {
    sanitize_path(user_path, allowed_base).is_ok()
}
