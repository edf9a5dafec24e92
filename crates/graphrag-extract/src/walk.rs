//! Bounded file discovery (spec §4.3): skip hidden directories,
//! language-specific cache/vendor directories, and known binary
//! extensions. Grounded on the original's `generic/file_extractor.py`
//! constants.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

pub const IGNORED_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "__pycache__",
    ".venv",
    "venv",
    ".mypy_cache",
    ".pytest_cache",
    ".ruff_cache",
    "dist",
    "build",
];

pub const IGNORED_EXTENSIONS: &[&str] = &[
    "pyc", "pyo", "so", "dylib", "dll", "exe", "bin", "o", "a",
];

fn is_ignored_dir(path: &Path) -> bool {
    path.components().any(|c| {
        let name = c.as_os_str().to_string_lossy();
        IGNORED_DIRS.contains(&name.as_ref()) || (name.starts_with('.') && name.len() > 1 && name != "..")
    })
}

fn is_ignored_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| IGNORED_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// Every regular file under `root`, excluding ignored directories and
/// binary extensions. Ordering is filesystem-walk order; callers must not
/// rely on it (spec §4.3: ordering is per-file, not total).
pub fn discover_files(root: &Path) -> Vec<PathBuf> {
    WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(false)
        .build()
        .flatten()
        .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
        .map(|entry| entry.into_path())
        .filter(|path| !is_ignored_dir(path) && !is_ignored_extension(path))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn skips_ignored_directories_and_extensions() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("src")).unwrap();
        fs::create_dir_all(tmp.path().join("__pycache__")).unwrap();
        fs::write(tmp.path().join("src/main.py"), "").unwrap();
        fs::write(tmp.path().join("__pycache__/main.pyc"), "").unwrap();
        fs::write(tmp.path().join("lib.so"), "").unwrap();

        let files = discover_files(tmp.path());
        let names: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(tmp.path()).unwrap().display().to_string())
            .collect();
        assert!(names.contains(&"src/main.py".to_string()));
        assert!(!names.iter().any(|n| n.contains("__pycache__")));
        assert!(!names.iter().any(|n| n.ends_with(".so")));
    }
}
