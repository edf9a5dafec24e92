//! Parser plugins (spec §4.2): pure, per-file syntactic parsing with no
//! knowledge of the graph store. Each parser turns one file's bytes into a
//! typed [`ParseResult`]; a failed parse never panics, it degrades to
//! `success: false` and an empty metadata value so the extractor can still
//! emit a bare `File` node.

pub mod jinja;
pub mod python;
pub mod ruby;
pub mod yaml;

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Per-YAML-file Ansible structure metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YamlMeta {
    pub is_playbook: bool,
    pub is_vars_file: bool,
    pub is_requirements: bool,
    pub play_count: usize,
    pub task_count: usize,
    pub handler_count: usize,
    pub role_names: Vec<String>,
    pub var_names: Vec<String>,
}

/// Per-Python-file AST metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PythonMeta {
    pub classes: Vec<PythonClass>,
    pub functions: Vec<PythonFunction>,
    pub imports: Vec<PythonImport>,
    pub is_inventory: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PythonClass {
    pub name: String,
    pub bases: Vec<String>,
    pub decorators: Vec<String>,
    pub docstring: Option<String>,
    pub methods: Vec<PythonFunction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PythonFunction {
    pub name: String,
    pub is_async: bool,
    pub decorators: Vec<String>,
    pub docstring: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PythonImport {
    pub module: String,
    pub alias: Option<String>,
    pub is_from_import: bool,
}

/// Per-Jinja2-template metadata (two-pass regex scan: `{{ }}` expressions
/// then `{% %}` tags).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JinjaMeta {
    pub variables_used: Vec<String>,
    pub filters_used: Vec<String>,
    pub blocks: Vec<String>,
    pub includes: Vec<String>,
    pub macros: Vec<String>,
}

/// Per-Vagrantfile metadata (line-oriented regex scan).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RubyMeta {
    pub boxes: Vec<String>,
    pub networks: Vec<String>,
    pub provisioners: Vec<String>,
}

/// The per-language metadata a parser produces, never exposed outside this
/// crate as an untyped map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParseMetadata {
    Yaml(YamlMeta),
    Python(PythonMeta),
    Jinja(JinjaMeta),
    Ruby(RubyMeta),
    None,
}

/// A parsed syntax tree. Kept as an internal enum rather than untyped JSON:
/// parsers that don't need a retained tree (regex-based ones) carry `None`.
pub enum ParseTree {
    Yaml(serde_yaml::Value),
    Python(tree_sitter::Tree),
}

/// The result of parsing one file. Never panics on a malformed file: a
/// failed parse sets `success: false`, leaves `root` empty, and still
/// reports what went wrong in `errors` (spec §4.2).
pub struct ParseResult {
    pub success: bool,
    pub errors: Vec<String>,
    pub root: Option<ParseTree>,
    pub metadata: ParseMetadata,
}

impl ParseResult {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            errors: vec![error.into()],
            root: None,
            metadata: ParseMetadata::None,
        }
    }
}

/// One parser plugin, keyed by a string file-kind id in [`ParserRegistry`].
/// Declared polymorphism, no runtime inheritance: the registry is a lookup
/// table, not a trait object hierarchy with virtual dispatch beyond this
/// single trait.
pub trait Parser: Send + Sync {
    fn parse(&self, path: &Path, source: &[u8]) -> ParseResult;
}

/// Dispatch table from file-kind id to parser, built once at startup.
pub struct ParserRegistry {
    parsers: std::collections::HashMap<&'static str, Box<dyn Parser>>,
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::bundled()
    }
}

impl ParserRegistry {
    pub fn bundled() -> Self {
        let mut parsers: std::collections::HashMap<&'static str, Box<dyn Parser>> =
            std::collections::HashMap::new();
        parsers.insert("yaml", Box::new(yaml::YamlParser));
        parsers.insert("jinja", Box::new(jinja::JinjaParser));
        parsers.insert("python", Box::new(python::PythonParser));
        parsers.insert("ruby", Box::new(ruby::RubyParser));
        Self { parsers }
    }

    pub fn get(&self, kind: &str) -> Option<&dyn Parser> {
        self.parsers.get(kind).map(|p| p.as_ref())
    }

    /// Picks a parser kind id from a file extension; `None` means the
    /// generic extractor handles the file with no language-specific parse.
    pub fn kind_for_extension(ext: &str) -> Option<&'static str> {
        match ext {
            "yml" | "yaml" => Some("yaml"),
            "j2" | "jinja2" | "jinja" => Some("jinja"),
            "py" => Some("python"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_resolves_bundled_parsers() {
        let registry = ParserRegistry::bundled();
        assert!(registry.get("yaml").is_some());
        assert!(registry.get("python").is_some());
        assert!(registry.get("jinja").is_some());
        assert!(registry.get("ruby").is_some());
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn kind_for_extension_maps_known_suffixes() {
        assert_eq!(ParserRegistry::kind_for_extension("yml"), Some("yaml"));
        assert_eq!(ParserRegistry::kind_for_extension("j2"), Some("jinja"));
        assert_eq!(ParserRegistry::kind_for_extension("py"), Some("python"));
        assert_eq!(ParserRegistry::kind_for_extension("rb"), None);
    }
}
