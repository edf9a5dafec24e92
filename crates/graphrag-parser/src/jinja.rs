//! Jinja2 template parser (spec §4.3): two-pass regex scan since no
//! tree-sitter-jinja grammar is bundled — first the `{{ }}` expression
//! pass (variables, filters), then the `{% %}` tag pass (blocks, includes,
//! macros). A regex fallback, not an AST, documented as inferior per
//! spec §4.2.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::{JinjaMeta, ParseMetadata, ParseResult, ParseTree, Parser};

static EXPRESSION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\{\s*(.*?)\s*\}\}").unwrap());
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{%\s*(.*?)\s*%\}").unwrap());
static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*").unwrap());
static BLOCK_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^block\s+(\w+)").unwrap());
static INCLUDE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^include\s+['"]([^'"]+)['"]"#).unwrap());
static MACRO_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^macro\s+(\w+)").unwrap());

const JINJA_KEYWORDS: &[&str] = &[
    "if", "for", "in", "is", "not", "and", "or", "true", "false", "none", "elif", "else",
    "endif", "endfor",
];

pub struct JinjaParser;

impl Parser for JinjaParser {
    fn parse(&self, _path: &Path, source: &[u8]) -> ParseResult {
        let content = match std::str::from_utf8(source) {
            Ok(s) => s,
            Err(e) => return ParseResult::failed(format!("not valid utf-8: {e}")),
        };

        let mut variables = BTreeSet::new();
        let mut filters = BTreeSet::new();
        for caps in EXPRESSION.captures_iter(content) {
            let expr = &caps[1];
            for (index, segment) in expr.split('|').enumerate() {
                let segment = segment.trim();
                if segment.is_empty() {
                    continue;
                }
                let Some(ident) = IDENTIFIER.find(segment) else {
                    continue;
                };
                let ident = ident.as_str();
                if JINJA_KEYWORDS.contains(&ident) {
                    continue;
                }
                // First pipe segment is the value expression, so its root
                // identifier (before any `.`) is a variable reference.
                // Every later segment names a filter.
                if index == 0 {
                    variables.insert(ident.to_string());
                } else {
                    filters.insert(ident.to_string());
                }
            }
        }

        let mut blocks = Vec::new();
        let mut includes = Vec::new();
        let mut macros = Vec::new();
        for caps in TAG.captures_iter(content) {
            let tag = caps[1].trim();
            if let Some(m) = BLOCK_TAG.captures(tag) {
                blocks.push(m[1].to_string());
            } else if let Some(m) = INCLUDE_TAG.captures(tag) {
                includes.push(m[1].to_string());
            } else if let Some(m) = MACRO_TAG.captures(tag) {
                macros.push(m[1].to_string());
            }
        }

        let metadata = JinjaMeta {
            variables_used: variables.into_iter().collect(),
            filters_used: filters.into_iter().collect(),
            blocks,
            includes,
            macros,
        };

        ParseResult {
            success: true,
            errors: Vec::new(),
            root: None,
            metadata: ParseMetadata::Jinja(metadata),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_variables_and_filters() {
        let src = b"Hello {{ user.name | upper | trim }}, you have {{ count }} messages.";
        let result = JinjaParser.parse(Path::new("t.j2"), src);
        let ParseMetadata::Jinja(meta) = result.metadata else {
            panic!("expected jinja metadata");
        };
        assert_eq!(meta.variables_used, vec!["count".to_string(), "user".to_string()]);
        assert_eq!(meta.filters_used, vec!["trim".to_string(), "upper".to_string()]);
    }

    #[test]
    fn extracts_blocks_includes_and_macros() {
        let src = b"{% block content %}{% include \"header.j2\" %}{% macro greet(name) %}{% endmacro %}{% endblock %}";
        let result = JinjaParser.parse(Path::new("t.j2"), src);
        let ParseMetadata::Jinja(meta) = result.metadata else {
            panic!("expected jinja metadata");
        };
        assert_eq!(meta.blocks, vec!["content".to_string()]);
        assert_eq!(meta.includes, vec!["header.j2".to_string()]);
        assert_eq!(meta.macros, vec!["greet".to_string()]);
    }

    #[test]
    fn ignores_keywords_as_variables() {
        let src = b"{{ if }}";
        let result = JinjaParser.parse(Path::new("t.j2"), src);
        let ParseMetadata::Jinja(meta) = result.metadata else {
            panic!("expected jinja metadata");
        };
        assert!(meta.variables_used.is_empty());
    }
}
