//! Python parser (spec §4.3): tree-sitter AST walk for classes, functions,
//! imports. Used both by the `python` profile extractor and by the
//! `ansible` profile extractor's inventory-script detection.

use std::path::Path;

use tree_sitter::Node;

use crate::{
    ParseMetadata, ParseResult, ParseTree, Parser, PythonClass, PythonFunction, PythonImport,
    PythonMeta,
};

pub struct PythonParser;

impl Parser for PythonParser {
    fn parse(&self, _path: &Path, source: &[u8]) -> ParseResult {
        let content = match std::str::from_utf8(source) {
            Ok(s) => s,
            Err(e) => return ParseResult::failed(format!("not valid utf-8: {e}")),
        };

        let language: tree_sitter::Language = tree_sitter_python::LANGUAGE.into();
        let mut parser = tree_sitter::Parser::new();
        if parser.set_language(&language).is_err() {
            return ParseResult::failed("failed to load python grammar");
        }
        let Some(tree) = parser.parse(source, None) else {
            return ParseResult::failed("tree-sitter produced no tree");
        };
        if tree.root_node().has_error() {
            // Still usable: tree-sitter is error-tolerant, so we keep
            // whatever structure it recovered rather than discarding it.
            tracing::debug!("python parse tree contains error nodes");
        }

        let mut classes = Vec::new();
        let mut functions = Vec::new();
        let mut imports = Vec::new();
        walk(&tree.root_node(), content, &mut classes, &mut functions, &mut imports);

        let is_inventory = functions
            .iter()
            .any(|f| f.name == "hosts" || f.name == "_meta" || f.name == "list_hosts");

        let metadata = PythonMeta {
            classes,
            functions,
            imports,
            is_inventory,
        };

        ParseResult {
            success: true,
            errors: Vec::new(),
            root: Some(ParseTree::Python(tree)),
            metadata: ParseMetadata::Python(metadata),
        }
    }
}

fn walk(
    node: &Node,
    source: &str,
    classes: &mut Vec<PythonClass>,
    functions: &mut Vec<PythonFunction>,
    imports: &mut Vec<PythonImport>,
) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "function_definition" => {
                functions.push(function_from_node(&child, source));
            }
            "class_definition" => {
                classes.push(class_from_node(&child, source));
            }
            "decorated_definition" => {
                walk(&child, source, classes, functions, imports);
            }
            "import_statement" => {
                imports.extend(import_statement(&child, source));
            }
            "import_from_statement" => {
                imports.extend(from_import_statement(&child, source));
            }
            _ => walk(&child, source, classes, functions, imports),
        }
    }
}

fn text<'a>(node: &Node, source: &'a str) -> &'a str {
    &source[node.byte_range()]
}

fn decorators_of<'a>(node: &Node<'a>, source: &str) -> Vec<String> {
    let Some(parent) = node.parent() else {
        return Vec::new();
    };
    if parent.kind() != "decorated_definition" {
        return Vec::new();
    }
    let mut cursor = parent.walk();
    parent
        .children(&mut cursor)
        .filter(|c| c.kind() == "decorator")
        .map(|c| text(&c, source).trim_start_matches('@').to_string())
        .collect()
}

fn docstring_of(body: Option<Node>, source: &str) -> Option<String> {
    let body = body?;
    let first = body.named_child(0)?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let expr = first.named_child(0)?;
    if expr.kind() != "string" {
        return None;
    }
    Some(text(&expr, source).trim_matches(['"', '\'']).to_string())
}

fn function_from_node(node: &Node, source: &str) -> PythonFunction {
    let name = node
        .child_by_field_name("name")
        .map(|n| text(&n, source).to_string())
        .unwrap_or_default();
    let is_async = node
        .child(0)
        .map(|c| c.kind() == "async")
        .unwrap_or(false);
    PythonFunction {
        name,
        is_async,
        decorators: decorators_of(node, source),
        docstring: docstring_of(node.child_by_field_name("body"), source),
    }
}

fn class_from_node(node: &Node, source: &str) -> PythonClass {
    let name = node
        .child_by_field_name("name")
        .map(|n| text(&n, source).to_string())
        .unwrap_or_default();
    let bases = node
        .child_by_field_name("superclasses")
        .map(|arglist| {
            let mut cursor = arglist.walk();
            arglist
                .named_children(&mut cursor)
                .map(|c| text(&c, source).to_string())
                .collect()
        })
        .unwrap_or_default();

    let body = node.child_by_field_name("body");
    let mut methods = Vec::new();
    if let Some(body) = body {
        let mut cursor = body.walk();
        for child in body.children(&mut cursor) {
            match child.kind() {
                "function_definition" => methods.push(function_from_node(&child, source)),
                "decorated_definition" => {
                    if let Some(inner) = child
                        .named_children(&mut child.walk())
                        .find(|c| c.kind() == "function_definition")
                    {
                        methods.push(function_from_node(&inner, source));
                    }
                }
                _ => {}
            }
        }
    }

    PythonClass {
        name,
        decorators: decorators_of(node, source),
        docstring: docstring_of(body, source),
        methods,
        bases,
    }
}

fn import_statement(node: &Node, source: &str) -> Vec<PythonImport> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter_map(|child| match child.kind() {
            "dotted_name" => Some(PythonImport {
                module: text(&child, source).to_string(),
                alias: None,
                is_from_import: false,
            }),
            "aliased_import" => {
                let module = child
                    .child_by_field_name("name")
                    .map(|n| text(&n, source).to_string())?;
                let alias = child
                    .child_by_field_name("alias")
                    .map(|n| text(&n, source).to_string());
                Some(PythonImport {
                    module,
                    alias,
                    is_from_import: false,
                })
            }
            _ => None,
        })
        .collect()
}

fn from_import_statement(node: &Node, source: &str) -> Vec<PythonImport> {
    let Some(module_node) = node.child_by_field_name("module_name") else {
        return Vec::new();
    };
    let module = text(&module_node, source).to_string();
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| c.id() != module_node.id())
        .filter_map(|child| match child.kind() {
            "dotted_name" | "identifier" => Some(PythonImport {
                module: module.clone(),
                alias: Some(text(&child, source).to_string()),
                is_from_import: true,
            }),
            "aliased_import" => {
                let name = child
                    .child_by_field_name("name")
                    .map(|n| text(&n, source).to_string())?;
                let alias = child
                    .child_by_field_name("alias")
                    .map(|n| text(&n, source).to_string())
                    .unwrap_or(name);
                Some(PythonImport {
                    module: module.clone(),
                    alias: Some(alias),
                    is_from_import: true,
                })
            }
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_class_with_bases_and_abstract_flag() {
        let src = b"class Base:\n    pass\n\nclass Widget(Base):\n    \"\"\"A widget.\"\"\"\n    def render(self):\n        pass\n    async def load(self):\n        pass\n";
        let result = PythonParser.parse(Path::new("widget.py"), src);
        assert!(result.success);
        let ParseMetadata::Python(meta) = result.metadata else {
            panic!("expected python metadata");
        };
        let widget = meta.classes.iter().find(|c| c.name == "Widget").unwrap();
        assert_eq!(widget.bases, vec!["Base".to_string()]);
        assert_eq!(widget.docstring.as_deref(), Some("A widget."));
        assert_eq!(widget.methods.len(), 2);
        assert!(widget.methods.iter().any(|m| m.name == "load" && m.is_async));
    }

    #[test]
    fn extracts_imports_and_from_imports() {
        let src = b"import os\nimport json as j\nfrom typing import List, Dict as D\n";
        let result = PythonParser.parse(Path::new("m.py"), src);
        let ParseMetadata::Python(meta) = result.metadata else {
            panic!("expected python metadata");
        };
        assert!(meta.imports.iter().any(|i| i.module == "os" && !i.is_from_import));
        assert!(meta.imports.iter().any(|i| i.module == "json" && i.alias.as_deref() == Some("j")));
        assert!(meta
            .imports
            .iter()
            .any(|i| i.module == "typing" && i.alias.as_deref() == Some("List") && i.is_from_import));
    }

    #[test]
    fn detects_inventory_script_by_entrypoint_function() {
        let src = b"def hosts():\n    return {}\n\ndef _meta():\n    return {}\n";
        let result = PythonParser.parse(Path::new("inventory.py"), src);
        let ParseMetadata::Python(meta) = result.metadata else {
            panic!("expected python metadata");
        };
        assert!(meta.is_inventory);
    }

    #[test]
    fn malformed_python_does_not_panic() {
        let src = b"\xff\xfe not utf8";
        let result = PythonParser.parse(Path::new("bad.py"), src);
        assert!(!result.success);
    }
}
