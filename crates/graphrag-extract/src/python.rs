//! Python extractor (spec §4.3): one tree-sitter parse per file, producing
//! `File`/`Module`/`Class`/`Function` nodes and `IMPORTS`/`FROM_IMPORTS`
//! module to module edges.
//!
//! Grounded on `original_source/src/extractors/python/__init__.py`: `extract`
//! yields a `File` node per `.py` file alongside `Module`, but
//! `extract_relationships` never links them with `IN_FILE` — only
//! `Module`-to-`Module` import edges.

use std::collections::HashMap;
use std::path::Path;

use graphrag_core::model::{EndpointRef, RawEdge, RawEntity};
use graphrag_parser::{ParseMetadata, Parser as _};
use sha2::{Digest, Sha256};

use crate::walk::discover_files;
use crate::Extractor;

pub struct PythonExtractor;

fn content_hash(source: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source);
    format!("{:x}", hasher.finalize())
}

/// Mirrors the original's `module_extractor.py`: dotted path relative to
/// the repository root, with the file extension stripped.
fn module_name(root: &Path, file: &Path) -> String {
    let rel = file.strip_prefix(root).unwrap_or(file);
    rel.with_extension("")
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(".")
}

fn python_files(root: &Path) -> Vec<std::path::PathBuf> {
    discover_files(root)
        .into_iter()
        .filter(|f| f.extension().and_then(|e| e.to_str()) == Some("py"))
        .collect()
}

impl Extractor for PythonExtractor {
    fn schema_profile(&self) -> &'static str {
        "python"
    }

    fn extract_entities(&self, root: &Path, repository_id: &str) -> Vec<RawEntity> {
        let parser = graphrag_parser::python::PythonParser;
        let mut entities = Vec::new();

        for file in python_files(root) {
            let rel = file.strip_prefix(root).unwrap_or(&file).to_string_lossy().into_owned();
            let Ok(source) = std::fs::read(&file) else {
                continue;
            };
            let result = parser.parse(&file, &source);

            entities.push(
                RawEntity::new("File")
                    .with("repository", repository_id)
                    .with("path", rel.clone())
                    .with("language", "python")
                    .with("content_hash", content_hash(&source)),
            );

            entities.push(
                RawEntity::new("Module")
                    .with("repository", repository_id)
                    .with("path", rel.clone())
                    .with("name", module_name(root, &file)),
            );

            let ParseMetadata::Python(meta) = result.metadata else {
                continue;
            };

            for class in &meta.classes {
                entities.push(
                    RawEntity::new("Class")
                        .with("repository", repository_id)
                        .with("name", class.name.clone())
                        .with("bases", graphrag_core::model::PropertyValue::List(class.bases.clone()))
                        .with(
                            "decorators",
                            graphrag_core::model::PropertyValue::List(class.decorators.clone()),
                        )
                        .with(
                            "is_abstract",
                            class.bases.iter().any(|b| b == "ABC"),
                        )
                        .with("module_path", rel.clone())
                        .with("docstring", class.docstring.clone().unwrap_or_default()),
                );
                for method in &class.methods {
                    entities.push(function_entity(method, repository_id, &rel));
                }
            }

            for function in &meta.functions {
                entities.push(function_entity(function, repository_id, &rel));
            }
        }

        entities
    }

    fn extract_edges(&self, root: &Path, repository_id: &str) -> Vec<RawEdge> {
        let parser = graphrag_parser::python::PythonParser;
        let files = python_files(root);

        let mut path_by_module: HashMap<String, String> = HashMap::new();
        for file in &files {
            let rel = file.strip_prefix(root).unwrap_or(file).to_string_lossy().into_owned();
            path_by_module.insert(module_name(root, file), rel);
        }

        let mut edges = Vec::new();
        for file in &files {
            let rel = file.strip_prefix(root).unwrap_or(file).to_string_lossy().into_owned();
            let Ok(source) = std::fs::read(file) else {
                continue;
            };
            let result = parser.parse(file, &source);
            let ParseMetadata::Python(meta) = result.metadata else {
                continue;
            };

            for import in &meta.imports {
                let kind = if import.is_from_import {
                    "FROM_IMPORTS"
                } else {
                    "IMPORTS"
                };
                let target = match path_by_module.get(&import.module) {
                    Some(path) => EndpointRef {
                        kind: "Module".to_string(),
                        path: Some(path.clone()),
                        name: None,
                    },
                    None => EndpointRef {
                        kind: "Module".to_string(),
                        path: None,
                        name: Some(import.module.clone()),
                    },
                };
                edges.push(RawEdge {
                    kind: kind.to_string(),
                    source: EndpointRef {
                        kind: "Module".to_string(),
                        path: Some(rel.clone()),
                        name: None,
                    },
                    target,
                    properties: Default::default(),
                });
            }
        }
        let _ = repository_id;
        edges
    }
}

fn function_entity(
    function: &graphrag_parser::PythonFunction,
    repository_id: &str,
    module_path: &str,
) -> RawEntity {
    RawEntity::new("Function")
        .with("repository", repository_id)
        .with("name", function.name.clone())
        .with("is_async", function.is_async)
        .with(
            "decorators",
            graphrag_core::model::PropertyValue::List(function.decorators.clone()),
        )
        .with("docstring", function.docstring.clone().unwrap_or_default())
        .with("module_path", module_path.to_string())
}
