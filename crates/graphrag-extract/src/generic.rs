//! Generic extractor (spec §4.3): directory/file enumeration, sha-256
//! content hash, extension-based language tag, `CONTAINS` edges
//! parent->child. Grounded 1:1 on `generic/file_extractor.py`.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use graphrag_core::model::{EndpointRef, RawEdge, RawEntity};
use sha2::{Digest, Sha256};

use crate::walk::discover_files;
use crate::Extractor;

pub struct GenericExtractor;

fn language_tag(ext: &str) -> &'static str {
    match ext.to_lowercase().as_str() {
        "py" => "python",
        "js" => "javascript",
        "ts" => "typescript",
        "yaml" | "yml" => "yaml",
        "json" => "json",
        "md" => "markdown",
        "rst" => "rst",
        "go" => "go",
        "rs" => "rust",
        "rb" => "ruby",
        "sh" => "shell",
        _ => "unknown",
    }
}

fn content_hash(path: &Path) -> Option<String> {
    let bytes = std::fs::read(path).ok()?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Some(format!("{:x}", hasher.finalize()))
}

fn directories_of(root: &Path, files: &[PathBuf]) -> BTreeSet<PathBuf> {
    let mut dirs = BTreeSet::new();
    for file in files {
        let mut parent = file.parent();
        while let Some(p) = parent {
            if p == root {
                break;
            }
            dirs.insert(p.to_path_buf());
            parent = p.parent();
        }
    }
    dirs
}

impl Extractor for GenericExtractor {
    fn schema_profile(&self) -> &'static str {
        "generic"
    }

    fn extract_entities(&self, root: &Path, repository_id: &str) -> Vec<RawEntity> {
        let files = discover_files(root);
        let mut entities = Vec::new();

        for dir in directories_of(root, &files) {
            let rel = dir.strip_prefix(root).unwrap_or(&dir);
            entities.push(
                RawEntity::new("Directory")
                    .with("repository", repository_id)
                    .with("path", rel.to_string_lossy().to_string()),
            );
        }

        for file in &files {
            let rel = file.strip_prefix(root).unwrap_or(file);
            let ext = file.extension().and_then(|e| e.to_str()).unwrap_or("");
            let mut entity = RawEntity::new("File")
                .with("repository", repository_id)
                .with("path", rel.to_string_lossy().to_string())
                .with("language", language_tag(ext));
            if let Some(hash) = content_hash(file) {
                entity = entity.with("content_hash", hash);
            }
            entities.push(entity);
        }

        entities
    }

    fn extract_edges(&self, root: &Path, repository_id: &str) -> Vec<RawEdge> {
        let files = discover_files(root);
        let mut edges = Vec::new();

        let emit = |parent: &Path, child: &Path, edges: &mut Vec<RawEdge>| {
            let Some(parent_rel) = parent.strip_prefix(root).ok() else {
                return;
            };
            if parent == root {
                return;
            }
            let child_rel = child.strip_prefix(root).unwrap_or(child);
            edges.push(RawEdge {
                kind: "CONTAINS".to_string(),
                source: EndpointRef {
                    kind: "Directory".to_string(),
                    path: Some(parent_rel.to_string_lossy().to_string()),
                    name: None,
                },
                target: EndpointRef {
                    kind: "File".to_string(),
                    path: Some(child_rel.to_string_lossy().to_string()),
                    name: None,
                },
                properties: Default::default(),
            });
        };

        for file in &files {
            if let Some(parent) = file.parent() {
                emit(parent, file, &mut edges);
            }
        }

        for dir in directories_of(root, &files) {
            if let Some(parent) = dir.parent()
                && parent != root
            {
                let parent_rel = parent.strip_prefix(root).unwrap_or(parent);
                let dir_rel = dir.strip_prefix(root).unwrap_or(&dir);
                edges.push(RawEdge {
                    kind: "CONTAINS".to_string(),
                    source: EndpointRef {
                        kind: "Directory".to_string(),
                        path: Some(parent_rel.to_string_lossy().to_string()),
                        name: None,
                    },
                    target: EndpointRef {
                        kind: "Directory".to_string(),
                        path: Some(dir_rel.to_string_lossy().to_string()),
                        name: None,
                    },
                    properties: Default::default(),
                });
            }
        }

        let _ = repository_id;
        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn emits_file_and_directory_nodes_with_content_hash() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("src")).unwrap();
        fs::write(tmp.path().join("src/main.py"), "print(1)").unwrap();

        let entities = GenericExtractor.extract_entities(tmp.path(), "repo1");
        let file = entities.iter().find(|e| e.kind == "File").unwrap();
        assert_eq!(file.get("path").unwrap().as_str(), Some("src/main.py"));
        assert_eq!(file.get("language").unwrap().as_str(), Some("python"));
        assert!(file.get("content_hash").is_some());

        let dir = entities.iter().find(|e| e.kind == "Directory").unwrap();
        assert_eq!(dir.get("path").unwrap().as_str(), Some("src"));
    }

    #[test]
    fn emits_contains_edge_from_directory_to_file() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("src")).unwrap();
        fs::write(tmp.path().join("src/main.py"), "").unwrap();

        let edges = GenericExtractor.extract_edges(tmp.path(), "repo1");
        assert!(edges.iter().any(|e| e.kind == "CONTAINS"
            && e.source.path.as_deref() == Some("src")
            && e.target.path.as_deref() == Some("src/main.py")));
    }
}
