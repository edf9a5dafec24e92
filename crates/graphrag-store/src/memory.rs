//! `InMemoryStore`: the concrete `GraphStore` collaborator the rest of the
//! workspace is built and tested against, since the real property-graph
//! store is out of scope (spec §1).
//!
//! Grounded on `rpg-core`'s `RPGraph` (`BTreeMap` of typed records plus a
//! rebuildable index), adapted to the store's untyped row/property-map
//! shape instead of the teacher's typed `Entity`/`DependencyEdge`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use graphrag_core::Result;
use parking_lot::RwLock;
use serde_json::Value;

use crate::{EdgeUpsert, GraphStore, NodeUpsert, PropertyMap, Row};

/// A node's identity: its kind plus the ordered merge-key values, joined
/// into one string. Stable across upserts of the same logical entity.
fn node_identity(kind: &str, merge_keys: &[String], properties: &PropertyMap) -> String {
    let mut parts = vec![kind.to_string()];
    for key in merge_keys {
        let value = properties.get(key).cloned().unwrap_or(Value::Null);
        parts.push(value.to_string());
    }
    parts.join("\u{1f}")
}

fn key_identity(kind: &str, key: &PropertyMap) -> String {
    let mut parts = vec![kind.to_string()];
    for (k, v) in key {
        parts.push(format!("{k}={v}"));
    }
    parts.join("\u{1f}")
}

#[derive(Debug, Clone)]
struct StoredEdge {
    kind: String,
    source_id: String,
    target_id: String,
    properties: PropertyMap,
}

#[derive(Default)]
struct State {
    nodes: BTreeMap<String, PropertyMap>,
    node_kinds: HashMap<String, String>,
    edges: Vec<StoredEdge>,
}

/// In-memory `GraphStore`. One repository's worth of nodes/edges, or many,
/// all keyed by kind-qualified merge key — no persistence, no connection,
/// nothing to time out, matching the spec's explicit store-is-out-of-scope
/// stance (§1).
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.state.read().nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.state.read().edges.len()
    }
}

impl GraphStore for InMemoryStore {
    async fn execute(
        &self,
        query: &str,
        params: &BTreeMap<String, Value>,
        _deadline: Duration,
    ) -> Result<Vec<Row>> {
        // The in-memory store has no query engine; it exists to exercise
        // the upsert/clear/introspection path the builder and gateway
        // actually drive. A literal `RETURN 1` smoke-test query is
        // answered directly so `verify_connectivity`-style probes work.
        tracing::debug!(query, ?params, "in-memory store executing query");
        if query.trim() == "RETURN 1" {
            let mut row = Row::new();
            row.insert("1".to_string(), Value::from(1));
            return Ok(vec![row]);
        }
        Ok(Vec::new())
    }

    async fn upsert_nodes(&self, kind: &str, rows: Vec<NodeUpsert>) -> Result<()> {
        let mut state = self.state.write();
        for row in rows {
            let id = node_identity(kind, &row.merge_keys, &row.properties);
            state
                .nodes
                .entry(id.clone())
                .and_modify(|existing| existing.extend(row.properties.clone()))
                .or_insert_with(|| row.properties.clone());
            state.node_kinds.insert(id, kind.to_string());
        }
        Ok(())
    }

    async fn upsert_edges(&self, kind: &str, matches: Vec<EdgeUpsert>) -> Result<()> {
        let mut state = self.state.write();
        for m in matches {
            let source_id = key_identity(&m.source_kind, &m.source_key);
            let target_id = key_identity(&m.target_kind, &m.target_key);
            let existing = state.edges.iter_mut().find(|e| {
                e.kind == kind && e.source_id == source_id && e.target_id == target_id
            });
            match existing {
                Some(edge) => edge.properties.extend(m.properties),
                None => state.edges.push(StoredEdge {
                    kind: kind.to_string(),
                    source_id,
                    target_id,
                    properties: m.properties,
                }),
            }
        }
        Ok(())
    }

    async fn clear_repository(&self, repository_id: &str) -> Result<()> {
        let mut state = self.state.write();
        let repo_value = Value::from(repository_id);
        let removed: HashSet<String> = state
            .nodes
            .iter()
            .filter(|(_, props)| props.get("repository") == Some(&repo_value))
            .map(|(id, _)| id.clone())
            .collect();
        state.nodes.retain(|id, _| !removed.contains(id));
        state.node_kinds.retain(|id, _| !removed.contains(id));
        state
            .edges
            .retain(|e| !removed.contains(&e.source_id) && !removed.contains(&e.target_id));
        Ok(())
    }

    async fn clear_all(&self) -> Result<()> {
        let mut state = self.state.write();
        state.nodes.clear();
        state.node_kinds.clear();
        state.edges.clear();
        Ok(())
    }

    async fn list_node_labels(&self) -> Result<HashSet<String>> {
        Ok(self.state.read().node_kinds.values().cloned().collect())
    }

    async fn list_relationship_types(&self) -> Result<HashSet<String>> {
        Ok(self.state.read().edges.iter().map(|e| e.kind.clone()).collect())
    }

    async fn verify_connectivity(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, &str)]) -> PropertyMap {
        pairs.iter().map(|(k, v)| (k.to_string(), Value::from(*v))).collect()
    }

    #[tokio::test]
    async fn upsert_nodes_merges_by_key_not_duplicates() {
        let store = InMemoryStore::new();
        let row = NodeUpsert {
            merge_keys: vec!["repository".to_string(), "path".to_string()],
            properties: props(&[("repository", "r1"), ("path", "a.py"), ("language", "python")]),
        };
        store.upsert_nodes("File", vec![row.clone()]).await.unwrap();
        store.upsert_nodes("File", vec![row]).await.unwrap();
        assert_eq!(store.node_count(), 1);
    }

    #[tokio::test]
    async fn upsert_nodes_with_same_key_merges_new_properties() {
        let store = InMemoryStore::new();
        store
            .upsert_nodes(
                "File",
                vec![NodeUpsert {
                    merge_keys: vec!["repository".to_string(), "path".to_string()],
                    properties: props(&[("repository", "r1"), ("path", "a.py")]),
                }],
            )
            .await
            .unwrap();
        store
            .upsert_nodes(
                "File",
                vec![NodeUpsert {
                    merge_keys: vec!["repository".to_string(), "path".to_string()],
                    properties: props(&[("repository", "r1"), ("path", "a.py"), ("language", "python")]),
                }],
            )
            .await
            .unwrap();
        assert_eq!(store.node_count(), 1);
    }

    #[tokio::test]
    async fn clear_repository_removes_only_its_nodes_and_incident_edges() {
        let store = InMemoryStore::new();
        store
            .upsert_nodes(
                "File",
                vec![
                    NodeUpsert {
                        merge_keys: vec!["repository".to_string(), "path".to_string()],
                        properties: props(&[("repository", "r1"), ("path", "a.py")]),
                    },
                    NodeUpsert {
                        merge_keys: vec!["repository".to_string(), "path".to_string()],
                        properties: props(&[("repository", "r2"), ("path", "b.py")]),
                    },
                ],
            )
            .await
            .unwrap();

        store.clear_repository("r1").await.unwrap();
        assert_eq!(store.node_count(), 1);
    }

    #[tokio::test]
    async fn list_node_labels_reflects_upserted_kinds() {
        let store = InMemoryStore::new();
        store
            .upsert_nodes(
                "Module",
                vec![NodeUpsert {
                    merge_keys: vec!["repository".to_string(), "path".to_string()],
                    properties: props(&[("repository", "r1"), ("path", "m.py")]),
                }],
            )
            .await
            .unwrap();
        let labels = store.list_node_labels().await.unwrap();
        assert!(labels.contains("Module"));
    }
}
