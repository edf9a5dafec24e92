//! The Graph Builder (spec §4.5): batches extractor output per node/edge
//! kind, validates every record against the active schema profile, and
//! merge-upserts it into a [`GraphStore`] by composite key.
//!
//! Grounded on `original_source/src/graph/builder.py`'s `_flush_nodes`/
//! `_flush_relationships`: batch-by-kind, skip-and-warn on a missing merge
//! key or failed validation rather than aborting the whole flush, and match
//! an edge's endpoints by `path` (falling back to `name`) plus `repository`
//! — never by a store-internal id the extractor never saw.

use std::collections::BTreeMap;

use graphrag_core::model::{merge_key_for_kind, resolve_merge_key, EndpointRef, PropertyValue, RawEdge, RawEntity};
use graphrag_core::schema::SchemaRegistry;
use graphrag_core::Result;
use graphrag_store::{EdgeUpsert, GraphStore, NodeUpsert, PropertyMap};
use parking_lot::Mutex;

fn to_json(value: &PropertyValue) -> serde_json::Value {
    match value {
        PropertyValue::Str(s) => serde_json::Value::String(s.clone()),
        PropertyValue::Int(n) => serde_json::Value::from(*n),
        PropertyValue::Bool(b) => serde_json::Value::Bool(*b),
        PropertyValue::List(items) => {
            serde_json::Value::Array(items.iter().map(|s| serde_json::Value::String(s.clone())).collect())
        }
        PropertyValue::Null => serde_json::Value::Null,
    }
}

fn to_property_map(entity: &RawEntity) -> PropertyMap {
    entity.properties.iter().map(|(k, v)| (k.clone(), to_json(v))).collect()
}

/// The key used to `MATCH` an edge endpoint: `repository` (unless the kind
/// is globally keyed, i.e. `Role`) plus whichever of `path`/`name` the
/// extractor supplied. Mirrors the original's `from_id = path or name`
/// matching rather than each kind's full composite merge key — an edge
/// endpoint is identified by what the extractor could observe about it, not
/// by re-deriving its complete identity.
fn endpoint_key(endpoint: &EndpointRef, repository_id: &str) -> Option<PropertyMap> {
    let id = endpoint.path.clone().or_else(|| endpoint.name.clone())?;
    let mut key = PropertyMap::new();
    if endpoint.path.is_some() {
        key.insert("path".to_string(), serde_json::Value::String(id));
    } else {
        key.insert("name".to_string(), serde_json::Value::String(id));
    }
    if !merge_key_for_kind(&endpoint.kind).is_global() {
        key.insert("repository".to_string(), serde_json::Value::String(repository_id.to_string()));
    }
    Some(key)
}

#[derive(Default)]
struct Batches {
    nodes: Vec<RawEntity>,
    edges: Vec<(String, RawEdge)>,
}

/// Batches and validates extractor output, flushing per-kind upserts into a
/// `GraphStore`. One flush runs at a time (`parking_lot::Mutex`-guarded),
/// matching the original's single-threaded session-per-flush model.
pub struct GraphBuilder<S: GraphStore> {
    store: S,
    schema: SchemaRegistry,
    profile: String,
    batch_size: usize,
    batches: Mutex<Batches>,
}

impl<S: GraphStore> GraphBuilder<S> {
    pub fn new(store: S, profile: impl Into<String>, batch_size: usize) -> Self {
        Self {
            store,
            schema: SchemaRegistry::bundled(),
            profile: profile.into(),
            batch_size: batch_size.max(1),
            batches: Mutex::new(Batches::default()),
        }
    }

    /// Validates and queues one node. Invalid nodes (failed schema
    /// validation, or missing/null merge-key component) are dropped with a
    /// warning, never causing the batch to fail.
    pub async fn add_node(&self, entity: RawEntity) -> Result<()> {
        if let Err(e) = self.schema.validate_node(&self.profile, &entity) {
            tracing::warn!(kind = %entity.kind, error = %e, "dropping node that failed schema validation");
            return Ok(());
        }
        if resolve_merge_key(&entity).is_none() {
            tracing::warn!(kind = %entity.kind, "dropping node with missing or null merge-key component");
            return Ok(());
        }

        let should_flush = {
            let mut batches = self.batches.lock();
            batches.nodes.push(entity);
            batches.nodes.len() >= self.batch_size
        };
        if should_flush {
            self.flush_nodes().await?;
        }
        Ok(())
    }

    /// Validates and queues one edge, scoped to `repository_id` for
    /// endpoint matching. Edges whose endpoints cannot be identified (no
    /// `path` nor `name`) are dropped with a warning (spec §4.5).
    pub async fn add_edge(&self, repository_id: &str, edge: RawEdge) -> Result<()> {
        if let Err(e) = self.schema.validate_relationship(&self.profile, &edge) {
            tracing::warn!(kind = %edge.kind, error = %e, "dropping edge that failed schema validation");
            return Ok(());
        }
        if !edge.source.is_identifiable() || !edge.target.is_identifiable() {
            tracing::warn!(kind = %edge.kind, "dropping edge with unidentifiable endpoint");
            return Ok(());
        }

        let should_flush = {
            let mut batches = self.batches.lock();
            batches.edges.push((repository_id.to_string(), edge));
            batches.edges.len() >= self.batch_size
        };
        if should_flush {
            self.flush_edges().await?;
        }
        Ok(())
    }

    pub async fn flush(&self) -> Result<()> {
        self.flush_nodes().await?;
        self.flush_edges().await?;
        Ok(())
    }

    /// Unwraps the underlying store, e.g. so a CLI caller holding an
    /// in-memory store can inspect it once the builder is done with it.
    pub fn into_store(self) -> S {
        self.store
    }

    async fn flush_nodes(&self) -> Result<()> {
        let pending = std::mem::take(&mut self.batches.lock().nodes);
        if pending.is_empty() {
            return Ok(());
        }
        tracing::info!(count = pending.len(), "flushing nodes");

        let mut by_kind: BTreeMap<String, Vec<NodeUpsert>> = BTreeMap::new();
        for entity in pending {
            let merge_keys = merge_key_for_kind(&entity.kind).fields().iter().map(|s| s.to_string()).collect();
            by_kind.entry(entity.kind.clone()).or_default().push(NodeUpsert {
                merge_keys,
                properties: to_property_map(&entity),
            });
        }
        for (kind, rows) in by_kind {
            self.store.upsert_nodes(&kind, rows).await?;
        }
        Ok(())
    }

    async fn flush_edges(&self) -> Result<()> {
        let pending = std::mem::take(&mut self.batches.lock().edges);
        if pending.is_empty() {
            return Ok(());
        }
        tracing::info!(count = pending.len(), "flushing edges");

        let mut by_kind: BTreeMap<String, Vec<EdgeUpsert>> = BTreeMap::new();
        for (repository_id, edge) in pending {
            let (Some(source_key), Some(target_key)) = (
                endpoint_key(&edge.source, &repository_id),
                endpoint_key(&edge.target, &repository_id),
            ) else {
                tracing::warn!(kind = %edge.kind, "skipping edge: endpoint key could not be built");
                continue;
            };
            by_kind.entry(edge.kind.clone()).or_default().push(EdgeUpsert {
                source_kind: edge.source.kind.clone(),
                source_key,
                target_kind: edge.target.kind.clone(),
                target_key,
                properties: edge.properties.iter().map(|(k, v)| (k.clone(), to_json(v))).collect(),
            });
        }
        for (kind, matches) in by_kind {
            self.store.upsert_edges(&kind, matches).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphrag_store::memory::InMemoryStore;

    fn file_entity(repo: &str, path: &str) -> RawEntity {
        RawEntity::new("File")
            .with("repository", repo)
            .with("path", path)
            .with("language", "python")
    }

    #[tokio::test]
    async fn valid_node_is_queued_and_flushed() {
        let builder = GraphBuilder::new(InMemoryStore::new(), "generic", 10);
        builder.add_node(file_entity("r1", "a.py")).await.unwrap();
        builder.flush().await.unwrap();
        assert_eq!(builder.store.node_count(), 1);
    }

    #[tokio::test]
    async fn batch_auto_flushes_at_batch_size() {
        let builder = GraphBuilder::new(InMemoryStore::new(), "generic", 2);
        builder.add_node(file_entity("r1", "a.py")).await.unwrap();
        builder.add_node(file_entity("r1", "b.py")).await.unwrap();
        assert_eq!(builder.store.node_count(), 2);
    }

    #[tokio::test]
    async fn node_missing_merge_key_component_is_dropped() {
        let builder = GraphBuilder::new(InMemoryStore::new(), "generic", 10);
        let entity = RawEntity::new("File").with("repository", "r1");
        builder.add_node(entity).await.unwrap();
        builder.flush().await.unwrap();
        assert_eq!(builder.store.node_count(), 0);
    }

    #[tokio::test]
    async fn node_failing_schema_validation_is_dropped() {
        let builder = GraphBuilder::new(InMemoryStore::new(), "generic", 10);
        let entity = RawEntity::new("NotAKind").with("repository", "r1").with("path", "a");
        builder.add_node(entity).await.unwrap();
        builder.flush().await.unwrap();
        assert_eq!(builder.store.node_count(), 0);
    }

    #[tokio::test]
    async fn edge_with_path_endpoints_upserts() {
        let builder = GraphBuilder::new(InMemoryStore::new(), "generic", 10);
        builder.add_node(file_entity("r1", "src")).await.unwrap();
        builder.add_node(file_entity("r1", "src/a.py")).await.unwrap();
        let edge = RawEdge {
            kind: "CONTAINS".to_string(),
            source: EndpointRef { kind: "Directory".to_string(), path: Some("src".to_string()), name: None },
            target: EndpointRef { kind: "File".to_string(), path: Some("src/a.py".to_string()), name: None },
            properties: Default::default(),
        };
        builder.add_edge("r1", edge).await.unwrap();
        builder.flush().await.unwrap();
        assert_eq!(builder.store.edge_count(), 1);
    }

    #[tokio::test]
    async fn edge_with_unidentifiable_endpoint_is_dropped() {
        let builder = GraphBuilder::new(InMemoryStore::new(), "generic", 10);
        let edge = RawEdge {
            kind: "CONTAINS".to_string(),
            source: EndpointRef { kind: "Directory".to_string(), path: None, name: None },
            target: EndpointRef { kind: "File".to_string(), path: Some("a.py".to_string()), name: None },
            properties: Default::default(),
        };
        builder.add_edge("r1", edge).await.unwrap();
        builder.flush().await.unwrap();
        assert_eq!(builder.store.edge_count(), 0);
    }

    #[tokio::test]
    async fn role_edge_key_has_no_repository() {
        let key = endpoint_key(
            &EndpointRef { kind: "Role".to_string(), path: None, name: Some("nginx".to_string()) },
            "r1",
        )
        .unwrap();
        assert!(!key.contains_key("repository"));
        assert_eq!(key.get("name").and_then(|v| v.as_str()), Some("nginx"));
    }
}
