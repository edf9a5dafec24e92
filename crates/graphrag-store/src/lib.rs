//! The `GraphStore` collaborator (spec §6.1): the interface the Builder and
//! Query layers depend on, an in-memory reference implementation used by
//! every test in the workspace, and the gateway that wraps any store with a
//! per-call timeout and circuit breaker.

pub mod gateway;
pub mod memory;

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use graphrag_core::Result;
use serde_json::Value;

/// One result row from `execute`. Free-form, unlike [`graphrag_core::model::RawEntity`]'s
/// properties: a Cypher row can project counts, paths, and whole node/edge
/// maps, not just scalar node properties.
pub type Row = BTreeMap<String, Value>;

/// A set of property values to upsert for one node or edge instance, keyed
/// by property name.
pub type PropertyMap = BTreeMap<String, Value>;

/// One node to upsert: `merge_keys` gives the property names forming its
/// identity (spec §3.2); `properties` is the full property set to write.
#[derive(Debug, Clone)]
pub struct NodeUpsert {
    pub merge_keys: Vec<String>,
    pub properties: PropertyMap,
}

/// One edge to upsert, matched by its endpoints' kind + merge-key values
/// rather than an internal id (spec §4.5: the builder resolves endpoints to
/// store identities by merge key, never by assuming a prior node exists).
#[derive(Debug, Clone)]
pub struct EdgeUpsert {
    pub source_kind: String,
    pub source_key: PropertyMap,
    pub target_kind: String,
    pub target_key: PropertyMap,
    pub properties: PropertyMap,
}

/// The external property-graph store's interface (spec §6.1). Deliberately
/// store-agnostic: no Cypher string appears in this trait's signature, only
/// in a concrete implementation's internals.
///
/// Generic-parameterized throughout the workspace rather than boxed as
/// `dyn GraphStore`, so every method can stay a plain `async fn`.
pub trait GraphStore: Send + Sync {
    async fn execute(
        &self,
        query: &str,
        params: &BTreeMap<String, Value>,
        deadline: Duration,
    ) -> Result<Vec<Row>>;

    async fn upsert_nodes(&self, kind: &str, rows: Vec<NodeUpsert>) -> Result<()>;

    async fn upsert_edges(&self, kind: &str, matches: Vec<EdgeUpsert>) -> Result<()>;

    async fn clear_repository(&self, repository_id: &str) -> Result<()>;

    async fn clear_all(&self) -> Result<()>;

    async fn list_node_labels(&self) -> Result<HashSet<String>>;

    async fn list_relationship_types(&self) -> Result<HashSet<String>>;

    async fn verify_connectivity(&self) -> Result<()>;
}

/// The live set of node kinds and edge kinds actually present in a store
/// (spec §4.7): what the translator renders into its prompt, never the
/// static profile, since a repository may only use a subset of what its
/// schema permits.
#[derive(Debug, Clone, Default)]
pub struct SchemaSnapshot {
    pub node_labels: HashSet<String>,
    pub relationship_types: HashSet<String>,
}

/// Fetches a [`SchemaSnapshot`] from any store right before query generation.
pub async fn schema_snapshot<S: GraphStore>(store: &S) -> Result<SchemaSnapshot> {
    Ok(SchemaSnapshot {
        node_labels: store.list_node_labels().await?,
        relationship_types: store.list_relationship_types().await?,
    })
}
