//! `GraphStoreGateway`: wraps a `GraphStore` with the per-query deadline,
//! `UNAVAILABLE` error mapping, and the `neo4j_query` circuit breaker from
//! spec §4.10, plus the lazy pool-rebuild rule from spec §5.
//!
//! Rebuild trigger: the spec's "pools are rebuilt when the owning scheduler
//! identity changes" describes the Python driver's asyncio-event-loop
//! affinity check (`neo4j_connection.py::_get_driver`). Tokio's stable API
//! exposes no public, comparable identity for `Handle::current()`, so the
//! nearest faithful analogue is the executing worker thread: a connection
//! pool handed to one tokio worker thread should not silently migrate to
//! another. Keyed by `std::thread::ThreadId` instead.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::thread::ThreadId;
use std::time::Duration;

use graphrag_core::breaker::CircuitBreaker;
use graphrag_core::{Error, Result};
use parking_lot::Mutex;
use serde_json::Value;

use crate::{EdgeUpsert, GraphStore, NodeUpsert, Row};

/// Builds a fresh store handle for the calling thread's pool slot.
pub trait StoreFactory<S: GraphStore>: Send + Sync {
    fn build(&self) -> S;
}

impl<S: GraphStore, F: Fn() -> S + Send + Sync> StoreFactory<S> for F {
    fn build(&self) -> S {
        self()
    }
}

pub struct GraphStoreGateway<S: GraphStore> {
    factory: Box<dyn StoreFactory<S>>,
    pool: Mutex<HashMap<ThreadId, Arc<S>>>,
    breaker: CircuitBreaker,
    timeout: Duration,
}

impl<S: GraphStore + 'static> GraphStoreGateway<S> {
    pub fn new(factory: impl StoreFactory<S> + 'static, timeout: Duration) -> Self {
        Self {
            factory: Box::new(factory),
            pool: Mutex::new(HashMap::new()),
            breaker: CircuitBreaker::neo4j_query(),
            timeout,
        }
    }

    /// The store handle bound to the current worker thread, built fresh the
    /// first time this thread calls the gateway.
    fn handle(&self) -> Arc<S> {
        let thread_id = std::thread::current().id();
        let mut pool = self.pool.lock();
        pool.entry(thread_id)
            .or_insert_with(|| {
                tracing::debug!(?thread_id, "rebuilding store handle for worker thread");
                Arc::new(self.factory.build())
            })
            .clone()
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    async fn guarded<T, Fut>(&self, call: impl FnOnce(Arc<S>) -> Fut) -> Result<T>
    where
        Fut: std::future::Future<Output = Result<T>>,
    {
        if !self.breaker.allow_request() {
            return Err(Error::CircuitOpen {
                breaker: self.breaker.name.to_string(),
                fallback_tools: Vec::new(),
            });
        }
        let handle = self.handle();
        match tokio::time::timeout(self.timeout, call(handle)).await {
            Ok(Ok(value)) => {
                self.breaker.record_success();
                Ok(value)
            }
            Ok(Err(err)) => {
                self.breaker.record_failure();
                Err(err)
            }
            Err(_) => {
                self.breaker.record_failure();
                Err(Error::Timeout(self.timeout))
            }
        }
    }
}

impl<S: GraphStore + 'static> GraphStore for GraphStoreGateway<S> {
    async fn execute(
        &self,
        query: &str,
        params: &BTreeMap<String, Value>,
        deadline: Duration,
    ) -> Result<Vec<Row>> {
        let deadline = deadline.min(self.timeout);
        self.guarded(|store| async move { store.execute(query, params, deadline).await })
            .await
    }

    async fn upsert_nodes(&self, kind: &str, rows: Vec<NodeUpsert>) -> Result<()> {
        self.guarded(|store| async move { store.upsert_nodes(kind, rows).await }).await
    }

    async fn upsert_edges(&self, kind: &str, matches: Vec<EdgeUpsert>) -> Result<()> {
        self.guarded(|store| async move { store.upsert_edges(kind, matches).await }).await
    }

    async fn clear_repository(&self, repository_id: &str) -> Result<()> {
        self.guarded(|store| async move { store.clear_repository(repository_id).await }).await
    }

    async fn clear_all(&self) -> Result<()> {
        self.guarded(|store| async move { store.clear_all().await }).await
    }

    async fn list_node_labels(&self) -> Result<HashSet<String>> {
        self.guarded(|store| async move { store.list_node_labels().await }).await
    }

    async fn list_relationship_types(&self) -> Result<HashSet<String>> {
        self.guarded(|store| async move { store.list_relationship_types().await }).await
    }

    async fn verify_connectivity(&self) -> Result<()> {
        self.guarded(|store| async move { store.verify_connectivity().await }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;

    #[tokio::test]
    async fn delegates_successful_calls_and_keeps_breaker_closed() {
        let gateway = GraphStoreGateway::new(InMemoryStore::new, Duration::from_secs(1));
        gateway
            .upsert_nodes(
                "File",
                vec![NodeUpsert {
                    merge_keys: vec!["repository".to_string(), "path".to_string()],
                    properties: BTreeMap::from([
                        ("repository".to_string(), Value::from("r1")),
                        ("path".to_string(), Value::from("a.py")),
                    ]),
                }],
            )
            .await
            .unwrap();
        let labels = gateway.list_node_labels().await.unwrap();
        assert!(labels.contains("File"));
        assert_eq!(gateway.breaker().failure_count(), 0);
    }

    struct AlwaysFailsStore;

    impl GraphStore for AlwaysFailsStore {
        async fn execute(&self, _: &str, _: &BTreeMap<String, Value>, _: Duration) -> Result<Vec<Row>> {
            Err(Error::Unavailable("down".to_string()))
        }
        async fn upsert_nodes(&self, _: &str, _: Vec<NodeUpsert>) -> Result<()> {
            Err(Error::Unavailable("down".to_string()))
        }
        async fn upsert_edges(&self, _: &str, _: Vec<EdgeUpsert>) -> Result<()> {
            Err(Error::Unavailable("down".to_string()))
        }
        async fn clear_repository(&self, _: &str) -> Result<()> {
            Err(Error::Unavailable("down".to_string()))
        }
        async fn clear_all(&self) -> Result<()> {
            Err(Error::Unavailable("down".to_string()))
        }
        async fn list_node_labels(&self) -> Result<HashSet<String>> {
            Err(Error::Unavailable("down".to_string()))
        }
        async fn list_relationship_types(&self) -> Result<HashSet<String>> {
            Err(Error::Unavailable("down".to_string()))
        }
        async fn verify_connectivity(&self) -> Result<()> {
            Err(Error::Unavailable("down".to_string()))
        }
    }

    #[tokio::test]
    async fn opens_circuit_after_repeated_failures() {
        let gateway = GraphStoreGateway::new(|| AlwaysFailsStore, Duration::from_secs(1));
        for _ in 0..5 {
            assert!(gateway.verify_connectivity().await.is_err());
        }
        let err = gateway.verify_connectivity().await.unwrap_err();
        assert!(matches!(err, Error::CircuitOpen { .. }));
    }
}
