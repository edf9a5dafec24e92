//! Indexing pipeline (spec §2, §4.3–§4.5): detect → extract → build.
//!
//! Grounded on `original_source/scripts/build_graph.py`'s `build` command:
//! auto-detect unless a profile is forced, validate the repository id
//! against the same charset the original's CLI checks, run the extractor,
//! then flush through the builder. The Python script extracts nodes then
//! relationships one after another under one progress bar; here the two
//! passes run side by side on the extractor's worker pool instead, since
//! neither reads the other's output.

use std::path::Path;

use graphrag_builder::GraphBuilder;
use graphrag_core::{Error, Result};
use graphrag_extract::pool::WorkerPool;
use graphrag_extract::{detect::detect_repo_type, ExtractorRegistry};
use graphrag_store::GraphStore;

/// Matches the original's `re.match(r"^[a-zA-Z0-9_-]+$", repo_id)` check in
/// `build_graph.py`.
pub fn validate_repository_id(id: &str) -> Result<()> {
    let valid = !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(Error::UserInput(format!(
            "invalid repository id '{id}': use alphanumeric, hyphens, underscores"
        )))
    }
}

#[derive(Debug, Clone)]
pub struct IndexSummary {
    pub profile: String,
    pub confidence: f64,
    pub nodes_extracted: usize,
    pub edges_extracted: usize,
}

/// Runs the full pipeline against `root`, upserting into `store`, and hands
/// the store back alongside the summary so a caller holding an in-memory
/// store can inspect it afterward. Returns `Err(UserInput)` for a bad path,
/// unknown profile override, or invalid repository id; any other failure
/// (schema, builder, store) is the caller's cue to treat this as an
/// unrecoverable run (spec §6.6 exit code 2).
pub async fn index_repository<S: GraphStore>(
    store: S,
    root: &Path,
    repository_id: &str,
    profile_override: Option<&str>,
    batch_size: usize,
    max_workers: usize,
) -> Result<(S, IndexSummary)> {
    if !root.is_dir() {
        return Err(Error::UserInput(format!("not a directory: {}", root.display())));
    }
    validate_repository_id(repository_id)?;

    let registry = ExtractorRegistry::bundled();

    let (profile, confidence) = match profile_override {
        Some(name) => {
            if registry.get(name).is_none() {
                return Err(Error::UserInput(format!("unknown repository profile: {name}")));
            }
            (name.to_string(), 1.0)
        }
        None => {
            let detection = detect_repo_type(root);
            tracing::info!(profile = %detection.profile, confidence = detection.confidence, "detected repository profile");
            (detection.profile, detection.confidence)
        }
    };

    let extractor = registry
        .get(&profile)
        .ok_or_else(|| Error::UserInput(format!("no extractor registered for profile: {profile}")))?;

    let pool = WorkerPool::new(max_workers);
    let (entities, edges) = pool.install(|| {
        rayon::join(
            || extractor.extract_entities(root, repository_id),
            || extractor.extract_edges(root, repository_id),
        )
    });

    let nodes_extracted = entities.len();
    let edges_extracted = edges.len();
    tracing::info!(nodes_extracted, edges_extracted, "extraction complete");

    let builder = GraphBuilder::new(store, profile.as_str(), batch_size);
    for entity in entities {
        builder.add_node(entity).await?;
    }
    for edge in edges {
        builder.add_edge(repository_id, edge).await?;
    }
    builder.flush().await?;

    Ok((
        builder.into_store(),
        IndexSummary {
            profile,
            confidence,
            nodes_extracted,
            edges_extracted,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphrag_store::memory::InMemoryStore;
    use std::fs;

    #[test]
    fn rejects_repository_ids_with_unsafe_characters() {
        assert!(validate_repository_id("my-repo_1").is_ok());
        assert!(validate_repository_id("../etc").is_err());
        assert!(validate_repository_id("").is_err());
    }

    #[tokio::test]
    async fn indexes_a_generic_tree_end_to_end() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.txt"), "hello world").unwrap();

        let (store, summary) =
            index_repository(InMemoryStore::new(), tmp.path(), "demo-repo", Some("generic"), 100, 2)
                .await
                .unwrap();

        assert_eq!(summary.profile, "generic");
        assert!(summary.nodes_extracted > 0);
        assert!(store.node_count() > 0);
    }

    #[tokio::test]
    async fn unknown_profile_override_is_a_user_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = index_repository(InMemoryStore::new(), tmp.path(), "demo-repo", Some("cobol"), 100, 2)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UserInput(_)));
    }

    #[tokio::test]
    async fn invalid_repository_id_is_a_user_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = index_repository(InMemoryStore::new(), tmp.path(), "../bad", None, 100, 2)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UserInput(_)));
    }

    #[tokio::test]
    async fn missing_path_is_a_user_error() {
        let err = index_repository(
            InMemoryStore::new(),
            Path::new("/nonexistent/path/xyz"),
            "demo-repo",
            None,
            100,
            2,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::UserInput(_)));
    }
}
