//! Extractor plugins (spec §4.3): turn a repository's files into raw
//! entities and edges for a single schema profile. Extractors know nothing
//! about merge keys, validation, or the store; that is the builder's job.

pub mod ansible;
pub mod detect;
pub mod generic;
pub mod pool;
pub mod python;
pub mod walk;

use std::path::Path;

use graphrag_core::model::{RawEdge, RawEntity};

/// One extractor plugin, keyed by schema profile name in [`ExtractorRegistry`].
pub trait Extractor: Send + Sync {
    /// Name of the [`graphrag_core::schema::SchemaProfile`] this extractor's
    /// output validates against.
    fn schema_profile(&self) -> &'static str;

    fn extract_entities(&self, root: &Path, repository_id: &str) -> Vec<RawEntity>;

    fn extract_edges(&self, root: &Path, repository_id: &str) -> Vec<RawEdge>;
}

/// Dispatch table from repo-type name to extractor, built once at startup.
pub struct ExtractorRegistry {
    extractors: std::collections::HashMap<&'static str, Box<dyn Extractor>>,
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::bundled()
    }
}

impl ExtractorRegistry {
    pub fn bundled() -> Self {
        let mut extractors: std::collections::HashMap<&'static str, Box<dyn Extractor>> =
            std::collections::HashMap::new();
        extractors.insert("ansible", Box::new(ansible::AnsibleExtractor));
        extractors.insert("python", Box::new(python::PythonExtractor));
        extractors.insert("generic", Box::new(generic::GenericExtractor));
        Self { extractors }
    }

    pub fn get(&self, repo_type: &str) -> Option<&dyn Extractor> {
        self.extractors.get(repo_type).map(|e| e.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_resolves_bundled_extractors() {
        let registry = ExtractorRegistry::bundled();
        assert!(registry.get("ansible").is_some());
        assert!(registry.get("python").is_some());
        assert!(registry.get("generic").is_some());
        assert!(registry.get("nonexistent").is_none());
    }
}
