//! The Query Translator (spec §4.7), ported from
//! `original_source/src/mcp/utils/graphrag_client.py::GraphRAGClient
//! .generate_cypher`: renders one of the two prompt templates against a
//! live schema snapshot, calls the LLM behind the `cypher_generation`
//! circuit breaker, strips reasoning/code-fence noise, and hands the result
//! to the row-cap enforcer.

use std::sync::LazyLock;

use graphrag_core::breaker::CircuitBreaker;
use graphrag_core::{Error, Result};
use graphrag_llm::{ChatOptions, LlmClient};
use graphrag_store::SchemaSnapshot;
use regex::Regex;

use crate::guards::row_cap::{enforce_limit, MAX_RESULTS_DEFAULT};
use crate::templates::{render_default, render_multi_repo};

/// Tools with parameterized, deterministic query templates (spec §4.9):
/// suggested as fallbacks when the translator's circuit is open, since they
/// don't need an LLM call at all.
pub const DETERMINISTIC_TOOLS: &[&str] = &[
    "find_dependencies",
    "trace_variable",
    "get_role_usage",
    "analyze_playbook",
    "find_tasks_by_module",
    "get_task_hierarchy",
    "find_template_usage",
];

static THINK_TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("think pattern is valid regex"));
static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:cypher)?").expect("fence pattern is valid regex"));

fn strip_reasoning_and_fences(text: &str) -> String {
    let without_think = THINK_TAGS.replace_all(text, "");
    CODE_FENCE.replace_all(&without_think, "").trim().to_string()
}

/// Wraps an [`LlmClient`] with the translator's prompt selection, circuit
/// breaker, and output post-processing. Kept generic over `L` rather than
/// `dyn`, matching [`graphrag_store::GraphStore`]'s pattern.
pub struct Translator<L: LlmClient> {
    llm: L,
    breaker: CircuitBreaker,
}

impl<L: LlmClient> Translator<L> {
    pub fn new(llm: L) -> Self {
        Self { llm, breaker: CircuitBreaker::cypher_generation() }
    }

    /// spec §4.7: picks the multi-repo template when `repository_id` is
    /// active, else the single-repo default; both embed the live schema
    /// snapshot, never the static profile.
    pub async fn translate(
        &self,
        question: &str,
        repository_id: Option<&str>,
        schema: &SchemaSnapshot,
    ) -> Result<String> {
        if !self.breaker.allow_request() {
            return Err(Error::CircuitOpen {
                breaker: "cypher_generation".to_string(),
                fallback_tools: DETERMINISTIC_TOOLS.iter().map(|s| s.to_string()).collect(),
            });
        }

        let prompt = match repository_id {
            Some(repo) => render_multi_repo(schema, question, repo),
            None => render_default(schema, question),
        };

        let result = self.llm.chat(&prompt, ChatOptions::default()).await;
        match result {
            Ok(raw) => {
                self.breaker.record_success();
                let cleaned = strip_reasoning_and_fences(&raw);
                Ok(enforce_limit(&cleaned, MAX_RESULTS_DEFAULT))
            }
            Err(e) => {
                self.breaker.record_failure();
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubLlm {
        response: String,
        calls: AtomicUsize,
        fail: bool,
    }

    impl LlmClient for StubLlm {
        async fn chat(&self, _prompt: &str, _opts: ChatOptions) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(Error::Unavailable("boom".to_string()))
            } else {
                Ok(self.response.clone())
            }
        }
    }

    fn schema() -> SchemaSnapshot {
        SchemaSnapshot {
            node_labels: HashSet::from(["Playbook".to_string()]),
            relationship_types: HashSet::new(),
        }
    }

    #[tokio::test]
    async fn strips_think_tags_and_code_fences_and_enforces_limit() {
        let llm = StubLlm {
            response: "<think>reasoning</think>```cypher\nMATCH (p:Playbook) RETURN p\n```".to_string(),
            calls: AtomicUsize::new(0),
            fail: false,
        };
        let translator = Translator::new(llm);
        let query = translator.translate("how many playbooks", None, &schema()).await.unwrap();
        assert!(!query.contains("think"));
        assert!(!query.contains("```"));
        assert!(query.contains("LIMIT 100"));
    }

    #[tokio::test]
    async fn circuit_opens_after_repeated_llm_failures() {
        let llm = StubLlm { response: String::new(), calls: AtomicUsize::new(0), fail: true };
        let translator = Translator::new(llm);
        for _ in 0..3 {
            assert!(translator.translate("q", None, &schema()).await.is_err());
        }
        let err = translator.translate("q", None, &schema()).await.unwrap_err();
        assert!(matches!(err, Error::CircuitOpen { .. }));
        assert_eq!(translator.llm.calls.load(Ordering::SeqCst), 3);
    }
}
