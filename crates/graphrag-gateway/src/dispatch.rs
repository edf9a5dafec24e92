//! The tool dispatcher (spec §4.9/§4.10): resolves the active repository,
//! routes to one of the 10 tools, traces the call, and maps internal
//! failures to the same uniform, apologetic text every
//! `original_source/src/mcp/tools/*.py` function formats inline in its own
//! `except` block — centralized here once, since `graphrag_core::Error`
//! gives every tool the same failure shapes instead of each wrapping a
//! different Neo4j/LLM exception type. The per-client rate limit is
//! enforced once, upstream, by `server::rate_limit_middleware`.

use std::sync::Arc;

use graphrag_core::{Error, Result};
use graphrag_llm::LlmClient;
use graphrag_query::guards::RateLimiter;
use graphrag_query::Translator;
use graphrag_store::GraphStore;
use serde_json::Value;

use crate::context::SessionContext;
use crate::tools;
use crate::tracer::ToolTracer;

/// Matches `TIMEOUT_ERROR_MSG` from `neo4j_connection.py`.
const TIMEOUT_ERROR_MSG: &str = "\u{23f1}\u{fe0f} Query timeout: The query exceeded the limit.\n\n\
Suggestions:\n\
- Try a more specific query\n\
- Use deterministic tools like find_dependencies or trace_variable\n\
- Add filters to reduce result set size";

pub struct Dispatcher<S: GraphStore, L: LlmClient> {
    store: S,
    translator: Translator<L>,
    context: SessionContext,
    limiter: RateLimiter,
    tracer: Arc<dyn ToolTracer>,
}

impl<S: GraphStore, L: LlmClient> Dispatcher<S, L> {
    pub fn new(
        store: S,
        translator: Translator<L>,
        limiter: RateLimiter,
        tracer: Arc<dyn ToolTracer>,
    ) -> Self {
        Self { store, translator, context: SessionContext::new(), limiter, tracer }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Invokes `tool` for `session_id`. Returns `Err` only for
    /// protocol-level problems (unknown tool, missing parameter); every
    /// failure inside a tool's own execution comes back as `Ok` text,
    /// matching the MCP convention that a tool call always answers with
    /// content.
    ///
    /// The rate limit itself is enforced once, by the HTTP layer's
    /// `rate_limit_middleware`, before a request ever reaches here —
    /// matching the original's `RateLimitMiddleware`, which wraps every
    /// route and whose tool bodies never re-check.
    pub async fn dispatch(
        &self,
        session_id: &str,
        tool: &str,
        params: &Value,
    ) -> Result<String> {
        let repository_id = match params.get("repository_id").and_then(Value::as_str) {
            Some(id) => {
                validate_repository_id(id)?;
                Some(id.to_string())
            }
            None => self.context.get_repository(session_id),
        };

        self.tracer.on_start(tool);
        let outcome = self.run_tool(session_id, tool, params, repository_id.as_deref()).await;

        match outcome {
            Ok(text) => {
                self.tracer.on_success(tool, &text);
                Ok(text)
            }
            Err(err @ Error::UserInput(_)) => {
                self.tracer.on_error(tool, &err.to_string());
                Err(err)
            }
            Err(err) => {
                let text = format_tool_failure(&err);
                self.tracer.on_error(tool, &err.to_string());
                Ok(text)
            }
        }
    }

    async fn run_tool(
        &self,
        session_id: &str,
        tool: &str,
        params: &Value,
        repository_id: Option<&str>,
    ) -> Result<String> {
        match tool {
            "set_repository_context" => {
                let repo = required_str(params, "repository_id")?;
                validate_repository_id(repo)?;
                self.context.set_repository(session_id, repo);
                Ok(format!("Active repository set to '{repo}'."))
            }
            "query_codebase" => {
                let question = required_str(params, "question")?;
                tools::query_codebase(&self.store, &self.translator, question, repository_id).await
            }
            "query_with_rag" => {
                let question = required_str(params, "question")?;
                let include_cypher = params.get("include_cypher").and_then(Value::as_bool).unwrap_or(false);
                tools::query_with_rag(&self.store, &self.translator, question, repository_id, include_cypher).await
            }
            "find_dependencies" => {
                let file_path = required_str(params, "file_path")?;
                tools::find_dependencies(&self.store, file_path, repository_id).await
            }
            "trace_variable" => {
                let variable_name = required_str(params, "variable_name")?;
                tools::trace_variable(&self.store, variable_name, repository_id).await
            }
            "get_role_usage" => {
                let role_name = required_str(params, "role_name")?;
                tools::get_role_usage(&self.store, role_name, repository_id).await
            }
            "analyze_playbook" => {
                let playbook_path = required_str(params, "playbook_path")?;
                tools::analyze_playbook(&self.store, playbook_path, repository_id).await
            }
            "find_tasks_by_module" => {
                let module_name = required_str(params, "module_name")?;
                tools::find_tasks_by_module(&self.store, module_name, repository_id).await
            }
            "get_task_hierarchy" => {
                let playbook_path = required_str(params, "playbook_path")?;
                tools::get_task_hierarchy(&self.store, playbook_path, repository_id).await
            }
            "find_template_usage" => {
                let template_path = required_str(params, "template_path")?;
                tools::find_template_usage(&self.store, template_path, repository_id).await
            }
            other => Err(Error::user_input(format!("unknown tool: {other}"))),
        }
    }
}

fn required_str<'a>(params: &'a Value, field: &str) -> Result<&'a str> {
    params
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::user_input(format!("missing required param: {field}")))
}

/// Matches the `[A-Za-z0-9_-]+` repository id charset the indexer enforces
/// on ingest (spec.md §9, Open Question 2).
fn validate_repository_id(id: &str) -> Result<()> {
    let valid = !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(Error::user_input(format!("invalid repository_id: {id}")))
    }
}

/// Ported from `QueryTimeoutError`/`CircuitOpenError.format_message()`.
fn format_tool_failure(err: &Error) -> String {
    match err {
        Error::Timeout(_) => TIMEOUT_ERROR_MSG.to_string(),
        Error::CircuitOpen { breaker, fallback_tools } => {
            let mut lines = vec![
                format!("\u{26a1} Service temporarily unavailable: {breaker}"),
                String::new(),
                "The service is experiencing issues. Please try again shortly.".to_string(),
            ];
            if !fallback_tools.is_empty() {
                lines.push(String::new());
                lines.push("In the meantime, try these deterministic tools:".to_string());
                lines.extend(fallback_tools.iter().map(|t| format!("  \u{2022} {t}")));
            }
            lines.join("\n")
        }
        other => format!("Error: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphrag_store::memory::InMemoryStore;
    use serde_json::json;

    struct StubLlm;
    impl LlmClient for StubLlm {
        async fn chat(&self, _prompt: &str, _opts: graphrag_llm::ChatOptions) -> Result<String> {
            Ok("MATCH (p:Playbook) RETURN p LIMIT 10".to_string())
        }
    }

    fn dispatcher() -> Dispatcher<InMemoryStore, StubLlm> {
        Dispatcher::new(
            InMemoryStore::new(),
            Translator::new(StubLlm),
            RateLimiter::new(1000, 1000),
            Arc::new(crate::tracer::NoopTracer),
        )
    }

    #[tokio::test]
    async fn unknown_tool_is_a_protocol_error() {
        let d = dispatcher();
        let err = d.dispatch("s1", "delete_everything", &json!({})).await.unwrap_err();
        assert!(matches!(err, Error::UserInput(_)));
    }

    #[tokio::test]
    async fn missing_required_param_is_a_protocol_error() {
        let d = dispatcher();
        let err = d.dispatch("s1", "find_dependencies", &json!({})).await.unwrap_err();
        assert!(matches!(err, Error::UserInput(_)));
    }

    /// The dispatcher itself never consults the limiter — only the HTTP
    /// middleware in front of it does — so a tight limit doesn't stop calls
    /// made directly against the dispatcher.
    #[tokio::test]
    async fn dispatch_does_not_enforce_the_rate_limit_itself() {
        let d = Dispatcher::new(
            InMemoryStore::new(),
            Translator::new(StubLlm),
            RateLimiter::new(60, 1),
            Arc::new(crate::tracer::NoopTracer),
        );
        let params = json!({"file_path": "a.py"});
        assert!(d.dispatch("s1", "find_dependencies", &params).await.is_ok());
        assert!(d.dispatch("s1", "find_dependencies", &params).await.is_ok());
    }

    #[tokio::test]
    async fn malformed_repository_id_is_a_protocol_error() {
        let d = dispatcher();
        let params = json!({"file_path": "a.py", "repository_id": "not valid!"});
        let err = d.dispatch("s1", "find_dependencies", &params).await.unwrap_err();
        assert!(matches!(err, Error::UserInput(_)));
    }

    #[tokio::test]
    async fn session_repository_is_used_when_no_override_given() {
        let d = dispatcher();
        d.context().set_repository("s1", "repo-a");
        let result = d.dispatch("s1", "find_dependencies", &json!({"file_path": "a.py"})).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn query_codebase_runs_end_to_end_against_in_memory_store() {
        let d = dispatcher();
        // Seed the schema so the translated Cypher's `Playbook` label validates.
        d.store
            .upsert_nodes(
                "Playbook",
                vec![graphrag_store::NodeUpsert {
                    merge_keys: vec!["repository".to_string(), "path".to_string()],
                    properties: std::collections::BTreeMap::from([
                        ("repository".to_string(), Value::from("r1")),
                        ("path".to_string(), Value::from("site.yml")),
                    ]),
                }],
            )
            .await
            .unwrap();
        let result = d.dispatch("s1", "query_codebase", &json!({"question": "how many playbooks"})).await.unwrap();
        assert!(result.contains("No results found"));
    }
}
