//! Message shapes for the `/messages` POST endpoint (spec §4.9/§6.4).
//!
//! The original pairs an SSE stream with `SseServerTransport.handle_post_message`,
//! which decodes a JSON-RPC envelope and dispatches by `method`. This port
//! keeps the same envelope shape (`id`, `method`, `params` in; `id`,
//! `result`/`error` out) but routes directly to [`crate::dispatch::Dispatcher`]
//! instead of the `mcp` SDK's internal tool registry, matching
//! `agenticlaw-gateway/src/rpc.rs`'s `route_rpc` dispatch-table idiom.

use graphrag_core::Error;
use graphrag_llm::LlmClient;
use graphrag_store::GraphStore;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::dispatch::Dispatcher;

#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Serialize)]
pub struct RpcResponse {
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

#[derive(Debug, Serialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

/// Routes one decoded `/messages` envelope for `session_id`, returning a
/// response envelope ready to serialize back to the caller. Rate limiting
/// happens upstream, in the HTTP middleware that calls this.
pub async fn route_rpc<S: GraphStore, L: LlmClient>(
    dispatcher: &Dispatcher<S, L>,
    session_id: &str,
    request: RpcRequest,
) -> RpcResponse {
    match request.method.as_str() {
        "tools.call" => {
            let Some(tool) = request.params.get("tool").and_then(Value::as_str) else {
                return error_response(request.id, -32602, "Missing required param: tool");
            };
            let args = request.params.get("arguments").cloned().unwrap_or_else(|| json!({}));
            match dispatcher.dispatch(session_id, tool, &args).await {
                Ok(text) => RpcResponse {
                    id: request.id,
                    result: Some(json!({"content": [{"type": "text", "text": text}]})),
                    error: None,
                },
                Err(err) => error_response(request.id, rpc_code(&err), &err.to_string()),
            }
        }
        "tools.list" => RpcResponse {
            id: request.id,
            result: Some(json!({"tools": crate::tools::NAMES})),
            error: None,
        },
        "context.set_repository" => {
            let Some(repo) = request.params.get("repository_id").and_then(Value::as_str) else {
                return error_response(request.id, -32602, "Missing required param: repository_id");
            };
            dispatcher.context().set_repository(session_id, repo);
            RpcResponse { id: request.id, result: Some(json!({"ok": true})), error: None }
        }
        "context.clear_repository" => {
            dispatcher.context().clear_repository(session_id);
            RpcResponse { id: request.id, result: Some(json!({"ok": true})), error: None }
        }
        "health" => RpcResponse { id: request.id, result: Some(json!({"status": "ok"})), error: None },
        other => error_response(request.id, -32601, &format!("Method not found: {other}")),
    }
}

fn error_response(id: Value, code: i32, message: &str) -> RpcResponse {
    RpcResponse { id, result: None, error: Some(RpcError { code, message: message.to_string() }) }
}

fn rpc_code(err: &Error) -> i32 {
    match err {
        Error::UserInput(_) => -32602,
        Error::RateLimited { .. } => -32000,
        _ => -32603,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphrag_llm::ChatOptions;
    use graphrag_query::{guards::RateLimiter, Translator};
    use graphrag_store::memory::InMemoryStore;
    use std::sync::Arc;

    struct StubLlm;
    impl LlmClient for StubLlm {
        async fn chat(&self, _prompt: &str, _opts: ChatOptions) -> graphrag_core::Result<String> {
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
    async fn unknown_method_maps_to_method_not_found() {
        let d = dispatcher();
        let request = RpcRequest { id: json!(1), method: "bogus".to_string(), params: json!({}) };
        let response = route_rpc(&d, "s1", request).await;
        assert_eq!(response.error.unwrap().code, -32601);
    }

    #[tokio::test]
    async fn tools_call_missing_tool_field_is_invalid_params() {
        let d = dispatcher();
        let request = RpcRequest { id: json!(1), method: "tools.call".to_string(), params: json!({}) };
        let response = route_rpc(&d, "s1", request).await;
        assert_eq!(response.error.unwrap().code, -32602);
    }

    #[tokio::test]
    async fn context_set_then_tools_call_uses_session_repository() {
        let d = dispatcher();
        let set_request = RpcRequest {
            id: json!(1),
            method: "context.set_repository".to_string(),
            params: json!({"repository_id": "repo-a"}),
        };
        assert!(route_rpc(&d, "s1", set_request).await.result.is_some());
        assert_eq!(d.context().get_repository("s1").as_deref(), Some("repo-a"));
    }
}
