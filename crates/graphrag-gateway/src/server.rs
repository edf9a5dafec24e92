//! Axum `Router` assembly for the `/sse`, `/messages`, and `/health` routes
//! (spec §4.9/§6.4), grounded on `original_source/src/mcp/http_server.py`'s
//! Starlette app (`SseServerTransport` + `RateLimitMiddleware`) and on
//! `agenticlaw-gateway/src/server.rs`'s `Router`/broadcast-channel
//! assembly. No Rust repo in this workspace's pack demonstrates `rmcp`'s
//! `transport-sse-server` feature, so the SSE stream here is hand-rolled
//! with `axum::response::sse::Sse` directly, the way
//! `dashflow-langserve/src/handler.rs` builds its own `stream_handler`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::{ConnectInfo, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use dashmap::DashMap;
use futures::Stream;
use graphrag_llm::LlmClient;
use graphrag_store::GraphStore;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::dispatch::Dispatcher;
use crate::rpc::{route_rpc, RpcRequest};

type SessionSender = mpsc::UnboundedSender<Event>;

pub struct GatewayState<S: GraphStore, L: LlmClient> {
    dispatcher: Dispatcher<S, L>,
    sessions: DashMap<String, SessionSender>,
    next_session: AtomicU64,
    rate_limit_per_minute: u32,
}

impl<S: GraphStore, L: LlmClient> GatewayState<S, L> {
    pub fn new(dispatcher: Dispatcher<S, L>, rate_limit_per_minute: u32) -> Self {
        Self { dispatcher, sessions: DashMap::new(), next_session: AtomicU64::new(1), rate_limit_per_minute }
    }

    fn new_session_id(&self) -> String {
        format!("sess-{:x}", self.next_session.fetch_add(1, Ordering::Relaxed))
    }
}

/// Builds the router: `/sse` (GET), `/messages` (POST), `/health` (GET),
/// all behind the rate-limit middleware, matching the original's single
/// `RateLimitMiddleware` wrapping every route.
pub fn router<S: GraphStore + 'static, L: LlmClient + 'static>(state: Arc<GatewayState<S, L>>) -> Router {
    Router::new()
        .route("/sse", get(handle_sse::<S, L>))
        .route("/messages", post(handle_messages::<S, L>))
        .route("/health", get(health))
        .layer(tower_http::cors::CorsLayer::new().allow_origin(tower_http::cors::Any).allow_methods(tower_http::cors::Any))
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit_middleware::<S, L>))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

/// Opens a long-lived SSE channel, handing the client a session id as the
/// first event's data so it knows where to POST follow-up tool calls
/// (`/messages?session_id=...`), matching the original's
/// `SseServerTransport.connect_sse` handshake.
async fn handle_sse<S: GraphStore + 'static, L: LlmClient + 'static>(
    State(state): State<Arc<GatewayState<S, L>>>,
) -> Sse<impl Stream<Item = Result<Event, std::convert::Infallible>>> {
    let session_id = state.new_session_id();
    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
    state.sessions.insert(session_id.clone(), tx);

    let endpoint_event = Event::default().event("endpoint").data(format!("/messages?session_id={session_id}"));
    let closing_session_id = session_id.clone();

    let stream = async_stream::stream! {
        yield Ok(endpoint_event);
        while let Some(event) = rx.recv().await {
            yield Ok(event);
        }
        state.sessions.remove(&closing_session_id);
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[derive(Debug, Deserialize)]
struct MessagesQuery {
    session_id: String,
}

/// Routes one JSON-RPC envelope to the dispatcher and pushes the response
/// back over the caller's SSE channel, acknowledging the POST itself with
/// `202 Accepted` — matching the original's fire-and-forget
/// `handle_post_message`, where the actual tool result always arrives on
/// the SSE stream, never in the POST response body.
async fn handle_messages<S: GraphStore + 'static, L: LlmClient + 'static>(
    State(state): State<Arc<GatewayState<S, L>>>,
    Query(q): Query<MessagesQuery>,
    Json(request): Json<RpcRequest>,
) -> Response {
    let Some(sender) = state.sessions.get(&q.session_id).map(|s| s.clone()) else {
        return (StatusCode::NOT_FOUND, "unknown session_id").into_response();
    };

    let response = route_rpc(&state.dispatcher, &q.session_id, request).await;
    let event = Event::default().event("message").json_data(&response).unwrap_or_else(|_| Event::default());
    let _ = sender.send(event);

    StatusCode::ACCEPTED.into_response()
}

/// spec §6.4: client id derived from `X-API-Key` (first 8 chars) else
/// `X-Forwarded-For` (first address) else the socket's peer address,
/// ported from `RateLimitMiddleware._get_client_id`.
fn client_id_from(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(api_key) = headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
        let prefix: String = api_key.chars().take(8).collect();
        return format!("api:{prefix}");
    }
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            return format!("ip:{}", first.trim());
        }
    }
    match peer {
        Some(addr) => format!("ip:{}", addr.ip()),
        None => "ip:unknown".to_string(),
    }
}

async fn rate_limit_middleware<S: GraphStore + 'static, L: LlmClient + 'static>(
    State(state): State<Arc<GatewayState<S, L>>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: axum::extract::Request,
    next: Next,
) -> Response {
    let client_id = client_id_from(request.headers(), Some(peer));

    if !state.dispatcher.limiter().allow(&client_id) {
        let retry_after = state.dispatcher.limiter().retry_after_secs(&client_id).ceil() as u64 + 1;
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({"error": "Rate limit exceeded", "retry_after": retry_after})),
        )
            .into_response();
        let headers = response.headers_mut();
        headers.insert("Retry-After", retry_after.to_string().parse().expect("ascii digits"));
        headers.insert("X-RateLimit-Remaining", "0".parse().expect("ascii digit"));
        return response;
    }

    let mut response = next.run(request).await;
    let remaining = state.dispatcher.limiter().remaining(&client_id);
    let headers = response.headers_mut();
    if let Ok(value) = remaining.to_string().parse() {
        headers.insert("X-RateLimit-Remaining", value);
    }
    if let Ok(value) = state.rate_limit_per_minute.to_string().parse() {
        headers.insert("X-RateLimit-Limit", value);
    }
    response
}
