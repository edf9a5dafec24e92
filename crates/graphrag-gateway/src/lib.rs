//! The code-intelligence tool surface (spec §4.9): session context
//! ([`context`]), tracing ([`tracer`]), the tool implementations ([`tools`]),
//! the dispatcher that routes calls through rate limiting and failure
//! formatting ([`dispatch`]), the `/messages` JSON-RPC envelope
//! ([`rpc`]), and the axum `/sse`+`/messages`+`/health` router ([`server`]).

pub mod context;
pub mod dispatch;
pub mod rpc;
pub mod server;
pub mod tools;
pub mod tracer;

pub use dispatch::Dispatcher;
pub use server::GatewayState;
