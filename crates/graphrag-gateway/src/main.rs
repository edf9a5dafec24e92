//! Gateway binary entry point: wires `AppConfig::from_env()` into a store,
//! an LLM client, the translator, and the dispatcher, then serves the
//! `/sse`+`/messages`+`/health` router (spec §6.4).

use std::net::SocketAddr;
use std::sync::Arc;

use graphrag_core::config::AppConfig;
use graphrag_gateway::dispatch::Dispatcher;
use graphrag_gateway::server::{self, GatewayState};
use graphrag_gateway::tracer::{LoggingTracer, NoopTracer, ToolTracer};
use graphrag_llm::HttpLlmClient;
use graphrag_query::guards::RateLimiter;
use graphrag_query::Translator;
use graphrag_store::gateway::GraphStoreGateway;
use graphrag_store::memory::InMemoryStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = AppConfig::from_env();

    // The real property-graph store is out of scope (spec §1); the
    // gateway binary runs against the in-memory reference store, wrapped
    // in the same timeout/circuit-breaker gateway a real store would use.
    let store = GraphStoreGateway::new(InMemoryStore::new, config.store.query_timeout);
    let llm = HttpLlmClient::new(config.llm.clone());
    let translator = Translator::new(llm);
    let limiter = RateLimiter::new(config.rpc.rate_limit_per_minute, config.rpc.rate_limit_burst);

    let tracer: Arc<dyn ToolTracer> = if config.tracing.enabled {
        Arc::new(LoggingTracer { service_name: config.tracing.service_name.clone() })
    } else {
        Arc::new(NoopTracer)
    };

    let dispatcher = Dispatcher::new(store, translator, limiter, tracer);
    let state = Arc::new(GatewayState::new(dispatcher, config.rpc.rate_limit_per_minute));
    let app = server::router(state);

    let addr: SocketAddr = format!("{}:{}", config.rpc.host, config.rpc.port).parse()?;
    tracing::info!(%addr, "graphrag-gateway listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await?;

    Ok(())
}
