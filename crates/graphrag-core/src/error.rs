//! The crate-wide error enum (spec §7).
//!
//! Every other workspace crate's leaf errors convert into this one via
//! `#[from]`, so a `graphrag_core::Error` is the common currency at every
//! component boundary: the builder, the gateway, the translator, and the
//! dispatcher all return `graphrag_core::Result<T>`.

use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// The six error kinds from spec §7, plus the schema/model validation
/// failures that graphrag-core itself can produce.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad argument, path traversal, unknown tool name, invalid translated
    /// query. Surfaced verbatim to the caller.
    #[error("{0}")]
    UserInput(String),

    /// A cooperative deadline expired.
    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The store or an RPC peer is unreachable.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// A circuit breaker refused the call.
    #[error("circuit open for {breaker}; try: {}", fallback_tools.join(", "))]
    CircuitOpen {
        breaker: String,
        fallback_tools: Vec<String>,
    },

    /// The token bucket for this client is empty.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// A node or edge failed schema validation.
    #[error("schema validation failed: {0}")]
    SchemaValidation(String),

    /// Everything else. Logged with context; surfaced as a generic message
    /// with a correlation id.
    #[error("internal error [{correlation_id}]: {source}")]
    Internal {
        correlation_id: String,
        #[source]
        source: anyhow::Error,
    },
}

impl Error {
    pub fn internal(source: impl Into<anyhow::Error>) -> Self {
        Error::Internal {
            correlation_id: correlation_id(),
            source: source.into(),
        }
    }

    pub fn user_input(msg: impl fmt::Display) -> Self {
        Error::UserInput(msg.to_string())
    }

    /// The kind name, used for log fields and HTTP status mapping.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::UserInput(_) => "user_input",
            Error::Timeout(_) => "timeout",
            Error::Unavailable(_) => "unavailable",
            Error::CircuitOpen { .. } => "circuit_open",
            Error::RateLimited { .. } => "rate_limited",
            Error::SchemaValidation(_) => "schema_validation",
            Error::Internal { .. } => "internal",
        }
    }
}

/// Short, non-cryptographic correlation id for internal errors: long enough
/// to grep in logs, never meant to be unique at cluster scale.
fn correlation_id() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("gr-{n:x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_are_stable() {
        assert_eq!(Error::UserInput("x".into()).kind(), "user_input");
        assert_eq!(Error::Timeout(std::time::Duration::from_secs(1)).kind(), "timeout");
        assert_eq!(
            Error::CircuitOpen {
                breaker: "cypher_generation".into(),
                fallback_tools: vec!["find_dependencies".into()],
            }
            .kind(),
            "circuit_open"
        );
    }

    #[test]
    fn internal_wraps_any_error_with_a_correlation_id() {
        let err = Error::internal(anyhow::anyhow!("boom"));
        let msg = err.to_string();
        assert!(msg.starts_with("internal error [gr-"));
        assert!(msg.contains("boom"));
    }
}
