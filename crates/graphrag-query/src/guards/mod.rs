//! Cross-cutting query guards (spec §4.10): row-cap enforcement, per-client
//! rate limiting, and path sanitization. The circuit breaker lives in
//! `graphrag_core::breaker` since both the store gateway and the translator
//! need it without depending on this crate.

pub mod path_sanitizer;
pub mod rate_limiter;
pub mod row_cap;

pub use rate_limiter::RateLimiter;
