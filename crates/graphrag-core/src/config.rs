//! Environment-driven configuration (spec §6.5).
//!
//! Each prefixed group loads independently from its own `GRAPHRAG_*_*`
//! namespace, following the original's `pydantic-settings` shape more
//! closely than the teacher's single `.rpg/config.toml` file — there is no
//! single config file here, only env vars and defaults.

use std::time::Duration;

use serde::{Deserialize, Serialize};

fn env_string(var: &str, default: &str) -> String {
    std::env::var(var).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// `GRAPHRAG_STORE_*`: connection to the graph store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub query_timeout: Duration,
    pub connection_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: String::new(),
            database: "neo4j".to_string(),
            query_timeout: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(10),
        }
    }
}

impl StoreConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            uri: env_string("GRAPHRAG_STORE_URI", &default.uri),
            user: env_string("GRAPHRAG_STORE_USER", &default.user),
            password: env_string("GRAPHRAG_STORE_PASSWORD", &default.password),
            database: env_string("GRAPHRAG_STORE_DATABASE", &default.database),
            query_timeout: Duration::from_secs(env_parsed(
                "GRAPHRAG_STORE_QUERY_TIMEOUT",
                default.query_timeout.as_secs(),
            )),
            connection_timeout: Duration::from_secs(env_parsed(
                "GRAPHRAG_STORE_CONNECTION_TIMEOUT",
                default.connection_timeout.as_secs(),
            )),
        }
    }
}

/// `GRAPHRAG_PIPELINE_*`: indexing pipeline tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub batch_size: usize,
    pub max_workers: usize,
    pub repository_id: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            max_workers: 4,
            repository_id: None,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            batch_size: env_parsed("GRAPHRAG_PIPELINE_BATCH_SIZE", default.batch_size),
            max_workers: env_parsed("GRAPHRAG_PIPELINE_MAX_WORKERS", default.max_workers),
            repository_id: std::env::var("GRAPHRAG_PIPELINE_REPOSITORY_ID").ok(),
        }
    }
}

/// `GRAPHRAG_LLM_*`: the translator's LLM endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub api_base: String,
    pub api_key: String,
    pub model_name: String,
    pub temperature: f64,
    pub max_tokens: usize,
    pub prompt_template: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model_name: "gpt-4o-mini".to_string(),
            temperature: 0.0,
            max_tokens: 1024,
            prompt_template: None,
        }
    }
}

impl LlmConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            api_base: env_string("GRAPHRAG_LLM_API_BASE", &default.api_base),
            api_key: env_string("GRAPHRAG_LLM_API_KEY", &default.api_key),
            model_name: env_string("GRAPHRAG_LLM_MODEL_NAME", &default.model_name),
            temperature: env_parsed("GRAPHRAG_LLM_TEMPERATURE", default.temperature),
            max_tokens: env_parsed("GRAPHRAG_LLM_MAX_TOKENS", default.max_tokens),
            prompt_template: std::env::var("GRAPHRAG_LLM_PROMPT_TEMPLATE").ok(),
        }
    }
}

/// `GRAPHRAG_RPC_*`: the tool dispatcher's HTTP surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    pub host: String,
    pub port: u16,
    pub rate_limit_per_minute: u32,
    pub rate_limit_burst: u32,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8765,
            rate_limit_per_minute: 60,
            rate_limit_burst: 10,
        }
    }
}

impl RpcConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            host: env_string("GRAPHRAG_RPC_HOST", &default.host),
            port: env_parsed("GRAPHRAG_RPC_PORT", default.port),
            rate_limit_per_minute: env_parsed(
                "GRAPHRAG_RPC_RATE_LIMIT_PER_MINUTE",
                default.rate_limit_per_minute,
            ),
            rate_limit_burst: env_parsed(
                "GRAPHRAG_RPC_RATE_LIMIT_BURST",
                default.rate_limit_burst,
            ),
        }
    }
}

/// `GRAPHRAG_TRACING_*`: the optional tool-call tracer (§C of SPEC_FULL.md).
/// Disabled by default; the concrete backend is out of scope (§1), only the
/// seam is kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracingConfig {
    pub enabled: bool,
    pub service_name: String,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            service_name: "graphrag-gateway".to_string(),
        }
    }
}

impl TracingConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            enabled: env_parsed("GRAPHRAG_TRACING_ENABLED", default.enabled),
            service_name: env_string("GRAPHRAG_TRACING_SERVICE_NAME", &default.service_name),
        }
    }
}

/// The union of every group, assembled once at process startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub pipeline: PipelineConfig,
    pub llm: LlmConfig,
    pub rpc: RpcConfig,
    pub tracing: TracingConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            store: StoreConfig::from_env(),
            pipeline: PipelineConfig::from_env(),
            llm: LlmConfig::from_env(),
            rpc: RpcConfig::from_env(),
            tracing: TracingConfig::from_env(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_constants() {
        assert_eq!(PipelineConfig::default().batch_size, 100);
        assert_eq!(PipelineConfig::default().max_workers, 4);
        assert_eq!(RpcConfig::default().rate_limit_per_minute, 60);
    }

    #[test]
    fn from_env_falls_back_to_defaults_when_unset() {
        // SAFETY: test-local var name unlikely to collide; no other test in
        // this crate reads GRAPHRAG_PIPELINE_BATCH_SIZE concurrently.
        unsafe {
            std::env::remove_var("GRAPHRAG_PIPELINE_BATCH_SIZE");
        }
        let config = PipelineConfig::from_env();
        assert_eq!(config.batch_size, 100);
    }
}
