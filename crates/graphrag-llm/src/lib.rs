//! LLM chat client (spec §6.2): the external collaborator the Query
//! Translator calls to turn a natural-language question into Cypher.
//!
//! Grounded on `rpg-lift::provider`'s `LlmProvider` trait/error shape
//! (`ProviderError`, request/response JSON poking via `serde_json::Value`
//! getters rather than a typed response struct), adapted from its blocking
//! `ureq` calls to `reqwest` since every other external call in this
//! workspace is already async (`tokio`, `axum`, the store gateway).
//! Request/response shape matches `graphrag_client.py`'s `OpenAILike`
//! client: `{model, messages, temperature, max_tokens}` against an
//! OpenAI-compatible `/chat/completions` endpoint.

use graphrag_core::config::LlmConfig;
use graphrag_core::{Error, Result};
use serde::Deserialize;
use serde_json::json;

/// Per-call overrides; unset fields fall back to the client's configured
/// defaults.
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    pub temperature: Option<f64>,
    pub max_tokens: Option<usize>,
}

/// One method, matching spec §6.2: the translator only ever needs "send
/// this prompt, get back text". Kept generic (`Translator<L: LlmClient>`)
/// rather than `dyn`-boxed, same as `GraphStore` — a plain `async fn`, no
/// `async-trait` shim.
pub trait LlmClient: Send + Sync {
    async fn chat(&self, prompt: &str, opts: ChatOptions) -> Result<String>;
}

/// An OpenAI-compatible `/chat/completions` client (works against OpenAI
/// itself, Azure, or a local proxy, matching the original's `OpenAILike`
/// generality).
pub struct HttpLlmClient {
    http: reqwest::Client,
    config: LlmConfig,
}

impl HttpLlmClient {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

impl LlmClient for HttpLlmClient {
    async fn chat(&self, prompt: &str, opts: ChatOptions) -> Result<String> {
        let url = format!("{}/chat/completions", self.config.api_base.trim_end_matches('/'));
        let body = json!({
            "model": self.config.model_name,
            "temperature": opts.temperature.unwrap_or(self.config.temperature),
            "max_tokens": opts.max_tokens.unwrap_or(self.config.max_tokens),
            "messages": [
                {"role": "user", "content": prompt},
            ],
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "llm request failed");
                Error::Unavailable(e.to_string())
            })?;

        let status = response.status();
        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::internal(anyhow::anyhow!(e)))?;

        if let Some(err) = parsed.error {
            return Err(Error::Unavailable(format!("llm error ({status}): {}", err.message)));
        }

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::internal(anyhow::anyhow!("empty response from llm")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_options_default_to_none() {
        let opts = ChatOptions::default();
        assert!(opts.temperature.is_none());
        assert!(opts.max_tokens.is_none());
    }
}
