//! Completion-service clients.
//!
//! The parser only needs "text in, text out"; each provider module maps a
//! [`CompletionRequest`] onto its own wire format.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use loanscout_core::config::{LlmConfig, LlmProvider};
use reqwest::{Client, Response};

mod gemini;
mod ollama;
mod openai;

pub use gemini::GeminiClient;
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the service for a bare JSON object.
    pub json_mode: bool,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// Builds the client selected by `[llm].provider`.
pub fn build_llm_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    let base_url = config.effective_base_url().trim_end_matches('/').to_string();
    let client = http_client(config.timeout_secs)?;

    let llm: Arc<dyn LlmClient> = match config.provider {
        LlmProvider::Gemini => {
            let Some(api_key) = config.api_key.clone() else {
                bail!("gemini provider requires llm.api_key");
            };
            Arc::new(GeminiClient::new(client, base_url, config.model.clone(), api_key))
        }
        LlmProvider::OpenAi => {
            let Some(api_key) = config.api_key.clone() else {
                bail!("openai provider requires llm.api_key");
            };
            Arc::new(OpenAiClient::new(client, base_url, config.model.clone(), api_key))
        }
        LlmProvider::Ollama => Arc::new(OllamaClient::new(client, base_url, config.model.clone())),
    };
    Ok(llm)
}

pub(crate) fn http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .context("failed to build completion-service http client")
}

/// Fails with the status line and a bounded slice of the body.
pub(crate) async fn ensure_success(provider: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let snippet: String = body.chars().take(200).collect();
    bail!("{provider} returned HTTP {status}: {snippet}")
}
