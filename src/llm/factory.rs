// src/llm/factory.rs
// Build the configured provider client

use crate::config::Settings;
use crate::error::Result;
use crate::llm::anthropic::{AnthropicClient, DEFAULT_MAX_TOKENS};
use crate::llm::http_client::{DEFAULT_CONNECT_TIMEOUT_SECS, LlmHttpClient};
use crate::llm::openai_compat::OpenAiCompatClient;
use crate::llm::provider::{LlmClient, Provider};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Create the client for `settings.provider`.
///
/// Fails with a configuration error when that provider has no API key,
/// before any request is attempted.
pub fn create_client(settings: &Settings) -> Result<Arc<dyn LlmClient>> {
    let api_key = settings.api_key()?.to_string();
    let http = LlmHttpClient::new(
        settings.request_timeout,
        Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
    );

    let client: Arc<dyn LlmClient> = match settings.provider {
        Provider::Anthropic => {
            let mut client = AnthropicClient::with_model(api_key, settings.model.clone())
                .with_max_tokens(settings.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS))
                .with_http(http);
            if let Some(ref url) = settings.base_url {
                client = client.with_url(url);
            }
            Arc::new(client)
        }
        Provider::OpenAi | Provider::DeepSeek => {
            let mut client =
                OpenAiCompatClient::with_model(settings.provider, api_key, settings.model.clone())
                    .with_max_tokens(settings.max_tokens)
                    .with_http(http);
            if let Some(ref url) = settings.base_url {
                client = client.with_url(url);
            }
            Arc::new(client)
        }
    };

    info!(provider = %settings.provider, model = %settings.model, "LLM client initialized");
    Ok(client)
}
