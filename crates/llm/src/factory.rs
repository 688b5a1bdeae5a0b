//! LLM provider factory.
//!
//! Resolves the configured provider name to a client implementation.

use crate::client::LlmClient;
use crate::providers::OllamaClient;
use insights_core::config::LlmSettings;
use insights_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Create an LLM client from the inference settings.
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown, or
/// `AppError::Llm` if the HTTP client cannot be built.
pub fn create_client(settings: &LlmSettings) -> AppResult<Arc<dyn LlmClient>> {
    match settings.provider.to_lowercase().as_str() {
        "ollama" => {
            let client = OllamaClient::with_timeout(
                settings.endpoint.as_str(),
                Duration::from_secs(settings.timeout_secs),
            )?;
            tracing::debug!(endpoint = %settings.endpoint, "Created Ollama client");
            Ok(Arc::new(client))
        }
        other => Err(AppError::Config(format!("Unknown provider: {}", other))),
    }
}
