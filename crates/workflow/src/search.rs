//! External news search used by the augmentation step.

use insights_core::config::WebSearchSettings;
use insights_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Source tag of placeholder results.
pub const PLACEHOLDER_SOURCE: &str = "mock_knowledge_base";

/// One raw result from an external search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub content: String,
    pub source: String,
}

impl SearchHit {
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: source.into(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.source == PLACEHOLDER_SOURCE
    }
}

/// Third-party search backend.
#[async_trait::async_trait]
pub trait ExternalSearch: Send + Sync {
    /// Whether results come from a real backend rather than a placeholder.
    fn is_live(&self) -> bool;

    async fn fetch(&self, query: &str) -> AppResult<Vec<SearchHit>>;
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    url: String,
    #[serde(default)]
    content: String,
}

/// Tavily search API client.
pub struct TavilySearch {
    endpoint: String,
    api_key: String,
    max_results: u32,
    client: reqwest::Client,
}

impl TavilySearch {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, max_results: u32) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            max_results,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl ExternalSearch for TavilySearch {
    fn is_live(&self) -> bool {
        true
    }

    async fn fetch(&self, query: &str) -> AppResult<Vec<SearchHit>> {
        tracing::debug!(query, "Querying Tavily");

        let request = TavilyRequest {
            api_key: &self.api_key,
            query,
            max_results: self.max_results,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Search(format!("Failed to reach search API: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Search(format!(
                "Search API error ({}): {}",
                status, error_text
            )));
        }

        let body: TavilyResponse = response
            .json()
            .await
            .map_err(|e| AppError::Search(format!("Failed to parse search response: {}", e)))?;

        Ok(body
            .results
            .into_iter()
            .filter(|r| !r.content.trim().is_empty())
            .map(|r| SearchHit::new(r.content, r.url))
            .collect())
    }
}

/// Deterministic stand-in used when live search is disabled.
#[derive(Debug, Default, Clone)]
pub struct PlaceholderSearch;

#[async_trait::async_trait]
impl ExternalSearch for PlaceholderSearch {
    fn is_live(&self) -> bool {
        false
    }

    async fn fetch(&self, query: &str) -> AppResult<Vec<SearchHit>> {
        Ok(vec![SearchHit::new(
            format!(
                "Mock News Data: Recent reports indicate stable performance for {}. \
                 Analysts suggest monitoring global market trends. \
                 (Note: This is a placeholder response as live web search is disabled).",
                query
            ),
            PLACEHOLDER_SOURCE,
        )])
    }
}

/// Tavily when enabled and keyed, otherwise the placeholder.
pub fn create_search(
    settings: &WebSearchSettings,
    api_key: Option<String>,
) -> Arc<dyn ExternalSearch> {
    match api_key {
        Some(key) if settings.enabled => {
            tracing::debug!(endpoint = %settings.endpoint, "Live web search enabled");
            Arc::new(TavilySearch::new(
                settings.endpoint.as_str(),
                key,
                settings.max_results,
            ))
        }
        _ => {
            tracing::debug!("Live web search disabled, using placeholder results");
            Arc::new(PlaceholderSearch)
        }
    }
}
