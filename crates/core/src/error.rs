//! Error types for Stock Insights.
//!
//! One error enum covers every failure category the workspace can surface:
//! configuration, I/O, inference, prompts, durable storage, the search
//! index, embeddings, structured queries, external search and workflow
//! state validation.

use thiserror::Error;

/// Unified error type for Stock Insights.
///
/// All fallible functions return `Result<T, AppError>`.
/// Library code never panics; errors are represented and propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Inference backend errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Prompt loading and rendering errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Durable record storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Search index errors
    #[error("Index error: {0}")]
    Index(String),

    /// Embedding backend errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Structured-data engine errors
    #[error("Query error: {0}")]
    Query(String),

    /// External search errors
    #[error("Search error: {0}")]
    Search(String),

    /// Workflow state that violates a step's entry contract
    #[error("Workflow error: {0}")]
    Workflow(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
