//! Similarity retrieval over the vector index.

use crate::embeddings::EmbeddingProvider;
use crate::types::Document;
use crate::vector_index::VectorIndex;
use std::sync::Arc;
use thiserror::Error;

/// Why a retrieval produced no result set.
///
/// Kept distinct from an empty `Ok` so callers can tell "index down" from
/// "nothing matched".
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// The index could not be reached or opened
    #[error("index unavailable: {0}")]
    Unavailable(String),

    /// The query could not be embedded or the search failed midway
    #[error("retrieval failed: {0}")]
    Failed(String),
}

/// Source of candidate documents for a question.
#[async_trait::async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> Result<Vec<Document>, RetrievalError>;
}

/// Retriever backed by an embedding provider and a vector index.
pub struct IndexRetriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Option<Arc<dyn VectorIndex>>,
    top_k: usize,
}

impl IndexRetriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            index: Some(index),
            top_k,
        }
    }

    /// A retriever whose index could not be opened.
    ///
    /// Every call reports [`RetrievalError::Unavailable`].
    pub fn unavailable(embedder: Arc<dyn EmbeddingProvider>, top_k: usize) -> Self {
        Self {
            embedder,
            index: None,
            top_k,
        }
    }
}

#[async_trait::async_trait]
impl Retriever for IndexRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<Document>, RetrievalError> {
        let index = self
            .index
            .as_ref()
            .ok_or_else(|| RetrievalError::Unavailable("index not opened".to_string()))?;

        let embedding = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| RetrievalError::Failed(e.to_string()))?;

        let results = index
            .search(&embedding, self.top_k)
            .map_err(|e| RetrievalError::Unavailable(e.to_string()))?;

        tracing::debug!(query, hits = results.len(), "Index search complete");

        Ok(results
            .into_iter()
            .map(|(entry, _score)| entry.into_document())
            .collect())
    }
}
