//! Vector index abstraction.

use crate::types::{IndexEntry, IndexStats};
use insights_core::AppResult;

/// Trait for vector index backends.
pub trait VectorIndex: Send + Sync {
    /// Store a batch of embedded entries.
    ///
    /// The batch is all or nothing: on `Err`, none of the entries may be
    /// visible to [`VectorIndex::search`]. Re-storing an entry with the same
    /// id replaces it.
    fn store_chunks(&self, entries: &[IndexEntry]) -> AppResult<usize>;

    /// Top-k entries by descending similarity to `query_embedding`.
    fn search(&self, query_embedding: &[f32], top_k: usize) -> AppResult<Vec<(IndexEntry, f32)>>;

    fn stats(&self) -> AppResult<IndexStats>;
}
