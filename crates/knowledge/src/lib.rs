//! News knowledge store for Stock Insights.
//!
//! Durable news records live in a SQLite record store; a derived vector
//! index makes them searchable. The [`sync::DocumentSyncManager`] keeps the
//! two in agreement.

pub mod chunker;
pub mod embeddings;
pub mod index;
pub mod retriever;
pub mod store;
pub mod sync;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

pub use chunker::TokenChunker;
pub use embeddings::{create_provider, EmbeddingProvider};
pub use index::SqliteVectorIndex;
pub use retriever::{IndexRetriever, RetrievalError, Retriever};
pub use store::{RecordStore, SqliteRecordStore};
pub use sync::{DocumentSyncManager, SyncOutcome};
pub use types::{
    ChunkCandidate, Document, IndexEntry, IndexStats, NewRecord, Record, RecordCounts, RecordId,
};
pub use vector_index::VectorIndex;
