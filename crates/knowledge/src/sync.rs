//! Document sync manager.
//!
//! Moves unsynced records into the vector index. A record is marked synced
//! only after a `store_chunks` call covering all of its chunks succeeded, so
//! `synced = true` always implies the content is present in the index.

use crate::chunker::TokenChunker;
use crate::embeddings::EmbeddingProvider;
use crate::index::build_entries;
use crate::store::RecordStore;
use crate::types::RecordId;
use crate::vector_index::VectorIndex;
use insights_core::AppResult;
use serde::Serialize;
use std::sync::Arc;

/// Result of one [`DocumentSyncManager::sync`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// No unsynced records existed
    NothingToSync,

    /// Chunks were stored and records marked
    Synced {
        records: usize,
        chunks: usize,
        /// Rows actually flipped; lower than `records` when a concurrent
        /// sync marked some of them first
        marked: usize,
    },

    /// Embedding or index storage failed; no record was marked
    StorageFailed { records: usize, reason: String },
}

impl SyncOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, SyncOutcome::StorageFailed { .. })
    }
}

/// Keeps the vector index in agreement with the record store.
pub struct DocumentSyncManager {
    store: Arc<dyn RecordStore>,
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    chunker: TokenChunker,
    collection: String,
}

impl DocumentSyncManager {
    pub fn new(
        store: Arc<dyn RecordStore>,
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        chunker: TokenChunker,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            store,
            index,
            embedder,
            chunker,
            collection: collection.into(),
        }
    }

    /// Index every unsynced record and mark them synced on success.
    ///
    /// Storage and embedding failures are reported as
    /// [`SyncOutcome::StorageFailed`] and leave every record unsynced for the
    /// next call. Only failures reading or updating the record store itself
    /// are returned as `Err`.
    pub async fn sync(&self) -> AppResult<SyncOutcome> {
        let records = self.store.fetch_unsynced()?;

        if records.is_empty() {
            tracing::info!("No unsynced records");
            return Ok(SyncOutcome::NothingToSync);
        }

        let ids: Vec<RecordId> = records.iter().map(|r| r.id).collect();
        let candidates: Vec<_> = records
            .iter()
            .flat_map(|record| self.chunker.chunk_record(record))
            .collect();
        let chunks = candidates.len();

        tracing::info!(
            records = records.len(),
            chunks,
            "Syncing unsynced records into index '{}'",
            self.collection
        );

        if chunks > 0 {
            let texts: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();

            let stored = match self.embedder.embed_batch(&texts).await {
                Ok(embeddings) => build_entries(&self.collection, candidates, embeddings)
                    .and_then(|entries| self.index.store_chunks(&entries)),
                Err(e) => Err(e),
            };

            if let Err(e) = stored {
                tracing::warn!(
                    records = records.len(),
                    "Index storage failed, records left unsynced: {}",
                    e
                );
                return Ok(SyncOutcome::StorageFailed {
                    records: records.len(),
                    reason: e.to_string(),
                });
            }
        }

        let marked = self.store.mark_synced(&ids)?;

        tracing::info!(
            records = records.len(),
            chunks,
            marked,
            "Sync complete"
        );

        Ok(SyncOutcome::Synced {
            records: records.len(),
            chunks,
            marked,
        })
    }
}
