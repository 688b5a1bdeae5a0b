//! Augmentation from external search.
//!
//! Rewrites the question into search queries, fetches results for each,
//! drops exact-content duplicates and folds the survivors into a single
//! synthesized document. Live results for a known ticker are also written
//! to the record store and synced into the index.

use crate::gates::QueryRewriter;
use crate::search::{ExternalSearch, SearchHit};
use insights_knowledge::{Document, DocumentSyncManager, NewRecord, RecordStore};
use std::collections::HashSet;
use std::sync::Arc;

/// Origin tag of records persisted by augmentation.
pub const AUGMENTATION_ORIGIN: &str = "web_search_agent";

/// Keep the first occurrence of each distinct content.
pub fn dedup_hits(hits: Vec<SearchHit>) -> Vec<SearchHit> {
    let mut seen = HashSet::new();
    hits.into_iter()
        .filter(|hit| seen.insert(hit.content.clone()))
        .collect()
}

/// One document holding every hit, each prefixed by its source.
pub fn synthesize_document(hits: &[SearchHit]) -> Option<Document> {
    if hits.is_empty() {
        return None;
    }

    let content = hits
        .iter()
        .map(|hit| format!("Source: {}\nContent: {}", hit.source, hit.content))
        .collect::<Vec<_>>()
        .join("\n\n");

    Some(Document::with_source(content, "web_search"))
}

/// What one augmentation call produced.
#[derive(Debug, Default)]
pub struct Augmentation {
    pub document: Option<Document>,
    pub hits: usize,
    pub persisted: usize,
}

pub struct Augmenter {
    rewriter: QueryRewriter,
    search: Arc<dyn ExternalSearch>,
    store: Option<Arc<dyn RecordStore>>,
    sync: Option<Arc<DocumentSyncManager>>,
}

impl Augmenter {
    pub fn new(rewriter: QueryRewriter, search: Arc<dyn ExternalSearch>) -> Self {
        Self {
            rewriter,
            search,
            store: None,
            sync: None,
        }
    }

    /// Persist live results to `store` and sync them with `sync`.
    pub fn with_persistence(
        mut self,
        store: Arc<dyn RecordStore>,
        sync: Arc<DocumentSyncManager>,
    ) -> Self {
        self.store = Some(store);
        self.sync = Some(sync);
        self
    }

    pub async fn augment(&self, question: &str, ticker: Option<&str>) -> Augmentation {
        let queries = self.rewriter.rewrite(question, ticker.unwrap_or("")).await;
        tracing::debug!(?queries, "Search queries");

        let mut hits = Vec::new();
        for query in &queries {
            match self.search.fetch(query).await {
                Ok(found) => hits.extend(found),
                Err(e) => tracing::warn!(query = %query, "External search failed: {}", e),
            }
        }

        let hits = dedup_hits(hits);
        tracing::info!(queries = queries.len(), hits = hits.len(), "Web search complete");

        let persisted = match ticker {
            Some(ticker) if self.search.is_live() => self.persist(ticker, &hits).await,
            _ => 0,
        };

        Augmentation {
            document: synthesize_document(&hits),
            hits: hits.len(),
            persisted,
        }
    }

    async fn persist(&self, ticker: &str, hits: &[SearchHit]) -> usize {
        let (Some(store), Some(sync)) = (&self.store, &self.sync) else {
            return 0;
        };

        let live: Vec<&SearchHit> = hits.iter().filter(|h| !h.is_placeholder()).collect();
        if live.is_empty() {
            return 0;
        }

        let title = format!("News for {} - {}", ticker, chrono::Utc::now().format("%Y-%m-%d"));
        let mut inserted = 0;

        for hit in live {
            let record = NewRecord::new(hit.content.as_str(), AUGMENTATION_ORIGIN)
                .with_ticker(ticker)
                .with_title(title.as_str())
                .with_link(hit.source.as_str());

            match store.insert_if_absent(&record) {
                Ok(Some(id)) => {
                    tracing::debug!(record_id = id, "Stored search result");
                    inserted += 1;
                }
                Ok(None) => tracing::debug!(link = %hit.source, "Search result already stored"),
                Err(e) => tracing::warn!("Failed to store search result: {}", e),
            }
        }

        if inserted > 0 {
            match sync.sync().await {
                Ok(outcome) if outcome.is_success() => {
                    tracing::info!(inserted, ?outcome, "Augmentation records synced")
                }
                Ok(outcome) => tracing::warn!(?outcome, "Augmentation records left unsynced"),
                Err(e) => tracing::warn!("Sync after augmentation failed: {}", e),
            }
        }

        inserted
    }
}
