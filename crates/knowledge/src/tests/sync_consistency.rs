//! A record is synced only if its content reached the index.

use crate::chunker::TokenChunker;
use crate::embeddings::{EmbeddingProvider, MockProvider};
use crate::index::SqliteVectorIndex;
use crate::store::{RecordStore, SqliteRecordStore};
use crate::sync::{DocumentSyncManager, SyncOutcome};
use crate::types::{IndexEntry, IndexStats, NewRecord, RecordId};
use crate::vector_index::VectorIndex;
use insights_core::{AppError, AppResult};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const COLLECTION: &str = "news_articles";

/// Wraps a real index, failing the first `failures` store calls and
/// remembering which records were part of a successful call.
struct FlakyIndex {
    inner: SqliteVectorIndex,
    failures: AtomicUsize,
    stored_records: Mutex<HashSet<RecordId>>,
}

impl FlakyIndex {
    fn new(inner: SqliteVectorIndex, failures: usize) -> Self {
        Self {
            inner,
            failures: AtomicUsize::new(failures),
            stored_records: Mutex::new(HashSet::new()),
        }
    }
}

impl VectorIndex for FlakyIndex {
    fn store_chunks(&self, entries: &[IndexEntry]) -> AppResult<usize> {
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(AppError::Index("connection refused".to_string()));
        }

        let stored = self.inner.store_chunks(entries)?;
        self.stored_records
            .lock()
            .unwrap()
            .extend(entries.iter().map(|e| e.record_id));
        Ok(stored)
    }

    fn search(&self, query: &[f32], top_k: usize) -> AppResult<Vec<(IndexEntry, f32)>> {
        self.inner.search(query, top_k)
    }

    fn stats(&self) -> AppResult<IndexStats> {
        self.inner.stats()
    }
}

#[derive(Debug)]
struct DownEmbedder;

#[async_trait::async_trait]
impl EmbeddingProvider for DownEmbedder {
    fn provider_name(&self) -> &str {
        "down"
    }

    fn model_name(&self) -> &str {
        "none"
    }

    fn dimensions(&self) -> usize {
        8
    }

    async fn embed_batch(&self, _texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Err(AppError::Embedding("model not loaded".to_string()))
    }
}

struct Fixture {
    _temp: TempDir,
    store: Arc<SqliteRecordStore>,
    index: Arc<FlakyIndex>,
}

impl Fixture {
    fn new(failures: usize) -> Self {
        let temp = TempDir::new().unwrap();
        let store =
            Arc::new(SqliteRecordStore::open(temp.path().join("records.sqlite")).unwrap());
        let inner = SqliteVectorIndex::open(temp.path().join("index.sqlite"), COLLECTION).unwrap();

        Self {
            _temp: temp,
            store,
            index: Arc::new(FlakyIndex::new(inner, failures)),
        }
    }

    fn manager_with(&self, embedder: Arc<dyn EmbeddingProvider>) -> DocumentSyncManager {
        DocumentSyncManager::new(
            self.store.clone(),
            self.index.clone(),
            embedder,
            TokenChunker::new(250).unwrap(),
            COLLECTION,
        )
    }

    fn manager(&self) -> DocumentSyncManager {
        self.manager_with(Arc::new(MockProvider::new(64)))
    }

    fn seed(&self, contents: &[&str]) -> Vec<RecordId> {
        contents
            .iter()
            .map(|c| {
                self.store
                    .insert(&NewRecord::new(*c, "scraper").with_ticker("SBIN.NS"))
                    .unwrap()
            })
            .collect()
    }

    fn synced_ids(&self, ids: &[RecordId]) -> Vec<RecordId> {
        ids.iter()
            .copied()
            .filter(|id| self.store.get(*id).unwrap().unwrap().synced)
            .collect()
    }
}

#[tokio::test]
async fn test_nothing_to_sync() {
    let fixture = Fixture::new(0);
    let outcome = fixture.manager().sync().await.unwrap();
    assert_eq!(outcome, SyncOutcome::NothingToSync);
}

#[tokio::test]
async fn test_successful_sync_marks_every_record() {
    let fixture = Fixture::new(0);
    let ids = fixture.seed(&[
        "SBI raises lending rates by 10 basis points.",
        "SBI shares hit a 52-week high.",
    ]);

    let outcome = fixture.manager().sync().await.unwrap();

    assert_eq!(
        outcome,
        SyncOutcome::Synced {
            records: 2,
            chunks: 2,
            marked: 2
        }
    );
    assert_eq!(fixture.synced_ids(&ids), ids);
    assert_eq!(fixture.index.stats().unwrap().records, 2);
}

#[tokio::test]
async fn test_storage_failure_marks_nothing() {
    let fixture = Fixture::new(1);
    let ids = fixture.seed(&["First story", "Second story", "Third story"]);

    let outcome = fixture.manager().sync().await.unwrap();

    assert!(matches!(outcome, SyncOutcome::StorageFailed { records: 3, .. }));
    assert!(fixture.synced_ids(&ids).is_empty());
    assert_eq!(fixture.store.counts().unwrap().unsynced, 3);
    assert_eq!(fixture.index.stats().unwrap().entries, 0);
}

#[tokio::test]
async fn test_failed_records_are_retried_on_next_sync() {
    let fixture = Fixture::new(1);
    let ids = fixture.seed(&["Bank Nifty slips", "PSU banks rally"]);
    let manager = fixture.manager();

    assert!(!manager.sync().await.unwrap().is_success());

    let outcome = manager.sync().await.unwrap();
    assert!(matches!(outcome, SyncOutcome::Synced { marked: 2, .. }));
    assert_eq!(fixture.synced_ids(&ids), ids);

    assert_eq!(manager.sync().await.unwrap(), SyncOutcome::NothingToSync);
}

#[tokio::test]
async fn test_embedding_failure_is_a_storage_failure() {
    let fixture = Fixture::new(0);
    let ids = fixture.seed(&["Some content"]);

    let outcome = fixture
        .manager_with(Arc::new(DownEmbedder))
        .sync()
        .await
        .unwrap();

    assert!(matches!(outcome, SyncOutcome::StorageFailed { .. }));
    assert!(fixture.synced_ids(&ids).is_empty());
}

#[tokio::test]
async fn test_empty_records_are_marked_without_index_write() {
    let fixture = Fixture::new(1);
    let ids = fixture.seed(&["", "   "]);

    let outcome = fixture.manager().sync().await.unwrap();

    // The flaky index would have failed a store call, so none was made
    assert_eq!(
        outcome,
        SyncOutcome::Synced {
            records: 2,
            chunks: 0,
            marked: 2
        }
    );
    assert_eq!(fixture.synced_ids(&ids), ids);
}

#[tokio::test]
async fn test_synced_implies_stored() {
    let fixture = Fixture::new(1);
    let mut ids = fixture.seed(&["Round one"]);
    let manager = fixture.manager();

    manager.sync().await.unwrap();
    ids.extend(fixture.seed(&["Round two"]));
    manager.sync().await.unwrap();

    let stored = fixture.index.stored_records.lock().unwrap().clone();
    for id in fixture.synced_ids(&ids) {
        assert!(stored.contains(&id), "record {} synced but never stored", id);
    }
    assert_eq!(fixture.synced_ids(&ids).len(), 2);
}

#[tokio::test]
async fn test_concurrent_syncs_mark_each_record_once() {
    let fixture = Fixture::new(0);
    let ids = fixture.seed(&["One", "Two", "Three"]);
    let first = fixture.manager();
    let second = fixture.manager();

    let (a, b) = tokio::join!(first.sync(), second.sync());

    let marked = |outcome: SyncOutcome| match outcome {
        SyncOutcome::Synced { marked, .. } => marked,
        _ => 0,
    };
    assert_eq!(marked(a.unwrap()) + marked(b.unwrap()), 3);
    assert_eq!(fixture.synced_ids(&ids), ids);
    assert_eq!(fixture.index.stats().unwrap().entries, 3);
}
