//! Durable record storage.
//!
//! Records are the source of truth; the vector index is derived from them.
//! The `synced` flag is only ever flipped by the sync manager through
//! [`RecordStore::mark_synced`].

use crate::types::{NewRecord, Record, RecordCounts, RecordId};
use insights_core::{AppError, AppResult};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Ids bound per UPDATE, well under SQLite's bound-variable limit.
const MARK_BATCH_SIZE: usize = 500;

/// Operations the workflows and the sync manager need from durable storage.
pub trait RecordStore: Send + Sync {
    /// Insert a record unconditionally.
    fn insert(&self, record: &NewRecord) -> AppResult<RecordId>;

    /// Insert a record unless one with exactly the same content exists.
    ///
    /// Returns `None` when the record was skipped.
    fn insert_if_absent(&self, record: &NewRecord) -> AppResult<Option<RecordId>>;

    /// All records with `synced = false`, oldest first.
    fn fetch_unsynced(&self) -> AppResult<Vec<Record>>;

    /// Flip `synced` to true for the given ids.
    ///
    /// Only rows still unsynced are touched, so concurrent callers marking
    /// overlapping id sets never double count. Returns the number updated.
    fn mark_synced(&self, ids: &[RecordId]) -> AppResult<usize>;

    fn get(&self, id: RecordId) -> AppResult<Option<Record>>;

    fn counts(&self) -> AppResult<RecordCounts>;
}

/// SQLite-backed record store.
///
/// A connection is opened per operation so the store can be shared across
/// tasks; SQLite's own locking arbitrates concurrent writers.
#[derive(Debug, Clone)]
pub struct SqliteRecordStore {
    path: PathBuf,
}

impl SqliteRecordStore {
    /// Open (and if needed create) the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Storage(format!("Failed to create storage directory: {}", e))
            })?;
        }

        let store = Self { path };
        let conn = store.connect()?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS news_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ticker TEXT,
                title TEXT,
                content TEXT NOT NULL,
                link TEXT,
                published_at TEXT NOT NULL,
                origin TEXT NOT NULL,
                synced INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_news_records_synced ON news_records(synced);
            CREATE INDEX IF NOT EXISTS idx_news_records_content ON news_records(content);
            "#,
        )
        .map_err(|e| AppError::Storage(format!("Failed to create tables: {}", e)))?;

        tracing::debug!("Opened record store at {:?}", store.path);
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> AppResult<Connection> {
        let conn = Connection::open(&self.path)
            .map_err(|e| AppError::Storage(format!("Failed to open record store: {}", e)))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| AppError::Storage(format!("Failed to set busy timeout: {}", e)))?;
        Ok(conn)
    }

    fn insert_with(conn: &Connection, record: &NewRecord) -> AppResult<RecordId> {
        conn.execute(
            "INSERT INTO news_records (ticker, title, content, link, published_at, origin, synced)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)",
            params![
                record.ticker,
                record.title,
                record.content,
                record.link,
                record.published_at.to_rfc3339(),
                record.origin,
            ],
        )
        .map_err(|e| AppError::Storage(format!("Failed to insert record: {}", e)))?;

        Ok(conn.last_insert_rowid())
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<Record> {
    Ok(Record {
        id: row.get(0)?,
        content: row.get(1)?,
        source: row.get(2)?,
        synced: row.get::<_, i64>(3)? != 0,
    })
}

impl RecordStore for SqliteRecordStore {
    fn insert(&self, record: &NewRecord) -> AppResult<RecordId> {
        let conn = self.connect()?;
        Self::insert_with(&conn, record)
    }

    fn insert_if_absent(&self, record: &NewRecord) -> AppResult<Option<RecordId>> {
        let mut conn = self.connect()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| AppError::Storage(format!("Failed to begin transaction: {}", e)))?;

        let exists = tx
            .query_row(
                "SELECT 1 FROM news_records WHERE content = ?1 LIMIT 1",
                params![record.content],
                |_| Ok(()),
            )
            .optional()
            .map_err(|e| AppError::Storage(format!("Failed to check for duplicate: {}", e)))?
            .is_some();

        if exists {
            tracing::debug!("Record with identical content already stored, skipping");
            return Ok(None);
        }

        let id = Self::insert_with(&tx, record)?;
        tx.commit()
            .map_err(|e| AppError::Storage(format!("Failed to commit insert: {}", e)))?;

        Ok(Some(id))
    }

    fn fetch_unsynced(&self) -> AppResult<Vec<Record>> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare("SELECT id, content, link, synced FROM news_records WHERE synced = 0 ORDER BY id")
            .map_err(|e| AppError::Storage(format!("Failed to prepare query: {}", e)))?;

        let records = stmt
            .query_map([], row_to_record)
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(|e| AppError::Storage(format!("Failed to fetch unsynced records: {}", e)))?;

        Ok(records)
    }

    fn mark_synced(&self, ids: &[RecordId]) -> AppResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut conn = self.connect()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| AppError::Storage(format!("Failed to begin transaction: {}", e)))?;

        let mut updated = 0;
        for batch in ids.chunks(MARK_BATCH_SIZE) {
            let placeholders = vec!["?"; batch.len()].join(", ");
            let sql = format!(
                "UPDATE news_records SET synced = 1 WHERE synced = 0 AND id IN ({})",
                placeholders
            );

            updated += tx
                .execute(&sql, params_from_iter(batch.iter()))
                .map_err(|e| AppError::Storage(format!("Failed to mark records synced: {}", e)))?;
        }

        tx.commit()
            .map_err(|e| AppError::Storage(format!("Failed to commit sync marks: {}", e)))?;

        Ok(updated)
    }

    fn get(&self, id: RecordId) -> AppResult<Option<Record>> {
        let conn = self.connect()?;
        conn.query_row(
            "SELECT id, content, link, synced FROM news_records WHERE id = ?1",
            params![id],
            row_to_record,
        )
        .optional()
        .map_err(|e| AppError::Storage(format!("Failed to load record {}: {}", id, e)))
    }

    fn counts(&self) -> AppResult<RecordCounts> {
        let conn = self.connect()?;
        conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(CASE WHEN synced = 0 THEN 1 ELSE 0 END), 0)
             FROM news_records",
            [],
            |row| {
                Ok(RecordCounts {
                    total: row.get::<_, i64>(0)? as u64,
                    unsynced: row.get::<_, i64>(1)? as u64,
                })
            },
        )
        .map_err(|e| AppError::Storage(format!("Failed to count records: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store(dir: &TempDir) -> SqliteRecordStore {
        SqliteRecordStore::open(dir.path().join(".insights/records.sqlite")).unwrap()
    }

    #[test]
    fn test_open_creates_parent_directory() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        assert!(store.path().exists());
    }

    #[test]
    fn test_insert_starts_unsynced() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        let id = store
            .insert(&NewRecord::new("ITC announces dividend", "scraper").with_link("https://a"))
            .unwrap();

        let record = store.get(id).unwrap().unwrap();
        assert!(!record.synced);
        assert_eq!(record.source.as_deref(), Some("https://a"));
        assert_eq!(store.fetch_unsynced().unwrap(), vec![record]);
    }

    #[test]
    fn test_insert_if_absent_skips_exact_duplicates() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        let first = store
            .insert_if_absent(&NewRecord::new("Same story", "web_search_agent"))
            .unwrap();
        let second = store
            .insert_if_absent(&NewRecord::new("Same story", "web_search_agent"))
            .unwrap();
        let different = store
            .insert_if_absent(&NewRecord::new("Same story.", "web_search_agent"))
            .unwrap();

        assert!(first.is_some());
        assert!(second.is_none());
        assert!(different.is_some());
        assert_eq!(store.counts().unwrap().total, 2);
    }

    #[test]
    fn test_mark_synced_only_counts_unsynced_rows() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        let a = store.insert(&NewRecord::new("a", "scraper")).unwrap();
        let b = store.insert(&NewRecord::new("b", "scraper")).unwrap();
        let c = store.insert(&NewRecord::new("c", "scraper")).unwrap();

        assert_eq!(store.mark_synced(&[a, b]).unwrap(), 2);
        // Overlapping second call only flips the remaining row
        assert_eq!(store.mark_synced(&[b, c]).unwrap(), 1);
        assert_eq!(store.mark_synced(&[]).unwrap(), 0);

        let counts = store.counts().unwrap();
        assert_eq!(counts, RecordCounts { total: 3, unsynced: 0 });
        assert!(store.fetch_unsynced().unwrap().is_empty());
    }

    #[test]
    fn test_mark_synced_backlog_beyond_variable_limit() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        let mut conn = store.connect().unwrap();
        let tx = conn.transaction().unwrap();
        for _ in 0..33_000 {
            SqliteRecordStore::insert_with(&tx, &NewRecord::new("", "scraper")).unwrap();
        }
        tx.commit().unwrap();

        let ids: Vec<RecordId> = store
            .fetch_unsynced()
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids.len(), 33_000);

        assert_eq!(store.mark_synced(&ids).unwrap(), 33_000);
        assert_eq!(store.counts().unwrap().unsynced, 0);
    }

    #[test]
    fn test_mark_synced_unknown_ids() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        assert_eq!(store.mark_synced(&[42, 43]).unwrap(), 0);
    }

    #[test]
    fn test_counts_on_empty_store() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        assert_eq!(store.counts().unwrap(), RecordCounts::default());
        assert!(store.get(1).unwrap().is_none());
    }
}
