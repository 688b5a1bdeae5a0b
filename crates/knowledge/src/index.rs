//! SQLite-backed vector index.

use crate::types::{ChunkCandidate, IndexEntry, IndexStats, RecordId};
use crate::vector_index::VectorIndex;
use insights_core::{AppError, AppResult};
use rusqlite::{params, Connection};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Stable entry id for a chunk of a record within a collection.
pub fn entry_id(collection: &str, record_id: RecordId, position: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(collection.as_bytes());
    hasher.update(b":");
    hasher.update(record_id.to_le_bytes());
    hasher.update(b":");
    hasher.update(position.to_le_bytes());
    format!("{:x}", hasher.finalize())
}

/// Pair chunk candidates with their embeddings.
pub fn build_entries(
    collection: &str,
    candidates: Vec<ChunkCandidate>,
    embeddings: Vec<Vec<f32>>,
) -> AppResult<Vec<IndexEntry>> {
    if candidates.len() != embeddings.len() {
        return Err(AppError::Embedding(format!(
            "Got {} embeddings for {} chunks",
            embeddings.len(),
            candidates.len()
        )));
    }

    Ok(candidates
        .into_iter()
        .zip(embeddings)
        .map(|(candidate, embedding)| IndexEntry {
            id: entry_id(collection, candidate.record_id, candidate.position),
            record_id: candidate.record_id,
            position: candidate.position,
            text: candidate.text,
            source: candidate.source,
            embedding,
        })
        .collect())
}

/// Vector index stored in a single SQLite file, partitioned by collection.
#[derive(Debug, Clone)]
pub struct SqliteVectorIndex {
    path: PathBuf,
    collection: String,
}

impl SqliteVectorIndex {
    /// Open (and if needed create) the index at `path`.
    pub fn open(path: impl AsRef<Path>, collection: impl Into<String>) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::Index(format!("Failed to create index directory: {}", e)))?;
        }

        let index = Self {
            path,
            collection: collection.into(),
        };

        index
            .connect()?
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS index_entries (
                    id TEXT PRIMARY KEY,
                    collection TEXT NOT NULL,
                    record_id INTEGER NOT NULL,
                    position INTEGER NOT NULL,
                    text TEXT NOT NULL,
                    source TEXT,
                    embedding BLOB NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_entries_collection ON index_entries(collection);
                "#,
            )
            .map_err(|e| AppError::Index(format!("Failed to create tables: {}", e)))?;

        tracing::debug!(
            "Initialized vector index at {:?} (collection: {})",
            index.path,
            index.collection
        );
        Ok(index)
    }

    /// Open an index that must already exist.
    ///
    /// Used by read paths so a missing index surfaces as an error rather
    /// than an empty result.
    pub fn open_existing(path: impl AsRef<Path>, collection: impl Into<String>) -> AppResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AppError::Index(format!("Index not found at {:?}", path)));
        }
        Self::open(path, collection)
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn connect(&self) -> AppResult<Connection> {
        let conn = Connection::open(&self.path)
            .map_err(|e| AppError::Index(format!("Failed to open SQLite index: {}", e)))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| AppError::Index(format!("Failed to set busy timeout: {}", e)))?;
        Ok(conn)
    }
}

impl VectorIndex for SqliteVectorIndex {
    fn store_chunks(&self, entries: &[IndexEntry]) -> AppResult<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        let mut conn = self.connect()?;
        let tx = conn
            .transaction()
            .map_err(|e| AppError::Index(format!("Failed to begin transaction: {}", e)))?;

        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR REPLACE INTO index_entries
                     (id, collection, record_id, position, text, source, embedding)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                )
                .map_err(|e| AppError::Index(format!("Failed to prepare insert: {}", e)))?;

            for entry in entries {
                if entry.embedding.is_empty() {
                    return Err(AppError::Index(format!(
                        "Entry {} has no embedding",
                        entry.id
                    )));
                }

                stmt.execute(params![
                    entry.id,
                    self.collection,
                    entry.record_id,
                    entry.position as i64,
                    entry.text,
                    entry.source,
                    embedding_to_bytes(&entry.embedding),
                ])
                .map_err(|e| AppError::Index(format!("Failed to insert entry: {}", e)))?;
            }
        }

        tx.commit()
            .map_err(|e| AppError::Index(format!("Failed to commit entries: {}", e)))?;

        tracing::debug!("Stored {} index entries", entries.len());
        Ok(entries.len())
    }

    fn search(&self, query_embedding: &[f32], top_k: usize) -> AppResult<Vec<(IndexEntry, f32)>> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, record_id, position, text, source, embedding
                 FROM index_entries WHERE collection = ?1",
            )
            .map_err(|e| AppError::Index(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(params![self.collection], |row| {
                let bytes: Vec<u8> = row.get(5)?;
                Ok((
                    IndexEntry {
                        id: row.get(0)?,
                        record_id: row.get(1)?,
                        position: row.get::<_, i64>(2)? as u32,
                        text: row.get(3)?,
                        source: row.get(4)?,
                        embedding: Vec::new(),
                    },
                    bytes,
                ))
            })
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(|e| AppError::Index(format!("Failed to query entries: {}", e)))?;

        let mut results = Vec::with_capacity(rows.len());
        for (mut entry, bytes) in rows {
            entry.embedding = bytes_to_embedding(&bytes)?;
            let score = cosine_similarity(query_embedding, &entry.embedding);
            results.push((entry, score));
        }

        results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(top_k);

        tracing::debug!(
            "Retrieved {} entries (requested top-{})",
            results.len(),
            top_k
        );

        Ok(results)
    }

    fn stats(&self) -> AppResult<IndexStats> {
        let conn = self.connect()?;
        let (entries, records) = conn
            .query_row(
                "SELECT COUNT(*), COUNT(DISTINCT record_id) FROM index_entries WHERE collection = ?1",
                params![self.collection],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
            )
            .map_err(|e| AppError::Index(format!("Failed to count entries: {}", e)))?;

        Ok(IndexStats {
            collection: self.collection.clone(),
            records: records as u64,
            entries: entries as u64,
        })
    }
}

fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Index(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(record_id: RecordId, position: u32, text: &str, embedding: Vec<f32>) -> IndexEntry {
        IndexEntry {
            id: entry_id("news_articles", record_id, position),
            record_id,
            position,
            text: text.to_string(),
            source: None,
            embedding,
        }
    }

    fn open_index(temp: &TempDir) -> SqliteVectorIndex {
        SqliteVectorIndex::open(temp.path().join("index.sqlite"), "news_articles").unwrap()
    }

    #[test]
    fn test_entry_id_is_stable_and_distinct() {
        assert_eq!(entry_id("c", 1, 0), entry_id("c", 1, 0));
        assert_ne!(entry_id("c", 1, 0), entry_id("c", 1, 1));
        assert_ne!(entry_id("c", 1, 0), entry_id("d", 1, 0));
        assert_eq!(entry_id("c", 1, 0).len(), 64);
    }

    #[test]
    fn test_store_and_search_ranks_by_similarity() {
        let temp = TempDir::new().unwrap();
        let index = open_index(&temp);

        index
            .store_chunks(&[
                entry(1, 0, "far", vec![0.0, 1.0, 0.0]),
                entry(2, 0, "near", vec![0.9, 0.1, 0.0]),
                entry(3, 0, "exact", vec![1.0, 0.0, 0.0]),
            ])
            .unwrap();

        let results = index.search(&[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0.text, "exact");
        assert_eq!(results[1].0.text, "near");
        assert!(results[0].1 >= results[1].1);
    }

    #[test]
    fn test_restore_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let index = open_index(&temp);
        let batch = vec![entry(1, 0, "a", vec![1.0, 0.0]), entry(1, 1, "b", vec![0.0, 1.0])];

        index.store_chunks(&batch).unwrap();
        index.store_chunks(&batch).unwrap();

        let stats = index.stats().unwrap();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.records, 1);
    }

    #[test]
    fn test_failed_batch_stores_nothing() {
        let temp = TempDir::new().unwrap();
        let index = open_index(&temp);

        let result = index.store_chunks(&[
            entry(1, 0, "good", vec![1.0, 0.0]),
            entry(2, 0, "bad", Vec::new()),
        ]);

        assert!(result.is_err());
        assert_eq!(index.stats().unwrap().entries, 0);
    }

    #[test]
    fn test_collections_are_isolated() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("index.sqlite");
        let news = SqliteVectorIndex::open(&path, "news_articles").unwrap();
        let other = SqliteVectorIndex::open(&path, "filings").unwrap();

        news.store_chunks(&[entry(1, 0, "a", vec![1.0])]).unwrap();

        assert!(other.search(&[1.0], 5).unwrap().is_empty());
        assert_eq!(other.stats().unwrap().entries, 0);
    }

    #[test]
    fn test_open_existing_requires_file() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing.sqlite");
        assert!(SqliteVectorIndex::open_existing(&missing, "news_articles").is_err());
    }

    #[test]
    fn test_build_entries_length_mismatch() {
        let candidates = vec![ChunkCandidate {
            record_id: 1,
            position: 0,
            text: "x".to_string(),
            source: None,
        }];
        assert!(build_entries("c", candidates, Vec::new()).is_err());
    }

    #[test]
    fn test_embedding_bytes_round_trip() {
        let values = vec![0.25f32, -1.5, 3.0];
        assert_eq!(bytes_to_embedding(&embedding_to_bytes(&values)).unwrap(), values);
        assert!(bytes_to_embedding(&[0, 1, 2]).is_err());
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 0.001);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 0.001);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }
}
