//! Knowledge system type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a durable record.
pub type RecordId = i64;

/// A retrieved or synthesized piece of text handed to the workflows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Text content
    pub content: String,

    /// Where the content came from (link, search backend, record)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Document {
    /// Create a document without a source.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: None,
        }
    }

    /// Create a document with a source.
    pub fn with_source(content: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: Some(source.into()),
        }
    }
}

/// A durable-storage row as seen by the sync pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub content: String,

    /// Link carried into index entries as the document source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    pub synced: bool,
}

/// A record to be inserted by a scraper or by augmentation.
///
/// New records always start with `synced = false`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRecord {
    pub ticker: Option<String>,
    pub title: Option<String>,
    pub content: String,
    pub link: Option<String>,
    pub published_at: DateTime<Utc>,

    /// Producer of the record (e.g. "web_search_agent", "scraper")
    pub origin: String,
}

impl NewRecord {
    /// Create a record with the current time as publication time.
    pub fn new(content: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            ticker: None,
            title: None,
            content: content.into(),
            link: None,
            published_at: Utc::now(),
            origin: origin.into(),
        }
    }

    pub fn with_ticker(mut self, ticker: impl Into<String>) -> Self {
        self.ticker = Some(ticker.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }
}

/// A chunk of a record's content prior to embedding.
#[derive(Debug, Clone)]
pub struct ChunkCandidate {
    pub record_id: RecordId,
    pub position: u32,
    pub text: String,
    pub source: Option<String>,
}

/// An embedded chunk owned by the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Stable identifier derived from the record and position
    pub id: String,

    /// Originating record
    pub record_id: RecordId,

    /// Position within the record
    pub position: u32,

    /// Chunk text
    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Embedding vector
    #[serde(skip)]
    pub embedding: Vec<f32>,
}

impl IndexEntry {
    pub fn into_document(self) -> Document {
        Document {
            content: self.text,
            source: self.source,
        }
    }
}

/// Record counts reported by the durable store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordCounts {
    pub total: u64,
    pub unsynced: u64,
}

/// Statistics for the vector index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub collection: String,

    /// Number of distinct records with at least one entry
    pub records: u64,

    /// Number of index entries
    pub entries: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_constructors() {
        let plain = Document::new("Sensex closes higher");
        assert!(plain.source.is_none());

        let sourced = Document::with_source("Sensex closes higher", "https://example.com/a");
        assert_eq!(sourced.source.as_deref(), Some("https://example.com/a"));
    }

    #[test]
    fn test_new_record_builder() {
        let record = NewRecord::new("TCS wins deal", "scraper")
            .with_ticker("TCS.NS")
            .with_title("TCS news")
            .with_link("https://example.com/tcs");

        assert_eq!(record.ticker.as_deref(), Some("TCS.NS"));
        assert_eq!(record.origin, "scraper");
        assert_eq!(record.link.as_deref(), Some("https://example.com/tcs"));
    }

    #[test]
    fn test_index_entry_into_document() {
        let entry = IndexEntry {
            id: "abc".to_string(),
            record_id: 7,
            position: 0,
            text: "chunk".to_string(),
            source: Some("link".to_string()),
            embedding: vec![1.0],
        };

        assert_eq!(entry.into_document(), Document::with_source("chunk", "link"));
    }
}
