//! Token-aware chunking of record content.
//!
//! Chunks are measured in `cl100k_base` tokens, never exceed the configured
//! capacity, and do not overlap. Boundaries always fall between tokens.

use crate::types::{ChunkCandidate, Record};
use insights_core::{AppError, AppResult};
use text_splitter::{ChunkConfig, TextSplitter};
use tiktoken_rs::CoreBPE;

/// Splits record content into bounded token chunks.
pub struct TokenChunker {
    splitter: TextSplitter<CoreBPE>,
    capacity: usize,
}

impl TokenChunker {
    /// Create a chunker with the given capacity in tokens.
    pub fn new(capacity: usize) -> AppResult<Self> {
        if capacity == 0 {
            return Err(AppError::Config(
                "Chunk capacity must be greater than zero".to_string(),
            ));
        }

        let tokenizer = tiktoken_rs::cl100k_base()
            .map_err(|e| AppError::Config(format!("Failed to load tokenizer: {}", e)))?;

        let splitter = TextSplitter::new(ChunkConfig::new(capacity).with_sizer(tokenizer));

        Ok(Self { splitter, capacity })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Split a record into ordered chunk candidates.
    ///
    /// Whitespace-only content yields no chunks.
    pub fn chunk_record(&self, record: &Record) -> Vec<ChunkCandidate> {
        let chunks: Vec<ChunkCandidate> = self
            .splitter
            .chunks(&record.content)
            .filter(|text| !text.trim().is_empty())
            .enumerate()
            .map(|(position, text)| ChunkCandidate {
                record_id: record.id,
                position: position as u32,
                text: text.to_string(),
                source: record.source.clone(),
            })
            .collect();

        tracing::debug!(
            record_id = record.id,
            chunks = chunks.len(),
            "Chunked record ({} bytes)",
            record.content.len()
        );

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(content: &str) -> Record {
        Record {
            id: 1,
            content: content.to_string(),
            source: Some("https://example.com/news".to_string()),
            synced: false,
        }
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(TokenChunker::new(0).is_err());
    }

    #[test]
    fn test_short_content_single_chunk() {
        let chunker = TokenChunker::new(250).unwrap();
        let chunks = chunker.chunk_record(&record("Reliance shares rose 2% on Monday."));

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].position, 0);
        assert_eq!(chunks[0].record_id, 1);
        assert_eq!(chunks[0].source.as_deref(), Some("https://example.com/news"));
    }

    #[test]
    fn test_chunks_respect_token_capacity() {
        let chunker = TokenChunker::new(50).unwrap();
        let text = "Infosys reported quarterly revenue growth above estimates. ".repeat(40);
        let chunks = chunker.chunk_record(&record(&text));

        assert!(chunks.len() > 1);

        let bpe = tiktoken_rs::cl100k_base().unwrap();
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.position as usize, i);
            assert!(bpe.encode_ordinary(&chunk.text).len() <= 50);
        }
    }

    #[test]
    fn test_chunks_do_not_overlap() {
        let chunker = TokenChunker::new(20).unwrap();
        let text = (0..200)
            .map(|i| format!("word{}", i))
            .collect::<Vec<_>>()
            .join(" ");
        let chunks = chunker.chunk_record(&record(&text));

        let rejoined = chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(rejoined.split_whitespace().count(), 200);
    }

    #[test]
    fn test_empty_content_yields_nothing() {
        let chunker = TokenChunker::new(250).unwrap();
        assert!(chunker.chunk_record(&record("")).is_empty());
        assert!(chunker.chunk_record(&record("   \n\t ")).is_empty());
    }
}
