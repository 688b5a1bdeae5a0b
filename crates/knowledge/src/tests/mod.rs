//! Cross-module tests for the ingestion pipeline.

mod sync_consistency;
