//! Document indexer trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::{Error, Result};

/// Metadata attached to every document and chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Where the text came from: a file path while loading, a URL once indexed
    pub source: String,
}

/// A loaded document, before splitting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// A bounded-length slice of a document; the unit of retrieval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl DocumentChunk {
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: ChunkMetadata {
                source: source.into(),
            },
        }
    }

    pub fn source(&self) -> &str {
        &self.metadata.source
    }
}

/// What to do when a single document fails to load or split
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Record the error and continue with the remaining documents
    #[default]
    Skip,
    /// Stop the run before anything is upserted
    Abort,
}

impl FromStr for FailurePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "skip" => Ok(FailurePolicy::Skip),
            "abort" => Ok(FailurePolicy::Abort),
            other => Err(Error::Configuration(format!(
                "unknown document failure policy '{}', expected 'skip' or 'abort'",
                other
            ))),
        }
    }
}

/// Result of an ingestion run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestionReport {
    pub documents_loaded: usize,
    pub documents_failed: usize,
    pub chunks_indexed: usize,
    pub batches_total: usize,
    pub batches_failed: usize,
    pub errors: Vec<String>,
}

impl IngestionReport {
    pub fn is_success(&self) -> bool {
        self.documents_failed == 0 && self.batches_failed == 0
    }
}

/// Configuration for document indexing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub batch_size: usize,
    pub on_document_error: FailurePolicy,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 600,
            chunk_overlap: 50,
            batch_size: 100,
            on_document_error: FailurePolicy::Skip,
        }
    }
}

/// Trait for document indexers
///
/// Loads every document under a directory, splits it into chunks, and
/// upserts the chunks to a vector store.
#[async_trait]
pub trait DocumentIndexer: Send + Sync {
    /// Index every document under `directory`
    async fn ingest(&self, directory: &Path) -> Result<IngestionReport>;

    /// Index already-loaded documents
    async fn index_documents(&self, documents: Vec<Document>) -> Result<IngestionReport>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_policy_from_str() {
        assert_eq!("skip".parse::<FailurePolicy>().unwrap(), FailurePolicy::Skip);
        assert_eq!(" ABORT ".parse::<FailurePolicy>().unwrap(), FailurePolicy::Abort);
        assert!("retry".parse::<FailurePolicy>().is_err());
    }

    #[test]
    fn test_indexing_config_defaults() {
        let config = IndexingConfig::default();
        assert_eq!(config.chunk_size, 600);
        assert_eq!(config.chunk_overlap, 50);
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.on_document_error, FailurePolicy::Skip);
    }

    #[test]
    fn test_report_success() {
        let mut report = IngestionReport::default();
        assert!(report.is_success());
        report.batches_failed = 1;
        assert!(!report.is_success());
    }
}
