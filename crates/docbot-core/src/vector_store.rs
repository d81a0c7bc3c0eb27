//! Vector store trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{DocumentChunk, Result};

/// Number of chunks a retriever returns when the caller does not override it
pub const DEFAULT_TOP_K: usize = 4;

/// A chunk paired with its embedding, ready to be upserted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub chunk: DocumentChunk,
    pub embedding: Vec<f32>,
}

/// A chunk returned from a similarity search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub id: String,
    pub chunk: DocumentChunk,
    pub score: f32,
}

/// Configuration for vector search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub top_k: usize,
    pub score_threshold: Option<f32>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            score_threshold: None,
        }
    }
}

/// Trait for vector stores (e.g., Qdrant, in-memory)
///
/// Stores `(vector, chunk)` pairs under identifiers the store assigns, and
/// answers nearest-neighbour queries. Upserting the same chunk twice is
/// allowed and must never drop existing entries.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Initialize the vector store connection
    async fn connect(&mut self) -> Result<()>;

    /// Store a batch of records, returning the assigned IDs in input order
    async fn store_batch(&self, records: Vec<VectorRecord>) -> Result<Vec<String>>;

    /// Search using a vector embedding, best match first
    async fn search_by_vector(
        &self,
        vector: Vec<f32>,
        config: &SearchConfig,
    ) -> Result<Vec<ScoredChunk>>;

    /// Get the total number of stored records
    async fn count(&self) -> Result<usize>;

    /// Check if the vector store is connected
    fn is_connected(&self) -> bool;
}
