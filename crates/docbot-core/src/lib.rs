//! Core traits and types for DocBot
//!
//! This crate defines the fundamental traits and types used across the DocBot system.
//! It provides capability-facing interfaces for chat models, embedding models, vector
//! stores, document indexers and query engines, so every hosted service can be swapped
//! for a fake in tests.

pub mod llm;
pub mod rag;
pub mod vector_store;
pub mod document_indexer;
pub mod error;

pub use error::{Error, Result};
pub use llm::{
    ChatMessage, ChatModel, EmbeddingModel, GenerationConfig, GenerationResult, MessageRole,
};
pub use rag::{ChatTurn, QueryEngine, QueryResult, TurnRole};
pub use vector_store::{DEFAULT_TOP_K, ScoredChunk, SearchConfig, VectorRecord, VectorStore};
pub use document_indexer::{
    ChunkMetadata, Document, DocumentChunk, DocumentIndexer, FailurePolicy, IndexingConfig,
    IngestionReport,
};

#[cfg(test)]
mod tests;
