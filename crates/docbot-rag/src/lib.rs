//! Retrieval-augmented generation for DocBot
//!
//! This crate provides the ingestion pipeline (loading, splitting, source
//! rewriting, batched upserts), the vector stores, and the history-aware
//! query pipeline.

mod splitter;
mod loader;
mod source;
mod vector_store;
mod document_indexer;
mod prompts;
mod engine;

#[cfg(test)]
mod tests;

pub use splitter::RecursiveCharacterSplitter;
pub use loader::{DocsLoader, extract_main_text};
pub use source::SourceRewriter;
pub use vector_store::{InMemoryVectorStore, QdrantConfig, QdrantVectorStore};
pub use document_indexer::{BatchProgress, IngestionConfig, IngestionPipeline};
pub use prompts::{answer_messages, render_history, rephrase_messages};
pub use engine::QueryPipeline;

// Re-export core types for convenience
pub use docbot_core::{
    ChatTurn, DEFAULT_TOP_K, Document, DocumentChunk, DocumentIndexer, Error, FailurePolicy,
    IndexingConfig, IngestionReport, QueryEngine, QueryResult, Result, SearchConfig, VectorStore,
};
