//! Query engine trait and conversation types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{DocumentChunk, Result};

/// Who spoke a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    Human,
    Ai,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::Human => "human",
            TurnRole::Ai => "ai",
        }
    }
}

/// One turn of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub text: String,
}

impl ChatTurn {
    pub fn human(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Human,
            text: text.into(),
        }
    }

    pub fn ai(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Ai,
            text: text.into(),
        }
    }
}

/// Answer to a single query, computed fresh and never persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// The query as the user asked it
    pub query: String,
    /// The query actually sent to the retriever
    pub standalone_query: String,
    /// Synthesized answer text
    pub result: String,
    /// Chunks retrieved for the answer, in retrieval order
    pub source_documents: Vec<DocumentChunk>,
}

impl QueryResult {
    /// Source URLs of the retrieved chunks, in retrieval order, duplicates kept
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.source_documents.iter().map(|doc| doc.source())
    }
}

/// Trait for question-answering engines
///
/// This is the seam between the chat UI and the retrieval pipeline.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Answer `query` given the conversation so far
    async fn answer(&self, query: &str, history: &[ChatTurn]) -> Result<QueryResult>;
}
