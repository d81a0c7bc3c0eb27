//! History-aware retrieval-augmented query pipeline

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use docbot_core::{
    ChatModel, ChatTurn, DocumentChunk, EmbeddingModel, Error, QueryEngine, QueryResult, Result,
    SearchConfig, VectorStore,
};

use crate::prompts::{answer_messages, rephrase_messages};

/// Rewrites follow-ups, retrieves chunks and stuffs them into one answer prompt
///
/// Every step awaits the previous one; there is no retry and no partial
/// answer.
pub struct QueryPipeline<C: ChatModel, E: EmbeddingModel, V: VectorStore> {
    chat: Arc<C>,
    embeddings: Arc<E>,
    store: Arc<V>,
    search: SearchConfig,
}

impl<C: ChatModel, E: EmbeddingModel, V: VectorStore> QueryPipeline<C, E, V> {
    /// Create a pipeline retrieving the default number of chunks
    pub fn new(chat: Arc<C>, embeddings: Arc<E>, store: Arc<V>) -> Self {
        Self {
            chat,
            embeddings,
            store,
            search: SearchConfig::default(),
        }
    }

    pub fn with_search_config(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }

    /// The question to retrieve with: `query` itself when there is no history
    pub async fn condense_question(&self, query: &str, history: &[ChatTurn]) -> Result<String> {
        if history.is_empty() {
            return Ok(query.to_string());
        }

        let generation = self.chat.complete(&rephrase_messages(query, history)).await?;
        let standalone = generation.text.trim();
        if standalone.is_empty() {
            return Err(Error::ChatModel(
                "model returned an empty standalone question".to_string(),
            ));
        }

        debug!(standalone = %standalone, "rephrased follow-up question");
        Ok(standalone.to_string())
    }

    /// Nearest chunks for `question`, best match first
    pub async fn retrieve(&self, question: &str) -> Result<Vec<DocumentChunk>> {
        let vector = self.embeddings.embed_query(question).await?;
        let hits = self.store.search_by_vector(vector, &self.search).await?;

        if hits.is_empty() {
            return Err(Error::EmptyRetrieval(question.to_string()));
        }

        debug!(hits = hits.len(), "retrieved chunks");
        Ok(hits.into_iter().map(|hit| hit.chunk).collect())
    }

    /// Answer `query` from `documents` only
    pub async fn synthesize(
        &self,
        query: &str,
        history: &[ChatTurn],
        documents: &[DocumentChunk],
    ) -> Result<String> {
        let generation = self
            .chat
            .complete(&answer_messages(query, history, documents))
            .await?;
        Ok(generation.text)
    }
}

#[async_trait]
impl<C, E, V> QueryEngine for QueryPipeline<C, E, V>
where
    C: ChatModel + 'static,
    E: EmbeddingModel + 'static,
    V: VectorStore + 'static,
{
    async fn answer(&self, query: &str, history: &[ChatTurn]) -> Result<QueryResult> {
        info!(history = history.len(), "Running LLM to answer: {}", query);

        let standalone_query = self.condense_question(query, history).await?;
        let source_documents = self.retrieve(&standalone_query).await?;
        let result = self.synthesize(query, history, &source_documents).await?;

        Ok(QueryResult {
            query: query.to_string(),
            standalone_query,
            result,
            source_documents,
        })
    }
}
