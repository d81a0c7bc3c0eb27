//! Pipeline tests over in-process fakes

#[cfg(test)]
mod pipeline_tests {
    use async_trait::async_trait;
    use docbot_core::{
        ChatMessage, ChatModel, EmbeddingModel, GenerationConfig, GenerationResult, MessageRole,
        ScoredChunk, VectorRecord,
    };
    use insta::{assert_snapshot, assert_yaml_snapshot};
    use std::collections::VecDeque;
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    use crate::*;

    const DIMENSIONS: usize = 32;

    /// Hashes words into a fixed number of buckets
    struct BagOfWordsEmbedder {
        queries: Mutex<Vec<String>>,
    }

    impl BagOfWordsEmbedder {
        fn new() -> Self {
            Self {
                queries: Mutex::new(Vec::new()),
            }
        }

        fn vectorize(text: &str) -> Vec<f32> {
            let mut vector = vec![0.0; DIMENSIONS];
            for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
                let bucket = word
                    .to_lowercase()
                    .bytes()
                    .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
                vector[bucket % DIMENSIONS] += 1.0;
            }
            vector
        }
    }

    #[async_trait]
    impl EmbeddingModel for BagOfWordsEmbedder {
        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| Self::vectorize(t)).collect())
        }

        async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
            self.queries.lock().unwrap().push(text.to_string());
            Ok(Self::vectorize(text))
        }

        fn dimensions(&self) -> usize {
            DIMENSIONS
        }
    }

    /// Replies with canned texts and records every request
    struct ScriptedChat {
        replies: Mutex<VecDeque<String>>,
        calls: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedChat {
        fn new(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Vec<ChatMessage>> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedChat {
        async fn complete_with_config(
            &self,
            messages: &[ChatMessage],
            _config: &GenerationConfig,
        ) -> Result<GenerationResult> {
            self.calls.lock().unwrap().push(messages.to_vec());
            let text = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| Error::ChatModel("script exhausted".to_string()))?;
            Ok(GenerationResult {
                text,
                model_id: "scripted".to_string(),
                tokens_used: None,
            })
        }

        fn model_id(&self) -> &str {
            "scripted"
        }
    }

    /// In-memory store whose n-th `store_batch` call fails
    struct FlakyStore {
        inner: InMemoryVectorStore,
        fail_on: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl VectorStore for FlakyStore {
        async fn connect(&mut self) -> Result<()> {
            self.inner.connect().await
        }

        async fn store_batch(&self, records: Vec<VectorRecord>) -> Result<Vec<String>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == self.fail_on {
                return Err(Error::VectorStore("upsert rejected".to_string()));
            }
            self.inner.store_batch(records).await
        }

        async fn search_by_vector(
            &self,
            vector: Vec<f32>,
            config: &SearchConfig,
        ) -> Result<Vec<ScoredChunk>> {
            self.inner.search_by_vector(vector, config).await
        }

        async fn count(&self) -> Result<usize> {
            self.inner.count().await
        }

        fn is_connected(&self) -> bool {
            self.inner.is_connected()
        }
    }

    /// 20 lines of 49 characters: two chunks at size 600 / overlap 50
    fn long_page(seed: usize) -> String {
        (0..20)
            .map(|i| format!("{:0>49}", seed * 100 + i))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// `<tmp>/langchain-docs/docs.example.com/page{1,2,3}.txt`
    fn docs_tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        let site = dir.path().join("langchain-docs").join("docs.example.com");
        fs::create_dir_all(&site).unwrap();
        for seed in 1..=3 {
            fs::write(site.join(format!("page{}.txt", seed)), long_page(seed)).unwrap();
        }
        dir
    }

    fn ingestion_config(root: &Path) -> IngestionConfig {
        IngestionConfig {
            docs_dir: root.join("langchain-docs"),
            local_prefix: format!("{}/langchain-docs", root.display()),
            remote_prefix: SourceRewriter::DEFAULT_REMOTE_PREFIX.to_string(),
            indexing: IndexingConfig::default(),
        }
    }

    #[tokio::test]
    async fn test_ingest_three_documents() {
        let dir = docs_tree();
        let config = ingestion_config(dir.path());
        let store = Arc::new(InMemoryVectorStore::new());
        let pipeline =
            IngestionPipeline::new(Arc::new(BagOfWordsEmbedder::new()), store.clone(), &config);

        let report = pipeline.ingest(&config.docs_dir).await.unwrap();

        assert!(report.is_success());
        assert_eq!(report.chunks_indexed, 6);
        assert_eq!(store.count().await.unwrap(), 6);

        let chunks = store.chunks().unwrap();
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 600));
        assert!(chunks.iter().all(|c| c.source().starts_with("https://docs.example.com/page")));

        assert_yaml_snapshot!(report, @r###"
        documents_loaded: 3
        documents_failed: 0
        chunks_indexed: 6
        batches_total: 1
        batches_failed: 0
        errors: []
        "###);
    }

    #[tokio::test]
    async fn test_reingest_keeps_prior_entries() {
        let dir = docs_tree();
        let config = ingestion_config(dir.path());
        let store = Arc::new(InMemoryVectorStore::new());
        let pipeline =
            IngestionPipeline::new(Arc::new(BagOfWordsEmbedder::new()), store.clone(), &config);

        pipeline.ingest(&config.docs_dir).await.unwrap();
        pipeline.ingest(&config.docs_dir).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 12);
    }

    #[tokio::test]
    async fn test_skip_policy_records_bad_document() {
        let dir = docs_tree();
        let bad = dir.path().join("langchain-docs/docs.example.com/logo.png");
        fs::write(bad, [0x89, 0x50, 0xff, 0xfe]).unwrap();

        let config = ingestion_config(dir.path());
        let store = Arc::new(InMemoryVectorStore::new());
        let pipeline =
            IngestionPipeline::new(Arc::new(BagOfWordsEmbedder::new()), store.clone(), &config);

        let report = pipeline.ingest(&config.docs_dir).await.unwrap();

        assert_eq!(report.documents_loaded, 3);
        assert_eq!(report.documents_failed, 1);
        assert_eq!(report.chunks_indexed, 6);
        assert!(!report.is_success());
        assert!(report.errors[0].contains("logo.png"));
    }

    #[tokio::test]
    async fn test_abort_policy_stops_before_upsert() {
        let dir = docs_tree();
        let bad = dir.path().join("langchain-docs/docs.example.com/logo.png");
        fs::write(bad, [0x89, 0x50, 0xff, 0xfe]).unwrap();

        let mut config = ingestion_config(dir.path());
        config.indexing.on_document_error = FailurePolicy::Abort;
        let store = Arc::new(InMemoryVectorStore::new());
        let pipeline =
            IngestionPipeline::new(Arc::new(BagOfWordsEmbedder::new()), store.clone(), &config);

        let err = pipeline.ingest(&config.docs_dir).await.unwrap_err();

        assert!(matches!(err, Error::Ingestion(_)));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_batch_does_not_stop_the_run() {
        let dir = docs_tree();
        let mut config = ingestion_config(dir.path());
        config.indexing.batch_size = 2;

        let store = Arc::new(FlakyStore {
            inner: InMemoryVectorStore::new(),
            fail_on: 2,
            calls: AtomicUsize::new(0),
        });
        let events = Arc::new(Mutex::new(Vec::new()));
        let recorded = events.clone();
        let pipeline =
            IngestionPipeline::new(Arc::new(BagOfWordsEmbedder::new()), store.clone(), &config)
                .with_progress(move |event| recorded.lock().unwrap().push(event.clone()));

        let report = pipeline.ingest(&config.docs_dir).await.unwrap();

        assert_eq!(report.batches_total, 3);
        assert_eq!(report.batches_failed, 1);
        assert_eq!(report.chunks_indexed, 4);
        assert_eq!(store.count().await.unwrap(), 4);

        let events = events.lock().unwrap();
        assert_eq!(events[0], BatchProgress::Started { batch: 1, total: 3 });
        assert_eq!(events[1], BatchProgress::Stored { batch: 1, chunks: 2 });
        assert!(matches!(events[3], BatchProgress::Failed { batch: 2, .. }));
        assert_eq!(events.len(), 6);
    }

    #[tokio::test]
    async fn test_unrewritable_source_is_a_document_failure() {
        let dir = docs_tree();
        let mut config = ingestion_config(dir.path());
        config.local_prefix = "/somewhere/else".to_string();
        let store = Arc::new(InMemoryVectorStore::new());
        let pipeline =
            IngestionPipeline::new(Arc::new(BagOfWordsEmbedder::new()), store.clone(), &config);

        let report = pipeline.ingest(&config.docs_dir).await.unwrap();

        assert_eq!(report.documents_failed, 3);
        assert_eq!(report.chunks_indexed, 0);
    }

    async fn indexed_store() -> (TempDir, Arc<InMemoryVectorStore>) {
        let dir = docs_tree();
        let config = ingestion_config(dir.path());
        let store = Arc::new(InMemoryVectorStore::new());
        IngestionPipeline::new(Arc::new(BagOfWordsEmbedder::new()), store.clone(), &config)
            .ingest(&config.docs_dir)
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_empty_history_uses_query_unchanged() {
        let (_dir, store) = indexed_store().await;
        let chat = Arc::new(ScriptedChat::new(&["Retrievers return documents."]));
        let embeddings = Arc::new(BagOfWordsEmbedder::new());
        let pipeline = QueryPipeline::new(chat.clone(), embeddings.clone(), store);

        let result = pipeline.answer("what is a retriever?", &[]).await.unwrap();

        assert_eq!(result.query, "what is a retriever?");
        assert_eq!(result.standalone_query, "what is a retriever?");
        assert_eq!(result.result, "Retrievers return documents.");
        assert_eq!(result.source_documents.len(), DEFAULT_TOP_K);
        assert_eq!(*embeddings.queries.lock().unwrap(), vec!["what is a retriever?"]);

        // only the answer call, no rephrase
        let calls = chat.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0][0].role, MessageRole::System);
        assert_eq!(calls[0].last().unwrap().content, "what is a retriever?");
    }

    #[tokio::test]
    async fn test_follow_up_is_rephrased_before_retrieval() {
        let (_dir, store) = indexed_store().await;
        let chat = Arc::new(ScriptedChat::new(&[
            "How do I stream output from LCEL chains?",
            "Call .stream() on the chain.",
        ]));
        let embeddings = Arc::new(BagOfWordsEmbedder::new());
        let pipeline = QueryPipeline::new(chat.clone(), embeddings.clone(), store);

        let history = vec![
            ChatTurn::human("What is LCEL?"),
            ChatTurn::ai("A way to compose chains."),
        ];
        let result = pipeline.answer("How do I stream it?", &history).await.unwrap();

        assert_eq!(result.query, "How do I stream it?");
        assert_eq!(result.standalone_query, "How do I stream output from LCEL chains?");
        assert_eq!(
            *embeddings.queries.lock().unwrap(),
            vec!["How do I stream output from LCEL chains?"]
        );

        let calls = chat.calls();
        assert_eq!(calls.len(), 2);
        assert_snapshot!(calls[0][0].content, @r###"
        Given the following conversation and a follow up question, rephrase the follow up question to be a standalone question.

        Chat History:
        Human: What is LCEL?
        AI: A way to compose chains.
        Follow Up Input: How do I stream it?
        Standalone Question:
        "###);

        // the answer prompt carries the history and the original wording
        let roles: Vec<MessageRole> = calls[1].iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                MessageRole::System,
                MessageRole::User,
                MessageRole::Assistant,
                MessageRole::User
            ]
        );
        assert_eq!(calls[1][3].content, "How do I stream it?");
    }

    #[tokio::test]
    async fn test_empty_index_is_a_hard_failure() {
        let chat = Arc::new(ScriptedChat::new(&["unused"]));
        let pipeline = QueryPipeline::new(
            chat.clone(),
            Arc::new(BagOfWordsEmbedder::new()),
            Arc::new(InMemoryVectorStore::new()),
        );

        let err = pipeline.answer("anything", &[]).await.unwrap_err();

        assert!(matches!(err, Error::EmptyRetrieval(_)));
        assert!(chat.calls().is_empty());
    }

    #[tokio::test]
    async fn test_chat_failure_propagates() {
        let (_dir, store) = indexed_store().await;
        let pipeline = QueryPipeline::new(
            Arc::new(ScriptedChat::new(&[])),
            Arc::new(BagOfWordsEmbedder::new()),
            store,
        );

        let err = pipeline.answer("anything", &[]).await.unwrap_err();
        assert!(matches!(err, Error::ChatModel(_)));
    }

    #[tokio::test]
    async fn test_blank_rephrase_is_rejected() {
        let (_dir, store) = indexed_store().await;
        let pipeline = QueryPipeline::new(
            Arc::new(ScriptedChat::new(&["   "])),
            Arc::new(BagOfWordsEmbedder::new()),
            store,
        );

        let history = vec![ChatTurn::human("hi"), ChatTurn::ai("hello")];
        assert!(pipeline.answer("and then?", &history).await.is_err());
    }
}
