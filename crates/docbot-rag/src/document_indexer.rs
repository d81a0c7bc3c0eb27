//! Document ingestion pipeline

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use docbot_core::{
    Document, DocumentChunk, DocumentIndexer, EmbeddingModel, Error, FailurePolicy,
    IndexingConfig, IngestionReport, Result, VectorRecord, VectorStore,
};

use crate::loader::DocsLoader;
use crate::source::SourceRewriter;
use crate::splitter::RecursiveCharacterSplitter;

/// Settings for an ingestion run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    pub docs_dir: PathBuf,
    pub local_prefix: String,
    pub remote_prefix: String,
    pub indexing: IndexingConfig,
}

impl IngestionConfig {
    pub const DEFAULT_DOCS_DIR: &'static str = "langchain-docs/api.python.langchain.com/en/latest";

    /// Create configuration from environment variables, every one optional
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let docs_dir = env::var("DOCBOT_DOCS_DIR")
            .unwrap_or_else(|_| Self::DEFAULT_DOCS_DIR.to_string())
            .into();
        let local_prefix = env::var("DOCBOT_LOCAL_PREFIX")
            .unwrap_or_else(|_| SourceRewriter::DEFAULT_LOCAL_PREFIX.to_string());
        let remote_prefix = env::var("DOCBOT_REMOTE_PREFIX")
            .unwrap_or_else(|_| SourceRewriter::DEFAULT_REMOTE_PREFIX.to_string());

        let on_document_error = match env::var("DOCBOT_ON_DOCUMENT_ERROR") {
            Ok(value) => value.parse()?,
            Err(_) => FailurePolicy::default(),
        };

        Ok(Self {
            docs_dir,
            local_prefix,
            remote_prefix,
            indexing: IndexingConfig {
                on_document_error,
                ..IndexingConfig::default()
            },
        })
    }

    pub fn rewriter(&self) -> SourceRewriter {
        SourceRewriter::new(&self.local_prefix, &self.remote_prefix)
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            docs_dir: PathBuf::from(Self::DEFAULT_DOCS_DIR),
            local_prefix: SourceRewriter::DEFAULT_LOCAL_PREFIX.to_string(),
            remote_prefix: SourceRewriter::DEFAULT_REMOTE_PREFIX.to_string(),
            indexing: IndexingConfig::default(),
        }
    }
}

/// Progress notifications emitted while batches are upserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchProgress {
    Started { batch: usize, total: usize },
    Stored { batch: usize, chunks: usize },
    Failed { batch: usize, error: String },
}

type ProgressCallback = Box<dyn Fn(&BatchProgress) + Send + Sync>;

/// Loads, splits, rewrites and upserts documentation pages
///
/// Batches are embedded and stored one after another. A failed batch is
/// recorded in the report and the run moves on to the next one.
pub struct IngestionPipeline<E: EmbeddingModel, V: VectorStore> {
    embeddings: Arc<E>,
    store: Arc<V>,
    splitter: RecursiveCharacterSplitter,
    rewriter: SourceRewriter,
    config: IndexingConfig,
    on_progress: Option<ProgressCallback>,
}

impl<E: EmbeddingModel, V: VectorStore> IngestionPipeline<E, V> {
    pub fn new(embeddings: Arc<E>, store: Arc<V>, config: &IngestionConfig) -> Self {
        Self {
            embeddings,
            store,
            splitter: RecursiveCharacterSplitter::new(
                config.indexing.chunk_size,
                config.indexing.chunk_overlap,
            ),
            rewriter: config.rewriter(),
            config: config.indexing.clone(),
            on_progress: None,
        }
    }

    /// Observe per-batch progress, e.g. to print it
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&BatchProgress) + Send + Sync + 'static,
    {
        self.on_progress = Some(Box::new(callback));
        self
    }

    fn report_progress(&self, event: BatchProgress) {
        if let Some(callback) = &self.on_progress {
            callback(&event);
        }
    }

    /// Record one failed document, or abort the run under `FailurePolicy::Abort`
    fn document_failed(&self, report: &mut IngestionReport, error: Error) -> Result<()> {
        warn!(error = %error, "skipping document");
        report.documents_failed += 1;
        report.errors.push(error.to_string());

        match self.config.on_document_error {
            FailurePolicy::Skip => Ok(()),
            FailurePolicy::Abort => Err(Error::Ingestion(format!(
                "aborting ingestion after document failure: {}",
                error
            ))),
        }
    }

    fn chunk_document(&self, document: &Document) -> Result<Vec<DocumentChunk>> {
        let mut chunks = self.splitter.split_document(document);
        self.rewriter.rewrite_chunks(&mut chunks)?;
        Ok(chunks)
    }

    async fn store_chunks(&self, batch: &[DocumentChunk]) -> Result<usize> {
        let texts: Vec<String> = batch.iter().map(|chunk| chunk.text.clone()).collect();
        let vectors = self.embeddings.embed_documents(&texts).await?;

        if vectors.len() != batch.len() {
            return Err(Error::Embedding(format!(
                "expected {} embeddings, got {}",
                batch.len(),
                vectors.len()
            )));
        }

        let records: Vec<VectorRecord> = batch
            .iter()
            .cloned()
            .zip(vectors)
            .map(|(chunk, embedding)| VectorRecord { chunk, embedding })
            .collect();

        let ids = self.store.store_batch(records).await?;
        Ok(ids.len())
    }

    async fn run(
        &self,
        documents: Vec<Document>,
        mut report: IngestionReport,
    ) -> Result<IngestionReport> {
        let mut chunks = Vec::new();
        for document in &documents {
            match self.chunk_document(document) {
                Ok(document_chunks) => {
                    debug!(
                        source = %document.metadata.source,
                        chunks = document_chunks.len(),
                        "split document"
                    );
                    chunks.extend(document_chunks);
                }
                Err(e) => self.document_failed(&mut report, e)?,
            }
        }

        info!(chunks = chunks.len(), "Going to add {} to the vector store", chunks.len());

        let batch_size = self.config.batch_size.max(1);
        let batches: Vec<&[DocumentChunk]> = chunks.chunks(batch_size).collect();
        report.batches_total = batches.len();

        for (i, batch) in batches.into_iter().enumerate() {
            let number = i + 1;
            info!("Processing batch {} of {}", number, report.batches_total);
            self.report_progress(BatchProgress::Started {
                batch: number,
                total: report.batches_total,
            });

            match self.store_chunks(batch).await {
                Ok(stored) => {
                    report.chunks_indexed += stored;
                    info!("Batch {} processed successfully", number);
                    self.report_progress(BatchProgress::Stored {
                        batch: number,
                        chunks: stored,
                    });
                }
                Err(e) => {
                    warn!(batch = number, error = %e, "batch failed");
                    report.batches_failed += 1;
                    report.errors.push(format!("batch {}: {}", number, e));
                    self.report_progress(BatchProgress::Failed {
                        batch: number,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            indexed = report.chunks_indexed,
            failed_batches = report.batches_failed,
            "ingestion finished"
        );
        Ok(report)
    }
}

#[async_trait]
impl<E, V> DocumentIndexer for IngestionPipeline<E, V>
where
    E: EmbeddingModel + 'static,
    V: VectorStore + 'static,
{
    async fn ingest(&self, directory: &Path) -> Result<IngestionReport> {
        let loader = DocsLoader::new(directory);
        let outcomes = loader.load().await?;

        let mut report = IngestionReport::default();
        let mut documents = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome {
                Ok(document) => {
                    report.documents_loaded += 1;
                    documents.push(document);
                }
                Err(e) => self.document_failed(&mut report, e)?,
            }
        }

        info!(
            directory = %directory.display(),
            "loaded {} documents",
            report.documents_loaded
        );

        self.run(documents, report).await
    }

    async fn index_documents(&self, documents: Vec<Document>) -> Result<IngestionReport> {
        let report = IngestionReport {
            documents_loaded: documents.len(),
            ..IngestionReport::default()
        };
        self.run(documents, report).await
    }
}
