//! Vector store implementations

use async_trait::async_trait;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder,
    UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant, QdrantError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::env;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use docbot_core::{
    DocumentChunk, Error, Result, ScoredChunk, SearchConfig, VectorRecord, VectorStore,
};

/// Local in-memory vector store implementation
pub struct InMemoryVectorStore {
    records: Arc<RwLock<Vec<(String, VectorRecord)>>>,
    connected: bool,
}

impl InMemoryVectorStore {
    /// Create a new in-memory vector store
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
            connected: false,
        }
    }

    /// Simple cosine similarity calculation
    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }

        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot_product / (norm_a * norm_b)
    }

    /// Snapshot of every stored chunk, in insertion order
    pub fn chunks(&self) -> Result<Vec<DocumentChunk>> {
        let records = self
            .records
            .read()
            .map_err(|e| Error::VectorStore(format!("Lock error: {}", e)))?;
        Ok(records.iter().map(|(_, r)| r.chunk.clone()).collect())
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn connect(&mut self) -> Result<()> {
        self.connected = true;
        Ok(())
    }

    async fn store_batch(&self, records: Vec<VectorRecord>) -> Result<Vec<String>> {
        let mut stored = self
            .records
            .write()
            .map_err(|e| Error::VectorStore(format!("Lock error: {}", e)))?;

        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            let id = Uuid::new_v4().to_string();
            stored.push((id.clone(), record));
            ids.push(id);
        }

        Ok(ids)
    }

    async fn search_by_vector(
        &self,
        vector: Vec<f32>,
        config: &SearchConfig,
    ) -> Result<Vec<ScoredChunk>> {
        let stored = self
            .records
            .read()
            .map_err(|e| Error::VectorStore(format!("Lock error: {}", e)))?;

        let mut results: Vec<ScoredChunk> = stored
            .iter()
            .map(|(id, record)| ScoredChunk {
                id: id.clone(),
                chunk: record.chunk.clone(),
                score: Self::cosine_similarity(&vector, &record.embedding),
            })
            .filter(|scored| match config.score_threshold {
                Some(threshold) => scored.score >= threshold,
                None => true,
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(config.top_k);

        Ok(results)
    }

    async fn count(&self) -> Result<usize> {
        let stored = self
            .records
            .read()
            .map_err(|e| Error::VectorStore(format!("Lock error: {}", e)))?;
        Ok(stored.len())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// Connection settings for a hosted Qdrant collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QdrantConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub collection: String,
    pub dimensions: usize,
}

impl QdrantConfig {
    pub const DEFAULT_URL: &'static str = "http://localhost:6334";

    /// Create configuration from environment variables
    ///
    /// `dimensions` comes from the embedding model that fills the collection.
    pub fn from_env(dimensions: usize) -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(dimensions, |name| env::var(name).ok())
    }

    /// Create configuration from any variable source; blank values count as unset
    pub fn from_lookup<F>(dimensions: usize, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let collection = lookup("INDEX_NAME").ok_or_else(|| {
            Error::Configuration("INDEX_NAME environment variable not found".to_string())
        })?;
        let url = lookup("QDRANT_URL").unwrap_or_else(|| Self::DEFAULT_URL.to_string());
        let api_key = lookup("QDRANT_API_KEY");

        Ok(Self {
            url,
            api_key,
            collection,
            dimensions,
        })
    }
}

/// Qdrant vector store backed by a hosted collection
///
/// Every point carries the payload `{"text": ..., "metadata": {"source": ...}}`
/// under a fresh UUID, so re-ingesting a page adds new points and never
/// replaces old ones.
pub struct QdrantVectorStore {
    config: QdrantConfig,
    client: Option<Qdrant>,
}

impl QdrantVectorStore {
    pub fn new(config: QdrantConfig) -> Self {
        Self {
            config,
            client: None,
        }
    }

    pub fn config(&self) -> &QdrantConfig {
        &self.config
    }

    fn client(&self) -> Result<&Qdrant> {
        self.client.as_ref().ok_or_else(|| {
            Error::VectorStore("Not connected. Call connect() first.".to_string())
        })
    }

    fn map_err(e: QdrantError) -> Error {
        Error::VectorStore(format!("qdrant: {}", e))
    }

    fn to_point(record: VectorRecord) -> Result<(String, PointStruct)> {
        let id = Uuid::new_v4().to_string();
        let payload = Payload::try_from(json!({
            "text": record.chunk.text,
            "metadata": { "source": record.chunk.metadata.source },
        }))
        .map_err(Self::map_err)?;

        let point = PointStruct::new(id.clone(), record.embedding, payload);
        Ok((id, point))
    }

    fn extract_string(value: &QdrantValue) -> Option<String> {
        match &value.kind {
            Some(Kind::StringValue(s)) => Some(s.clone()),
            _ => None,
        }
    }

    fn extract_source(value: &QdrantValue) -> Option<String> {
        match &value.kind {
            Some(Kind::StructValue(s)) => s.fields.get("source").and_then(Self::extract_string),
            _ => None,
        }
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn connect(&mut self) -> Result<()> {
        let client = Qdrant::from_url(&self.config.url)
            .api_key(self.config.api_key.clone())
            .build()
            .map_err(Self::map_err)?;

        let collections = client.list_collections().await.map_err(Self::map_err)?;
        let exists = collections
            .collections
            .iter()
            .any(|c| c.name == self.config.collection);

        if exists {
            debug!(collection = %self.config.collection, "qdrant collection already exists");
        } else {
            client
                .create_collection(
                    CreateCollectionBuilder::new(self.config.collection.clone()).vectors_config(
                        VectorParamsBuilder::new(self.config.dimensions as u64, Distance::Cosine),
                    ),
                )
                .await
                .map_err(Self::map_err)?;
            info!(
                collection = %self.config.collection,
                dimensions = self.config.dimensions,
                "created qdrant collection"
            );
        }

        self.client = Some(client);
        Ok(())
    }

    async fn store_batch(&self, records: Vec<VectorRecord>) -> Result<Vec<String>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let client = self.client()?;
        let (ids, points): (Vec<String>, Vec<PointStruct>) = records
            .into_iter()
            .map(Self::to_point)
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .unzip();

        client
            .upsert_points(
                UpsertPointsBuilder::new(self.config.collection.clone(), points).wait(true),
            )
            .await
            .map_err(Self::map_err)?;

        debug!(collection = %self.config.collection, count = ids.len(), "upserted points");
        Ok(ids)
    }

    async fn search_by_vector(
        &self,
        vector: Vec<f32>,
        config: &SearchConfig,
    ) -> Result<Vec<ScoredChunk>> {
        let client = self.client()?;

        let mut request =
            SearchPointsBuilder::new(self.config.collection.clone(), vector, config.top_k as u64)
                .with_payload(true);
        if let Some(threshold) = config.score_threshold {
            request = request.score_threshold(threshold);
        }

        let response = client.search_points(request).await.map_err(Self::map_err)?;

        let results = response
            .result
            .into_iter()
            .map(|scored| {
                let id = scored
                    .id
                    .as_ref()
                    .and_then(|pid| match &pid.point_id_options {
                        Some(PointIdOptions::Uuid(s)) => Some(s.clone()),
                        Some(PointIdOptions::Num(n)) => Some(n.to_string()),
                        None => None,
                    })
                    .unwrap_or_default();

                let text = scored
                    .payload
                    .get("text")
                    .and_then(Self::extract_string)
                    .unwrap_or_default();

                let source = scored
                    .payload
                    .get("metadata")
                    .and_then(Self::extract_source)
                    .unwrap_or_default();

                ScoredChunk {
                    id,
                    chunk: DocumentChunk::new(text, source),
                    score: scored.score,
                }
            })
            .collect();

        Ok(results)
    }

    async fn count(&self) -> Result<usize> {
        let client = self.client()?;
        let response = client
            .count(CountPointsBuilder::new(self.config.collection.clone()).exact(true))
            .await
            .map_err(Self::map_err)?;

        Ok(response.result.map(|r| r.count as usize).unwrap_or(0))
    }

    fn is_connected(&self) -> bool {
        self.client.is_some()
    }
}
