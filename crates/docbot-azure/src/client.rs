//! Azure OpenAI client implementation

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

use docbot_core::{
    ChatMessage, ChatModel, EmbeddingModel, Error, GenerationConfig, GenerationResult, Result,
};

use crate::config::AzureOpenAiConfig;

/// Azure OpenAI client serving both chat completions and embeddings
pub struct AzureOpenAiClient {
    config: AzureOpenAiConfig,
    client: Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a [String]>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: u32,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

impl AzureOpenAiClient {
    /// Create a new Azure OpenAI client from configuration
    pub fn new(config: AzureOpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self { config, client })
    }

    /// Create a new Azure OpenAI client from environment variables
    pub fn from_env() -> Result<Self> {
        let config = AzureOpenAiConfig::from_env()?;
        Self::new(config)
    }

    pub fn config(&self) -> &AzureOpenAiConfig {
        &self.config
    }

    /// POST a JSON body and decode the JSON reply
    async fn post_json<B, T>(&self, url: &str, body: &B, service: fn(String) -> Error) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .header("api-key", &self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(classify_failure(status, error_text, service));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    async fn perform_completion(
        &self,
        messages: &[ChatMessage],
        config: &GenerationConfig,
    ) -> Result<GenerationResult> {
        let request_body = ChatRequest {
            messages,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            stop: (!config.stop_sequences.is_empty()).then_some(config.stop_sequences.as_slice()),
        };

        debug!(
            deployment = %self.config.chat_deployment,
            messages = messages.len(),
            "sending chat completion"
        );

        let parsed: ChatResponse = self
            .post_json(&self.config.chat_url(), &request_body, Error::ChatModel)
            .await?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::ChatModel("Empty response from Azure OpenAI".to_string()))?;

        Ok(GenerationResult {
            text,
            model_id: self.config.chat_deployment.clone(),
            tokens_used: parsed.usage.map(|usage| usage.total_tokens),
        })
    }
}

fn classify_failure(status: StatusCode, body: String, service: fn(String) -> Error) -> Error {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Authentication(format!(
            "Azure OpenAI rejected the API key ({}): {}",
            status, body
        )),
        _ => service(format!(
            "Azure OpenAI request failed with status {}: {}",
            status, body
        )),
    }
}

fn check_dimensions(vectors: &[Vec<f32>], expected: usize) -> Result<()> {
    match vectors.iter().find(|vector| vector.len() != expected) {
        Some(vector) => Err(Error::Embedding(format!(
            "Azure OpenAI returned a {}-dimensional embedding, expected {}",
            vector.len(),
            expected
        ))),
        None => Ok(()),
    }
}

#[async_trait]
impl ChatModel for AzureOpenAiClient {
    async fn complete_with_config(
        &self,
        messages: &[ChatMessage],
        config: &GenerationConfig,
    ) -> Result<GenerationResult> {
        let completion = self.perform_completion(messages, config);

        match timeout(config.timeout, completion).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout("Chat completion timed out".to_string())),
        }
    }

    fn model_id(&self) -> &str {
        &self.config.chat_deployment
    }
}

#[async_trait]
impl EmbeddingModel for AzureOpenAiClient {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            deployment = %self.config.embedding_deployment,
            inputs = texts.len(),
            "requesting embeddings"
        );

        let request_body = EmbeddingRequest {
            input: texts,
            dimensions: self.config.embedding_dimensions,
        };
        let mut parsed: EmbeddingResponse = self
            .post_json(&self.config.embeddings_url(), &request_body, Error::Embedding)
            .await?;

        parsed.data.sort_by_key(|entry| entry.index);
        if parsed.data.len() != texts.len() {
            return Err(Error::Embedding(format!(
                "Azure OpenAI returned {} embeddings for {} inputs",
                parsed.data.len(),
                texts.len()
            )));
        }

        let vectors: Vec<Vec<f32>> = parsed.data.into_iter().map(|entry| entry.embedding).collect();
        check_dimensions(&vectors, self.dimensions())?;
        Ok(vectors)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_documents(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| Error::Embedding("No embedding returned for query".to_string()))
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions()
    }
}
