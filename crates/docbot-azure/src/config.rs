//! Azure OpenAI configuration

use serde::{Deserialize, Serialize};
use std::env;
use docbot_core::{Error, Result};

/// Configuration for the Azure OpenAI chat and embedding clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureOpenAiConfig {
    pub endpoint: String,
    pub api_key: String,
    pub api_version: String,
    pub chat_deployment: String,
    pub embedding_deployment: String,
    pub embedding_api_version: String,
    /// Requested vector size; `None` keeps the deployment's native size
    pub embedding_dimensions: Option<usize>,
}

impl AzureOpenAiConfig {
    pub const DEFAULT_EMBEDDING_DEPLOYMENT: &'static str = "text-embedding-3-small";
    pub const DEFAULT_EMBEDDING_API_VERSION: &'static str = "2024-12-01-preview";
    pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;

    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Create configuration from any variable source
    ///
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let endpoint = required(&lookup, "AZURE_OPENAI_ENDPOINT")?;
        let api_key = required(&lookup, "AZURE_OPENAI_API_KEY")?;
        let api_version = required(&lookup, "AZURE_OPENAI_API_VERSION")?;
        let chat_deployment = required(&lookup, "AZURE_OPENAI_MODEL")?;

        let embedding_deployment = lookup("AZURE_OPENAI_EMBEDDING_DEPLOYMENT")
            .unwrap_or_else(|| Self::DEFAULT_EMBEDDING_DEPLOYMENT.to_string());

        let embedding_api_version = lookup("AZURE_OPENAI_EMBEDDING_API_VERSION")
            .unwrap_or_else(|| Self::DEFAULT_EMBEDDING_API_VERSION.to_string());

        let embedding_dimensions = lookup("AZURE_OPENAI_EMBEDDING_DIMENSIONS")
            .map(|raw| match raw.trim().parse::<usize>() {
                Ok(dimensions) if dimensions > 0 => Ok(dimensions),
                _ => Err(Error::Configuration(format!(
                    "AZURE_OPENAI_EMBEDDING_DIMENSIONS must be a positive integer, got '{}'",
                    raw
                ))),
            })
            .transpose()?;

        Ok(Self {
            endpoint,
            api_key,
            api_version,
            chat_deployment,
            embedding_deployment,
            embedding_api_version,
            embedding_dimensions,
        })
    }

    /// Create configuration with explicit values
    pub fn new(
        endpoint: String,
        api_key: String,
        api_version: String,
        chat_deployment: String,
    ) -> Self {
        Self {
            endpoint,
            api_key,
            api_version,
            chat_deployment,
            embedding_deployment: Self::DEFAULT_EMBEDDING_DEPLOYMENT.to_string(),
            embedding_api_version: Self::DEFAULT_EMBEDDING_API_VERSION.to_string(),
            embedding_dimensions: None,
        }
    }

    pub fn with_embedding_dimensions(mut self, dimensions: usize) -> Self {
        self.embedding_dimensions = Some(dimensions);
        self
    }

    /// Length of every vector the embedding deployment returns
    pub fn dimensions(&self) -> usize {
        self.embedding_dimensions
            .unwrap_or(Self::DEFAULT_EMBEDDING_DIMENSIONS)
    }

    /// Chat completions URL for the configured deployment
    pub fn chat_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.chat_deployment,
            self.api_version
        )
    }

    /// Embeddings URL for the configured embedding deployment
    pub fn embeddings_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/embeddings?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.embedding_deployment,
            self.embedding_api_version
        )
    }
}

fn required(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Result<String> {
    lookup(name).ok_or_else(|| {
        Error::Configuration(format!("{} environment variable not found", name))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    const REQUIRED: [(&str, &str); 4] = [
        ("AZURE_OPENAI_ENDPOINT", "https://docbot.openai.azure.com"),
        ("AZURE_OPENAI_API_KEY", "key"),
        ("AZURE_OPENAI_API_VERSION", "2024-08-01-preview"),
        ("AZURE_OPENAI_MODEL", "gpt-4o"),
    ];

    #[test]
    fn test_from_lookup_defaults() {
        let config = AzureOpenAiConfig::from_lookup(vars(&REQUIRED)).unwrap();
        assert_eq!(config.chat_deployment, "gpt-4o");
        assert_eq!(config.embedding_deployment, "text-embedding-3-small");
        assert_eq!(config.embedding_dimensions, None);
        assert_eq!(config.dimensions(), 1536);
    }

    #[test]
    fn test_missing_required_variable_fails() {
        let result = AzureOpenAiConfig::from_lookup(vars(&REQUIRED[..3]));
        match result {
            Err(Error::Configuration(message)) => assert!(message.contains("AZURE_OPENAI_MODEL")),
            other => panic!("expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_required_variable_fails() {
        let mut pairs = REQUIRED.to_vec();
        pairs[1] = ("AZURE_OPENAI_API_KEY", "   ");
        assert!(matches!(
            AzureOpenAiConfig::from_lookup(vars(&pairs)),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_required_reads_process_environment() {
        let from_env = |name: &str| env::var(name).ok();
        assert!(matches!(
            required(from_env, "DOCBOT_TEST_VARIABLE_THAT_IS_NEVER_SET_7F3A"),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_embedding_dimensions_override() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("AZURE_OPENAI_EMBEDDING_DIMENSIONS", "512"));
        let config = AzureOpenAiConfig::from_lookup(vars(&pairs)).unwrap();
        assert_eq!(config.embedding_dimensions, Some(512));
        assert_eq!(config.dimensions(), 512);

        pairs.pop();
        pairs.push(("AZURE_OPENAI_EMBEDDING_DIMENSIONS", "0"));
        assert!(matches!(
            AzureOpenAiConfig::from_lookup(vars(&pairs)),
            Err(Error::Configuration(_))
        ));
    }

    fn config() -> AzureOpenAiConfig {
        AzureOpenAiConfig::new(
            "https://docbot.openai.azure.com/".to_string(),
            "key".to_string(),
            "2024-08-01-preview".to_string(),
            "gpt-4o".to_string(),
        )
    }

    #[test]
    fn test_chat_url() {
        assert_eq!(
            config().chat_url(),
            "https://docbot.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2024-08-01-preview"
        );
    }

    #[test]
    fn test_embeddings_url_uses_embedding_version() {
        assert_eq!(
            config().embeddings_url(),
            "https://docbot.openai.azure.com/openai/deployments/text-embedding-3-small/embeddings?api-version=2024-12-01-preview"
        );
    }
}
