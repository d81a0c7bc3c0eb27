//! Azure OpenAI integration for DocBot
//!
//! This crate provides the Azure OpenAI implementation of the `ChatModel` and
//! `EmbeddingModel` traits.

mod client;
mod config;


pub use client::AzureOpenAiClient;
pub use config::AzureOpenAiConfig;

// Re-export core types for convenience
pub use docbot_core::{
    ChatMessage, ChatModel, EmbeddingModel, GenerationConfig, GenerationResult, Error, Result,
};
