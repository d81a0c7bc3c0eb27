use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use docbot::logging;
use docbot_azure::AzureOpenAiClient;
use docbot_core::EmbeddingModel;
use docbot_rag::{QdrantConfig, QdrantVectorStore, QueryPipeline, VectorStore};
use docbot_web::{AppState, load_stylesheet, run_server};

#[derive(Parser)]
#[command(name = "docbot")]
#[command(about = "Chat with the LangChain documentation", long_about = None)]
struct Cli {
    /// Address to serve the chat UI on
    #[arg(long, default_value = "127.0.0.1:8501")]
    bind: SocketAddr,

    /// Stylesheet inlined into every page, ignored if missing
    #[arg(long, default_value = "custom_theme.css")]
    stylesheet: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init();
    let cli = Cli::parse();

    let client = Arc::new(AzureOpenAiClient::from_env()?);

    let mut store = QdrantVectorStore::new(QdrantConfig::from_env(client.dimensions())?);
    store
        .connect()
        .await
        .context("failed to connect to the vector index")?;
    info!(collection = %store.config().collection, "connected to vector index");

    let pipeline = QueryPipeline::new(client.clone(), client, Arc::new(store));
    let state = AppState::new(Arc::new(pipeline)).with_stylesheet(load_stylesheet(&cli.stylesheet));

    println!(
        "{} DocBot is running at {}",
        "✓".green(),
        format!("http://{}", cli.bind).bold()
    );
    run_server(state, cli.bind)
        .await
        .context("chat server stopped")?;

    Ok(())
}
