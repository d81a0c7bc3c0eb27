use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::sync::Arc;

use docbot::logging;
use docbot_azure::AzureOpenAiClient;
use docbot_core::EmbeddingModel;
use docbot_rag::{
    BatchProgress, DocumentIndexer, IngestionConfig, IngestionPipeline, IngestionReport,
    QdrantConfig, QdrantVectorStore, VectorStore,
};

/// Takes no arguments; everything comes from the environment
#[derive(Parser)]
#[command(name = "ingest")]
#[command(about = "Index the local documentation tree into the vector index", long_about = None)]
struct Cli {}

fn print_progress(event: &BatchProgress) {
    match event {
        BatchProgress::Started { batch, total } => {
            println!("{}", format!("Processing batch {} of {}", batch, total).blue());
        }
        BatchProgress::Stored { batch, .. } => {
            println!("{} Batch {} processed successfully", "✓".green(), batch);
        }
        BatchProgress::Failed { batch, error } => {
            println!("{} Batch {} failed: {}", "✗".red(), batch, error);
        }
    }
}

fn print_summary(report: &IngestionReport) {
    println!();
    println!("{}", "Ingestion summary".bold());
    println!("  Documents loaded:  {}", report.documents_loaded);
    println!("  Documents failed:  {}", report.documents_failed);
    println!("  Chunks indexed:    {}", report.chunks_indexed);
    println!(
        "  Batches:           {} ({} failed)",
        report.batches_total, report.batches_failed
    );

    for error in &report.errors {
        println!("  {} {}", "•".yellow(), error);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init();
    Cli::parse();

    let config = IngestionConfig::from_env()?;
    let client = Arc::new(AzureOpenAiClient::from_env()?);

    let mut store = QdrantVectorStore::new(QdrantConfig::from_env(client.dimensions())?);
    store
        .connect()
        .await
        .context("failed to connect to the vector index")?;

    let pipeline =
        IngestionPipeline::new(client, Arc::new(store), &config).with_progress(print_progress);

    println!(
        "{} {}",
        "Loading documents from".cyan(),
        config.docs_dir.display()
    );
    let report = pipeline.ingest(&config.docs_dir).await?;
    print_summary(&report);

    if report.batches_failed > 0 {
        println!("{}", "Ingestion finished with failed batches".red());
        std::process::exit(1);
    }

    println!("{}", "****Loading to vectorstore done ***".green());
    Ok(())
}
