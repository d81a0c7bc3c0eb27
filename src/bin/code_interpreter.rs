use anyhow::Result;
use clap::Parser;
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;

use docbot::logging;
use docbot_agents::{AgentOutcome, ChatModel, DEMO_REQUESTS, RouterConfig, routing_agent};
use docbot_azure::AzureOpenAiClient;

#[derive(Parser)]
#[command(name = "code-interpreter")]
#[command(about = "Route requests to a Python agent or a CSV agent", long_about = None)]
struct Cli {
    /// CSV file the CSV agent answers questions about
    #[arg(long, default_value = "data/data.csv")]
    csv: PathBuf,

    /// Interpreter used to run generated Python code
    #[arg(long, default_value = "python3")]
    python: String,

    /// Request to route; the two demo requests run when omitted
    request: Option<String>,
}

fn print_outcome(outcome: &AgentOutcome) {
    for step in &outcome.intermediate_steps {
        println!("{}", step.action.log.dimmed());
        println!("{} {}", "Observation:".yellow(), step.observation.trim_end());
    }
    println!("{} {}", "→".green(), outcome.output.bold());
    println!();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init();
    let cli = Cli::parse();

    println!("{}", "Starting the code interpreter...".cyan());

    let chat: Arc<dyn ChatModel> = Arc::new(AzureOpenAiClient::from_env()?);
    let config = RouterConfig {
        csv_path: cli.csv,
        interpreter: cli.python,
        working_dir: None,
    };
    let agent = routing_agent(chat, &config)?;

    let requests: Vec<String> = match cli.request {
        Some(request) => vec![request],
        None => DEMO_REQUESTS.iter().map(|r| r.to_string()).collect(),
    };

    for request in requests {
        println!("{} {}", "Request:".blue().bold(), request);
        let outcome = agent.run(&request).await?;
        print_outcome(&outcome);
    }

    Ok(())
}
