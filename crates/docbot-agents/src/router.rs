//! Routing agent over the Python and CSV agents

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use docbot_core::{ChatModel, Result};

use crate::csv::CsvAgentBuilder;
use crate::python::PythonReplTool;
use crate::react::ReActAgent;
use crate::tool::{Tool, ToolSpec};

pub const PYTHON_AGENT_INSTRUCTIONS: &str = "You are an agent designed to write and execute python code to answer questions.
You have access to a python REPL, which you can use to execute python code.
If you get an error, debug your code and try again.
Only use the output of your code to answer the question.
You might know the answer without running any code, but you should still run the code to get the answer.
If it does not seem like you can write code to answer the question, just return \"I don't know\" as the answer.";

pub const PYTHON_AGENT_NAME: &str = "Python Agent";
pub const CSV_AGENT_NAME: &str = "CSV Agent";

/// Requests the demo runs when none is given
pub const DEMO_REQUESTS: [&str; 2] = [
    "what is the average price of the products?",
    "Generate and save in current working directory 15 qrcodes that point to `www.udemy.com/course/langchain`",
];

/// Exposes a whole agent as a tool of another agent
pub struct AgentTool {
    spec: ToolSpec,
    agent: ReActAgent,
}

impl AgentTool {
    pub fn new(spec: ToolSpec, agent: ReActAgent) -> Self {
        Self { spec, agent }
    }
}

#[async_trait]
impl Tool for AgentTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn invoke(&self, input: &str) -> Result<String> {
        let outcome = self.agent.run(input).await?;
        Ok(outcome.output)
    }
}

pub fn python_agent_spec() -> ToolSpec {
    ToolSpec::new(
        PYTHON_AGENT_NAME,
        "useful when you need to transform natural language to python and execute the python code, \
         returning the results of the code execution \
         DOES NOT ACCEPT CODE AS INPUT",
    )
}

pub fn csv_agent_spec(csv_path: &Path) -> ToolSpec {
    let file_name = csv_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| csv_path.display().to_string());

    ToolSpec::new(
        CSV_AGENT_NAME,
        format!(
            "useful when you need to answer question over {} file, \
             takes an input the entire question and returns the answer after running pandas calculations",
            file_name
        ),
    )
}

/// Where the routed agents run code and find their data
#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub csv_path: PathBuf,
    pub interpreter: String,
    pub working_dir: Option<PathBuf>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from("data/data.csv"),
            interpreter: "python3".to_string(),
            working_dir: None,
        }
    }
}

/// A ReAct agent with a single Python REPL tool
pub fn python_agent(chat: Arc<dyn ChatModel>, config: &RouterConfig) -> Result<ReActAgent> {
    let mut repl = PythonReplTool::new(config.interpreter.clone())?;
    if let Some(dir) = &config.working_dir {
        repl = repl.with_working_dir(dir);
    }

    let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(repl)];
    Ok(ReActAgent::new(chat, tools)?.with_instructions(PYTHON_AGENT_INSTRUCTIONS))
}

/// The top-level agent choosing between the Python agent and the CSV agent
pub fn routing_agent(chat: Arc<dyn ChatModel>, config: &RouterConfig) -> Result<ReActAgent> {
    let python = python_agent(chat.clone(), config)?;
    let csv = CsvAgentBuilder::new(&config.csv_path, config.interpreter.clone()).build(chat.clone())?;

    let tools: Vec<Arc<dyn Tool>> = vec![
        Arc::new(AgentTool::new(python_agent_spec(), python)),
        Arc::new(AgentTool::new(csv_agent_spec(&config.csv_path), csv)),
    ];
    ReActAgent::new(chat, tools)
}
