//! Question answering over a CSV file

use std::path::{Path, PathBuf};
use std::sync::Arc;

use docbot_core::{ChatModel, Error, Result};

use crate::python::PythonReplTool;
use crate::react::ReActAgent;
use crate::tool::{Tool, ToolSpec};

/// Rows shown to the model, not counting the header
pub const HEAD_ROWS: usize = 5;

const DATAFRAME_TOOL_NAME: &str = "python_repl_ast";
const DATAFRAME_TOOL_DESCRIPTION: &str = "A Python shell. Use this to execute python commands. \
Input should be a valid python command. When using this tool, sometimes output is abbreviated - \
make sure it does not look abbreviated before using it in your answer.";

/// Header plus the first `rows` data lines of a CSV file
pub fn csv_head(path: &Path, rows: usize) -> Result<String> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        Error::Configuration(format!("cannot read CSV file {}: {}", path.display(), e))
    })?;

    Ok(contents
        .lines()
        .take(rows + 1)
        .collect::<Vec<_>>()
        .join("\n"))
}

fn pandas_preamble(path: &Path) -> String {
    let escaped = path.to_string_lossy().replace('\\', "\\\\").replace('"', "\\\"");
    format!("import pandas as pd\ndf = pd.read_csv(\"{}\")", escaped)
}

/// Builds a ReAct agent whose only tool runs Python with `df` already loaded
pub struct CsvAgentBuilder {
    csv_path: PathBuf,
    interpreter: String,
    max_iterations: Option<usize>,
}

impl CsvAgentBuilder {
    pub fn new(csv_path: impl Into<PathBuf>, interpreter: impl Into<String>) -> Self {
        Self {
            csv_path: csv_path.into(),
            interpreter: interpreter.into(),
            max_iterations: None,
        }
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    /// Read the head of the file and assemble the agent
    pub fn build(self, chat: Arc<dyn ChatModel>) -> Result<ReActAgent> {
        let head = csv_head(&self.csv_path, HEAD_ROWS)?;

        let tool = PythonReplTool::new(self.interpreter)?
            .with_spec(ToolSpec::new(DATAFRAME_TOOL_NAME, DATAFRAME_TOOL_DESCRIPTION))
            .with_preamble(pandas_preamble(&self.csv_path));
        let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(tool)];

        let instructions = format!(
            "You are working with a pandas dataframe in Python. The name of the dataframe is `df`.\n\
             Every python command runs with `df` freshly loaded, so print what you need.\n\
             These are the first rows of the CSV file it was read from:\n{}",
            head
        );

        let agent = ReActAgent::new(chat, tools)?.with_instructions(instructions);
        Ok(match self.max_iterations {
            Some(max) => agent.with_max_iterations(max),
            None => agent,
        })
    }
}
