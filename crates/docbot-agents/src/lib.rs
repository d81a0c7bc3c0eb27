//! Agents for DocBot's code interpreter demo
//!
//! A routing agent picks between a Python-writing agent and a CSV
//! question-answering agent. All three are ReAct loops over the same chat
//! model; tools are described to the model by their [`ToolSpec`].

mod tool;
mod parser;
mod python;
mod csv;
mod react;
mod router;


pub use tool::{Tool, ToolSpec, render_tool_descriptions, render_tool_names};
pub use parser::{AgentAction, AgentFinish, ParsedOutput, ReActOutputParser};
pub use python::{PYTHON_REPL_DESCRIPTION, PYTHON_REPL_NAME, PythonReplTool};
pub use csv::{CsvAgentBuilder, HEAD_ROWS, csv_head};
pub use react::{
    AgentOutcome, AgentState, AgentStep, DEFAULT_MAX_ITERATIONS, ITERATION_LIMIT_OUTPUT,
    ReActAgent, render_scratchpad,
};
pub use router::{
    AgentTool, CSV_AGENT_NAME, DEMO_REQUESTS, PYTHON_AGENT_INSTRUCTIONS, PYTHON_AGENT_NAME,
    RouterConfig, csv_agent_spec, python_agent, python_agent_spec, routing_agent,
};

// Re-export core types
pub use docbot_core::{ChatModel, Error, Result};
