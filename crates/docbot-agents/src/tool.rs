//! Tool trait and capability descriptions

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use docbot_core::Result;

/// Name and capability description an agent sees for one tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Something an agent can invoke with a single text input
///
/// `Error::Tool` failures are shown to the agent as observations; any other
/// error ends the agent run.
#[async_trait]
pub trait Tool: Send + Sync {
    fn spec(&self) -> &ToolSpec;

    async fn invoke(&self, input: &str) -> Result<String>;
}

/// `name: description` lines for a prompt
pub fn render_tool_descriptions(specs: &[&ToolSpec]) -> String {
    specs
        .iter()
        .map(|spec| format!("{}: {}", spec.name, spec.description))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Comma-separated tool names for a prompt
pub fn render_tool_names(specs: &[&ToolSpec]) -> String {
    specs
        .iter()
        .map(|spec| spec.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
