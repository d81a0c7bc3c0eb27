//! Parsing ReAct-formatted model output

use regex::Regex;
use serde::{Deserialize, Serialize};

use docbot_core::{Error, Result};

const FINAL_ANSWER_MARKER: &str = "Final Answer:";

pub const MISSING_ACTION_ERROR: &str = "Invalid Format: Missing 'Action:' after 'Thought:'";
pub const MISSING_ACTION_INPUT_ERROR: &str =
    "Invalid Format: Missing 'Action Input:' after 'Action:'";
pub const ACTION_AND_ANSWER_ERROR: &str =
    "Parsing LLM output produced both a final answer and a parse-able action";

/// A tool call the model asked for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentAction {
    pub tool: String,
    pub tool_input: String,
    /// Raw model text that produced the action
    pub log: String,
}

/// The model's final answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentFinish {
    pub output: String,
    pub log: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedOutput {
    Action(AgentAction),
    Finish(AgentFinish),
    /// Output that follows neither format; `message` is fed back as an observation
    Invalid { message: String, log: String },
}

/// Reads `Action:`/`Action Input:` pairs and `Final Answer:` lines
#[derive(Debug, Clone)]
pub struct ReActOutputParser {
    action: Regex,
    action_line: Regex,
}

impl ReActOutputParser {
    pub fn new() -> Result<Self> {
        let action =
            Regex::new(r"(?s)Action\s*\d*\s*:[\s]*(.*?)[\s]*Action\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)")
                .map_err(|e| Error::Agent(format!("invalid action pattern: {}", e)))?;
        let action_line = Regex::new(r"Action\s*\d*\s*:")
            .map_err(|e| Error::Agent(format!("invalid action pattern: {}", e)))?;
        Ok(Self {
            action,
            action_line,
        })
    }

    /// Parse one completion into an action, a final answer or a format error
    pub fn parse(&self, text: &str) -> ParsedOutput {
        let includes_answer = text.contains(FINAL_ANSWER_MARKER);

        if let Some(captures) = self.action.captures(text) {
            if includes_answer {
                return ParsedOutput::Invalid {
                    message: format!("{}: {}", ACTION_AND_ANSWER_ERROR, text),
                    log: text.to_string(),
                };
            }

            let tool = captures[1].trim().to_string();
            let tool_input = captures[2].trim_matches(' ').trim_matches('"').to_string();
            return ParsedOutput::Action(AgentAction {
                tool,
                tool_input,
                log: text.to_string(),
            });
        }

        if includes_answer {
            let output = text
                .rsplit(FINAL_ANSWER_MARKER)
                .next()
                .unwrap_or_default()
                .trim()
                .to_string();
            return ParsedOutput::Finish(AgentFinish {
                output,
                log: text.to_string(),
            });
        }

        let message = if self.action_line.is_match(text) {
            MISSING_ACTION_INPUT_ERROR
        } else {
            MISSING_ACTION_ERROR
        };
        ParsedOutput::Invalid {
            message: message.to_string(),
            log: text.to_string(),
        }
    }
}
