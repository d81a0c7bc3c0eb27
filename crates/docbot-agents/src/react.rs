//! ReAct agent loop
//!
//! The agent alternates between asking the chat model what to do next and
//! running the tool it picked. The loop is an explicit state machine:
//!
//! ```text
//! SelectTool -> InvokeTool -> Observe -> SelectTool ... -> Terminate
//! ```
//!
//! Unparsable model output and unknown tool names do not end the run; they
//! are fed back to the model as observations. After `max_iterations` model
//! calls without a final answer the run stops with [`ITERATION_LIMIT_OUTPUT`].

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use docbot_core::{ChatMessage, ChatModel, Error, GenerationConfig, Result};

use crate::parser::{AgentAction, AgentFinish, ParsedOutput, ReActOutputParser};
use crate::tool::{Tool, ToolSpec, render_tool_descriptions, render_tool_names};

pub const DEFAULT_MAX_ITERATIONS: usize = 15;
pub const ITERATION_LIMIT_OUTPUT: &str = "Agent stopped due to iteration limit or time limit.";
const OBSERVATION_STOP: &str = "\nObservation";
const INVALID_TOOL_NAME: &str = "_Exception";

const REACT_TEMPLATE: &str = "{instructions}

TOOLS:
------

You have access to the following tools:

{tools}

To use a tool, please use the following format:

```
Thought: Do I need to use a tool? Yes
Action: the action to take, should be one of [{tool_names}]
Action Input: the input to the action
Observation: the result of the action
```

When you have a response to say to the Human, or if you do not need to use a tool, you MUST use the format:

```
Thought: Do I need to use a tool? No
Final Answer: [your response here]
```

Begin!

New input: {input}
{agent_scratchpad}";

/// One completed tool call and what came back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStep {
    pub action: AgentAction,
    pub observation: String,
}

/// Result of an agent run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentOutcome {
    pub input: String,
    pub output: String,
    pub intermediate_steps: Vec<AgentStep>,
}

/// Where the agent loop is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentState {
    /// Ask the model for the next action
    SelectTool,
    /// Run the tool the model picked
    InvokeTool(AgentAction),
    /// Record a tool result (or a format error) in the scratchpad
    Observe {
        action: AgentAction,
        observation: String,
    },
    /// Done; the final answer or the iteration-limit message
    Terminate(AgentFinish),
}

/// A chat model plus a set of tools, driven through the ReAct format
pub struct ReActAgent {
    chat: Arc<dyn ChatModel>,
    tools: Vec<Arc<dyn Tool>>,
    instructions: String,
    max_iterations: usize,
    parser: ReActOutputParser,
}

impl ReActAgent {
    pub fn new(chat: Arc<dyn ChatModel>, tools: Vec<Arc<dyn Tool>>) -> Result<Self> {
        Ok(Self {
            chat,
            tools,
            instructions: String::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            parser: ReActOutputParser::new()?,
        })
    }

    /// Text placed at the top of the prompt
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn tool_specs(&self) -> Vec<&ToolSpec> {
        self.tools.iter().map(|tool| tool.spec()).collect()
    }

    fn find_tool(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|tool| tool.spec().name == name)
    }

    /// Prompt for the next model call given the steps taken so far
    pub fn render_prompt(&self, input: &str, steps: &[AgentStep]) -> String {
        let specs = self.tool_specs();
        REACT_TEMPLATE
            .replace("{instructions}", &self.instructions)
            .replace("{tools}", &render_tool_descriptions(&specs))
            .replace("{tool_names}", &render_tool_names(&specs))
            .replace("{input}", input)
            .replace("{agent_scratchpad}", &render_scratchpad(steps))
    }

    async fn select_tool(&self, input: &str, steps: &[AgentStep]) -> Result<AgentState> {
        let config = GenerationConfig::default().with_stop_sequences([OBSERVATION_STOP]);
        let messages = vec![ChatMessage::user(self.render_prompt(input, steps))];
        let generation = self.chat.complete_with_config(&messages, &config).await?;

        Ok(match self.parser.parse(&generation.text) {
            ParsedOutput::Action(action) => AgentState::InvokeTool(action),
            ParsedOutput::Finish(finish) => AgentState::Terminate(finish),
            ParsedOutput::Invalid { message, log } => {
                warn!(error = %message, "could not parse agent output");
                AgentState::Observe {
                    action: AgentAction {
                        tool: INVALID_TOOL_NAME.to_string(),
                        tool_input: message.clone(),
                        log,
                    },
                    observation: message,
                }
            }
        })
    }

    async fn invoke_tool(&self, action: AgentAction) -> Result<AgentState> {
        let Some(tool) = self.find_tool(&action.tool) else {
            let names = render_tool_names(&self.tool_specs());
            let observation = format!(
                "{} is not a valid tool, try one of [{}].",
                action.tool, names
            );
            return Ok(AgentState::Observe {
                action,
                observation,
            });
        };

        info!(tool = %action.tool, input = %action.tool_input, "invoking tool");
        let observation = match tool.invoke(&action.tool_input).await {
            Ok(output) => output,
            Err(Error::Tool(message)) => format!("Tool error: {}", message),
            Err(e) => return Err(e),
        };

        Ok(AgentState::Observe {
            action,
            observation,
        })
    }

    /// Run the loop to completion
    pub async fn run(&self, input: &str) -> Result<AgentOutcome> {
        let mut steps: Vec<AgentStep> = Vec::new();
        let mut iterations = 0;
        let mut state = AgentState::SelectTool;

        loop {
            state = match state {
                AgentState::SelectTool => {
                    if iterations >= self.max_iterations {
                        warn!(iterations, "agent hit the iteration limit");
                        AgentState::Terminate(AgentFinish {
                            output: ITERATION_LIMIT_OUTPUT.to_string(),
                            log: String::new(),
                        })
                    } else {
                        iterations += 1;
                        debug!(iteration = iterations, "selecting next action");
                        self.select_tool(input, &steps).await?
                    }
                }
                AgentState::InvokeTool(action) => self.invoke_tool(action).await?,
                AgentState::Observe {
                    action,
                    observation,
                } => {
                    debug!(tool = %action.tool, observation = %observation, "observed");
                    steps.push(AgentStep {
                        action,
                        observation,
                    });
                    AgentState::SelectTool
                }
                AgentState::Terminate(finish) => {
                    info!(steps = steps.len(), "agent finished");
                    return Ok(AgentOutcome {
                        input: input.to_string(),
                        output: finish.output,
                        intermediate_steps: steps,
                    });
                }
            };
        }
    }
}

/// Previous model outputs interleaved with their observations
pub fn render_scratchpad(steps: &[AgentStep]) -> String {
    let mut scratchpad = String::new();
    for step in steps {
        scratchpad.push_str(&step.action.log);
        scratchpad.push_str(&format!("\nObservation: {}\nThought: ", step.observation));
    }
    scratchpad
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(log: &str, observation: &str) -> AgentStep {
        AgentStep {
            action: AgentAction {
                tool: "t".to_string(),
                tool_input: "i".to_string(),
                log: log.to_string(),
            },
            observation: observation.to_string(),
        }
    }

    #[test]
    fn test_scratchpad() {
        assert_eq!(render_scratchpad(&[]), "");
        assert_eq!(
            render_scratchpad(&[step("Action: t\nAction Input: i", "42")]),
            "Action: t\nAction Input: i\nObservation: 42\nThought: "
        );
    }
}
