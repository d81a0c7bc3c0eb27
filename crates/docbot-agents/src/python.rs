//! Python execution tool

use async_trait::async_trait;
use regex::Regex;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use docbot_core::{Error, Result};

use crate::tool::{Tool, ToolSpec};

pub const PYTHON_REPL_NAME: &str = "Python_REPL";
pub const PYTHON_REPL_DESCRIPTION: &str = "A Python shell. Use this to execute python commands. \
Input should be a valid python command. If you want to see the output of a value, you should \
print it out with `print(...)`.";

/// Runs code with an external interpreter and reports what it printed
///
/// Each invocation is a fresh process (`<interpreter> -c <code>`), with an
/// optional preamble prepended to the code. Successful runs return stdout;
/// failed runs return stderr so the agent can debug its code.
pub struct PythonReplTool {
    spec: ToolSpec,
    interpreter: String,
    preamble: Option<String>,
    working_dir: Option<PathBuf>,
    timeout: Duration,
    leading: Regex,
    trailing: Regex,
}

impl PythonReplTool {
    pub fn new(interpreter: impl Into<String>) -> Result<Self> {
        let leading = Regex::new(r"^(\s|`)*(?i:python)?\s*")
            .map_err(|e| Error::Tool(format!("invalid sanitizer pattern: {}", e)))?;
        let trailing = Regex::new(r"(\s|`)*$")
            .map_err(|e| Error::Tool(format!("invalid sanitizer pattern: {}", e)))?;

        Ok(Self {
            spec: ToolSpec::new(PYTHON_REPL_NAME, PYTHON_REPL_DESCRIPTION),
            interpreter: interpreter.into(),
            preamble: None,
            working_dir: None,
            timeout: Duration::from_secs(60),
            leading,
            trailing,
        })
    }

    pub fn with_spec(mut self, spec: ToolSpec) -> Self {
        self.spec = spec;
        self
    }

    /// Code run before every input, e.g. loading a dataframe
    pub fn with_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = Some(preamble.into());
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Strip surrounding whitespace, backticks and a leading `python` tag
    pub fn sanitize_input(&self, input: &str) -> String {
        let without_leading = self.leading.replace(input, "");
        self.trailing.replace(&without_leading, "").into_owned()
    }

    async fn execute(&self, code: &str) -> Result<String> {
        let program = match &self.preamble {
            Some(preamble) => format!("{}\n{}", preamble, code),
            None => code.to_string(),
        };

        let mut command = Command::new(&self.interpreter);
        command
            .arg("-c")
            .arg(&program)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let output = command.output();
        let output = match timeout(self.timeout, output).await {
            Ok(result) => result.map_err(|e| {
                Error::Tool(format!("failed to start '{}': {}", self.interpreter, e))
            })?,
            Err(_) => {
                return Err(Error::Tool(format!(
                    "execution timed out after {}s",
                    self.timeout.as_secs()
                )));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() {
            Ok(stdout)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!(status = %output.status, "python execution failed");
            Ok(format!("{}{}", stdout, stderr.trim_end()))
        }
    }
}

#[async_trait]
impl Tool for PythonReplTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn invoke(&self, input: &str) -> Result<String> {
        let code = self.sanitize_input(input);
        debug!(bytes = code.len(), "running python");
        self.execute(&code).await
    }
}
