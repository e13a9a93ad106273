//! Execution of generated shell pipelines.

use std::process::{Command, Stdio};

use crate::util::shell::redact;

/// Outcome of running one pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Whether any stage of the pipeline exited unsuccessfully.
    pub failed: bool,
    /// Combined stdout and stderr, if anything was printed.
    pub output: Option<String>,
}

impl ExecutionResult {
    pub fn success(output: Option<String>) -> Self {
        Self {
            failed: false,
            output,
        }
    }

    pub fn failure(output: Option<String>) -> Self {
        Self {
            failed: true,
            output,
        }
    }

    /// Diagnostic output of a failed pipeline.
    pub fn failure_output(&self) -> Option<&str> {
        if self.failed {
            Some(self.output.as_deref().unwrap_or_default())
        } else {
            None
        }
    }
}

/// Runs a shell pipeline to completion.
pub trait Execute {
    /// Run `command` on behalf of `job`.
    fn execute(&mut self, job: &str, command: &str) -> ExecutionResult;
}

/// Runs pipelines with `<shell> -c`, failing if any stage of a pipe fails.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    shell: String,
}

impl ShellExecutor {
    /// The shell has to support `set -o pipefail`.
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new("/bin/bash")
    }
}

impl Execute for ShellExecutor {
    fn execute(&mut self, job: &str, command: &str) -> ExecutionResult {
        log::debug!(target: "executor", "[{job}] Running: {}", redact(command));

        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(format!("set -o pipefail; {command}"))
            .stdin(Stdio::null())
            .output();

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                log::error!(target: "executor", "[{job}] Failed to run {}: {e}", self.shell);
                return ExecutionResult::failure(Some(e.to_string()));
            }
        };

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        let text = text.trim_end();
        let text = (!text.is_empty()).then(|| text.to_string());

        if output.status.success() {
            if let Some(text) = &text {
                log::debug!(target: "executor", "[{job}] {text}");
            }
            ExecutionResult::success(text)
        } else {
            log::error!(
                target: "executor",
                "[{job}] Command failed ({}): {}",
                output.status,
                redact(command)
            );
            if let Some(text) = &text {
                log::error!(target: "executor", "[{job}] {text}");
            }
            ExecutionResult::failure(text)
        }
    }
}
