use crate::config::LanguageConfig;
use crate::evaluator::{decode_output, ExecutionOutcome, TestExecutionOutput};
use anyhow::{Context, Result};
use serde_json::Value;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Process-based execution engine.
///
/// **Execution Rules:**
/// 1. Builds a driver script: submission + call of the entry point
/// 2. Spawns a fresh interpreter per test case, driver fed through stdin
/// 3. Environment cleared except `PATH`
/// 4. Hard wall-clock timeout; the child is killed when it fires
/// 5. stdout carries the JSON result, stderr a JSON `{"error": ...}` line
///
/// No resource limits beyond the timeout are applied to the child.
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    command: String,
    args: Vec<String>,
    timeout_ms: u64,
}

impl ProcessEngine {
    pub fn new(command: impl Into<String>, args: Vec<String>, timeout_ms: u64) -> Self {
        Self {
            command: command.into(),
            args,
            timeout_ms,
        }
    }

    pub fn from_config(config: &LanguageConfig) -> Result<Self> {
        let execution = config
            .execution
            .as_ref()
            .with_context(|| format!("No interpreter command configured for {}", config.name))?;
        Ok(Self::new(
            execution.command.clone(),
            execution.args.clone(),
            config.timeout_ms,
        ))
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    pub async fn execute(
        &self,
        source: &str,
        function_name: &str,
        input: &[Value],
    ) -> Result<TestExecutionOutput> {
        let driver = build_python_driver(source, function_name, input)?;

        let path_env = std::env::var("PATH")
            .unwrap_or_else(|_| "/usr/local/bin:/usr/bin:/bin".to_string());

        let start = Instant::now();
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .env_clear()
            .env("PATH", &path_env)
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn interpreter '{}'", self.command))?;

        let stdin = child.stdin.take();
        let run = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(driver.as_bytes()).await?;
                stdin.shutdown().await?;
            }
            child.wait_with_output().await
        };

        // On timeout the future is dropped along with the child, and
        // kill_on_drop sends SIGKILL
        let result = tokio::time::timeout(Duration::from_millis(self.timeout_ms), run).await;
        let execution_time_ms = start.elapsed().as_millis() as u64;

        let outcome = match result {
            Err(_) => {
                warn!(timeout_ms = self.timeout_ms, "Process timed out, killed");
                ExecutionOutcome::TimedOut {
                    timeout_ms: self.timeout_ms,
                }
            }
            Ok(Err(e)) => ExecutionOutcome::RuntimeError(format!("Process error: {}", e)),
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr);
                debug!(
                    exit_code = ?output.status.code(),
                    stdout_bytes = output.stdout.len(),
                    stderr_bytes = output.stderr.len(),
                    "Process exited"
                );

                if output.status.success() {
                    decode_output(&stdout)
                } else {
                    ExecutionOutcome::RuntimeError(error_from_stderr(&stderr, output.status.code()))
                }
            }
        };

        Ok(TestExecutionOutput::new(outcome, execution_time_ms))
    }
}

/// Append the call harness to the submission.
///
/// Inputs travel as a JSON document embedded in a string literal, so no value
/// is ever spliced into the program as code.
fn build_python_driver(source: &str, function_name: &str, input: &[Value]) -> Result<String> {
    let args_json = serde_json::to_string(input).context("Failed to encode test input")?;
    // A JSON string literal is also a valid Python string literal
    let args_literal = serde_json::to_string(&args_json).context("Failed to encode test input")?;

    Ok(format!(
        r#"{source}

import json as __agentlogic_json
import sys as __agentlogic_sys

try:
    __agentlogic_args = __agentlogic_json.loads({args_literal})
    __agentlogic_result = {function_name}(*__agentlogic_args)
    __agentlogic_out = __agentlogic_json.dumps(__agentlogic_result)
except Exception as __agentlogic_exc:
    __agentlogic_sys.stderr.write(__agentlogic_json.dumps({{"error": str(__agentlogic_exc)}}) + "\n")
    __agentlogic_sys.exit(1)

print(__agentlogic_out)
"#
    ))
}

/// Prefer the driver's JSON error line, then raw stderr, then the exit code
fn error_from_stderr(stderr: &str, code: Option<i32>) -> String {
    let from_driver = stderr
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .and_then(|line| serde_json::from_str::<Value>(line.trim()).ok())
        .and_then(|value| value.get("error").and_then(Value::as_str).map(str::to_string));

    if let Some(message) = from_driver {
        return message;
    }

    let trimmed = stderr.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }

    match code {
        Some(code) => format!("Process exited with status {}", code),
        None => "Process terminated by signal".to_string(),
    }
}
