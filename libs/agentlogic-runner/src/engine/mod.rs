//! Execution Engine - Abstraction for Code Execution
//!
//! **Core Responsibility:**
//! Execute submitted source with one test case's inputs and capture the raw
//! outcome.
//!
//! **Critical Architectural Boundary:**
//! - Engine knows HOW to execute (embedded sandbox or child process)
//! - Engine does NOT evaluate correctness
//! - Engine returns raw outcomes for the evaluator to judge
//!
//! Each backend builds a fresh execution context per test case and drops it
//! afterwards. Nothing is pooled or reused between cases.

mod process;
mod sandbox;

pub use process::ProcessEngine;
pub use sandbox::SandboxEngine;

use crate::config::LanguageConfig;
use crate::evaluator::{ExecutionOutcome, TestExecutionOutput};
use agentlogic_common::{Backend, Language, TestCase};
use anyhow::Result;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, warn};

/// Backend selected by the submission's language
#[derive(Debug, Clone)]
pub enum ExecutionEngine {
    Sandbox(SandboxEngine),
    Process(ProcessEngine),
}

impl ExecutionEngine {
    pub fn for_language(language: Language, config: &LanguageConfig) -> Result<Self> {
        match language.backend() {
            Backend::Sandbox => Ok(Self::Sandbox(SandboxEngine::from_config(config))),
            Backend::Process => Ok(Self::Process(ProcessEngine::from_config(config)?)),
        }
    }

    pub fn backend(&self) -> Backend {
        match self {
            Self::Sandbox(_) => Backend::Sandbox,
            Self::Process(_) => Backend::Process,
        }
    }

    pub fn timeout_ms(&self) -> u64 {
        match self {
            Self::Sandbox(engine) => engine.timeout_ms(),
            Self::Process(engine) => engine.timeout_ms(),
        }
    }

    /// Run `function_name(*input)` against `source` once.
    ///
    /// `Err` means the execution context itself could not be set up; problems
    /// caused by the submission are reported through the outcome.
    pub async fn execute(
        &self,
        source: &str,
        function_name: &str,
        input: &[Value],
    ) -> Result<TestExecutionOutput> {
        match self {
            Self::Sandbox(engine) => engine.execute(source, function_name, input).await,
            Self::Process(engine) => engine.execute(source, function_name, input).await,
        }
    }
}

/// Execute every test case in order, one at a time.
///
/// A failure in one case never stops the loop: infrastructure errors are
/// folded into a runtime-error outcome for that case, so the returned vector
/// always has exactly one output per test case, in input order.
pub async fn execute_test_cases(
    engine: &ExecutionEngine,
    source: &str,
    function_name: &str,
    test_cases: &[TestCase],
) -> Vec<TestExecutionOutput> {
    let mut outputs = Vec::with_capacity(test_cases.len());

    for (idx, test_case) in test_cases.iter().enumerate() {
        let start = Instant::now();
        let output = match engine.execute(source, function_name, &test_case.input).await {
            Ok(output) => output,
            Err(e) => {
                warn!(test_num = idx + 1, error = %e, "Execution backend failed");
                TestExecutionOutput::new(
                    ExecutionOutcome::RuntimeError(format!("Execution failed: {:#}", e)),
                    start.elapsed().as_millis() as u64,
                )
            }
        };

        debug!(
            test_num = idx + 1,
            outcome = ?output.outcome,
            execution_ms = output.execution_time_ms,
            "Test case executed"
        );
        outputs.push(output);
    }

    outputs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LanguageConfigManager, LanguageExecution};
    use serde_json::json;

    fn cases(inputs: &[Value]) -> Vec<TestCase> {
        inputs
            .iter()
            .map(|input| serde_json::from_value(json!({ "input": input })).unwrap())
            .collect()
    }

    #[test]
    fn test_engine_selection() {
        let manager = LanguageConfigManager::builtin();
        let js = ExecutionEngine::for_language(
            Language::JavaScript,
            manager.get_config(&Language::JavaScript).unwrap(),
        )
        .unwrap();
        assert_eq!(js.backend(), Backend::Sandbox);

        let py = ExecutionEngine::for_language(
            Language::Python,
            manager.get_config(&Language::Python).unwrap(),
        )
        .unwrap();
        assert_eq!(py.backend(), Backend::Process);
        assert_eq!(py.timeout_ms(), 5000);
    }

    #[tokio::test]
    async fn test_one_output_per_case_in_order() {
        let manager = LanguageConfigManager::builtin();
        let engine = ExecutionEngine::for_language(
            Language::JavaScript,
            manager.get_config(&Language::JavaScript).unwrap(),
        )
        .unwrap();
        let source = "function check(n) { if (n === 2) { throw new Error('two'); } return n * 10; }";

        let outputs =
            execute_test_cases(&engine, source, "check", &cases(&[json!([1]), json!([2]), json!([3])]))
                .await;

        assert_eq!(outputs.len(), 3);
        assert_eq!(outputs[0].outcome, ExecutionOutcome::Returned(json!(10)));
        assert!(matches!(outputs[1].outcome, ExecutionOutcome::RuntimeError(_)));
        assert_eq!(outputs[2].outcome, ExecutionOutcome::Returned(json!(30)));
    }

    #[tokio::test]
    async fn test_missing_interpreter_fails_every_case() {
        let config = LanguageConfig {
            name: "python".to_string(),
            execution: Some(LanguageExecution {
                command: "/nonexistent/bin/python-agentlogic".to_string(),
                args: vec![],
            }),
            timeout_ms: 1000,
            memory_limit_mb: 64,
            default_function_name: "solution".to_string(),
        };
        let engine = ExecutionEngine::for_language(Language::Python, &config).unwrap();

        let outputs = execute_test_cases(
            &engine,
            "def f(x):\n    return x\n",
            "f",
            &cases(&[json!([1]), json!([2])]),
        )
        .await;

        assert_eq!(outputs.len(), 2);
        for output in outputs {
            match output.outcome {
                ExecutionOutcome::RuntimeError(message) => {
                    assert!(message.contains("Execution failed"), "{}", message)
                }
                other => panic!("unexpected outcome: {:?}", other),
            }
        }
    }
}
