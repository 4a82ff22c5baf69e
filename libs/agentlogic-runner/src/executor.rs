//! Batch Executor - High-Level Orchestration
//!
//! **Responsibility:**
//! Coordinate an execution engine and the evaluator to produce the final
//! response for one submission.
//!
//! **Architecture:**
//! 1. Resolve the entry point (explicit name, detected name, default)
//! 2. Run each test case through the language's engine (engine/)
//! 3. Compare outputs against expectations (evaluator.rs)
//!
//! This module is the glue layer - it knows nothing about:
//! - How code executes (engine's job)
//! - How values are compared (evaluator's job)

use crate::config::LanguageConfigManager;
use crate::engine::{execute_test_cases, ExecutionEngine};
use crate::entrypoint::resolve_function_name;
use crate::evaluator;
use agentlogic_common::{RunRequest, RunResponse};
use anyhow::Result;
use std::time::Instant;
use tracing::{info, instrument};
use uuid::Uuid;

/// Execute a validated batch.
///
/// Test cases run strictly one after another in input order. `Err` is
/// reserved for failures of the orchestration itself; anything that goes
/// wrong inside a single test case is part of the returned results.
#[instrument(
    skip(request, config_manager),
    fields(run_id = %Uuid::new_v4(), language = %request.language, test_cases = request.test_cases.len())
)]
pub async fn execute_batch(
    request: &RunRequest,
    config_manager: &LanguageConfigManager,
) -> Result<RunResponse> {
    let config = config_manager.get_config(&request.language)?;
    let engine = ExecutionEngine::for_language(request.language, config)?;

    let function_name = resolve_function_name(
        request.language,
        &request.code,
        request.function_name.as_deref(),
        &config.default_function_name,
    );

    info!(
        backend = %engine.backend(),
        function = %function_name,
        timeout_ms = engine.timeout_ms(),
        source_size = request.code.len(),
        "Starting batch"
    );

    let start = Instant::now();
    let outputs =
        execute_test_cases(&engine, &request.code, &function_name, &request.test_cases).await;
    let response = evaluator::evaluate(&request.test_cases, &outputs);

    info!(
        passed = response.summary.passed,
        failed = response.summary.failed,
        execution_ms = start.elapsed().as_millis() as u64,
        "Batch completed"
    );

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentlogic_common::{Language, TestCase, TestStatus};
    use serde_json::{json, Value};

    fn request(language: Language, code: &str, cases: Value) -> RunRequest {
        RunRequest {
            code: code.to_string(),
            test_cases: serde_json::from_value::<Vec<TestCase>>(cases).unwrap(),
            language,
            function_name: None,
        }
    }

    #[tokio::test]
    async fn test_javascript_add_passes() {
        let req = request(
            Language::JavaScript,
            "function add(a,b){return a+b;}",
            json!([{ "input": [2, 3], "expectedOutput": 5 }]),
        );

        let response = execute_batch(&req, &LanguageConfigManager::builtin()).await.unwrap();

        assert!(response.success);
        assert_eq!(response.results.len(), 1);
        let result = &response.results[0];
        assert!(result.passed);
        assert_eq!(result.actual_output, Some(json!(5)));
        assert_eq!(result.error, None);
        assert_eq!(response.summary.total, 1);
        assert_eq!(response.summary.passed, 1);
        assert_eq!(response.summary.failed, 0);
        assert!(response.summary.all_passed);
    }

    #[tokio::test]
    async fn test_order_and_summary_with_failures() {
        let req = request(
            Language::JavaScript,
            "const half = (n) => { if (n < 0) throw new Error('negative'); return n / 2; };",
            json!([
                { "input": [4], "expectedOutput": 2 },
                { "input": [-1], "expectedOutput": 0 },
                { "input": [3], "expectedOutput": 1 },
                { "input": [10], "expectedOutput": 5 }
            ]),
        );

        let response = execute_batch(&req, &LanguageConfigManager::builtin()).await.unwrap();

        assert_eq!(response.results.len(), 4);
        for (result, case) in response.results.iter().zip(&req.test_cases) {
            assert_eq!(result.input, case.input);
            assert_eq!(result.expected_output, case.expected_output);
            if result.error.is_some() {
                assert_eq!(result.actual_output, None);
            }
        }
        assert_eq!(response.results[0].status, TestStatus::Passed);
        assert_eq!(response.results[1].status, TestStatus::RuntimeError);
        assert_eq!(response.results[1].error.as_deref(), Some("negative"));
        assert_eq!(response.results[2].status, TestStatus::Failed);
        assert_eq!(response.results[2].actual_output, Some(json!(1.5)));
        assert_eq!(response.results[3].status, TestStatus::Passed);

        let summary = response.summary;
        assert_eq!(summary.total, 4);
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.failed, summary.total - summary.passed);
        assert!(!summary.all_passed);
    }

    #[tokio::test]
    async fn test_explicit_function_name() {
        let mut req = request(
            Language::JavaScript,
            "function helper(x) { return x + 1; }\nfunction main(x) { return helper(x) * 2; }",
            json!([{ "input": [1], "expectedOutput": 4 }]),
        );
        req.function_name = Some("main".to_string());

        let response = execute_batch(&req, &LanguageConfigManager::builtin()).await.unwrap();
        assert!(response.summary.all_passed);
    }

    #[tokio::test]
    async fn test_timeout_does_not_abort_batch() {
        let manager = LanguageConfigManager::builtin().with_timeout_ms(300);
        let req = request(
            Language::JavaScript,
            "function f(n) { while (n === 0) {} return n; }",
            json!([
                { "input": [0], "expectedOutput": 0 },
                { "input": [7], "expectedOutput": 7 }
            ]),
        );

        let response = execute_batch(&req, &manager).await.unwrap();

        let timed_out = &response.results[0];
        assert!(!timed_out.passed);
        assert_eq!(timed_out.status, TestStatus::TimeLimitExceeded);
        assert!(timed_out.error.as_deref().unwrap().contains("timeout"));
        assert!(timed_out.execution_time >= 300);
        assert!(timed_out.execution_time < 1300);
        assert!(response.results[1].passed);
    }

    #[tokio::test]
    async fn test_disabled_language_is_orchestration_error() {
        let manager = LanguageConfigManager::from_json(
            r#"{"languages": [{"name": "javascript"}]}"#,
        )
        .unwrap();
        let req = request(
            Language::Python,
            "def f():\n    return 1\n",
            json!([{ "input": [], "expectedOutput": 1 }]),
        );
        assert!(execute_batch(&req, &manager).await.is_err());
    }

    #[tokio::test]
    #[ignore] // Requires python3 on PATH
    async fn test_python_subtract_fails() {
        let req = request(
            Language::Python,
            "def add(a,b):\n return a-b",
            json!([{ "input": [2, 3], "expectedOutput": 5 }]),
        );

        let response = execute_batch(&req, &LanguageConfigManager::builtin()).await.unwrap();

        let result = &response.results[0];
        assert!(!result.passed);
        assert_eq!(result.actual_output, Some(json!(-1)));
        assert_eq!(result.error, None);
        assert!(!response.summary.all_passed);
    }
}
