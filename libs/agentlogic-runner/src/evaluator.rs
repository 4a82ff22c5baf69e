//! Test Evaluator - Language-Agnostic Comparison Logic
//!
//! **Core Responsibility:**
//! Turn raw execution outcomes into `TestResult`s and decide pass/fail.
//!
//! **Critical Properties:**
//! - Knows nothing about interpreters or processes
//! - Pure function: (execution output, test case) → result
//!
//! **Comparison Rules:**
//! - Both values are canonicalized: object keys sorted recursively
//! - Array order is significant
//! - No type coercion (`"5"` never equals `5`)
//! - Integers and floats stay distinct (`5.0` never equals `5`)
//! - Floating-point tolerance: NO, exact serialized equality only

use agentlogic_common::{RunResponse, TestCase, TestResult, TestStatus};
use serde::Deserialize;
use serde_json::{Map, Value};

pub const PARSE_ERROR_MESSAGE: &str = "Failed to parse output";

/// Deepest array/object nesting accepted from a submission's output
pub const MAX_OUTPUT_DEPTH: usize = 1024;

/// What a backend observed for one test case
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// The entry point returned; `Value::Null` covers `None`/`undefined`
    Returned(Value),
    TimedOut { timeout_ms: u64 },
    /// Exception in the submission, non-zero exit, or infrastructure failure
    RuntimeError(String),
    /// The run finished but its output was not valid JSON
    Unparseable { raw: String },
}

/// Raw execution output for a single test case.
/// Produced by an execution engine, consumed by the evaluator.
#[derive(Debug, Clone)]
pub struct TestExecutionOutput {
    pub outcome: ExecutionOutcome,
    pub execution_time_ms: u64,
}

impl TestExecutionOutput {
    pub fn new(outcome: ExecutionOutcome, execution_time_ms: u64) -> Self {
        Self {
            outcome,
            execution_time_ms,
        }
    }
}

/// Human readable timeout message, e.g. "Execution timeout (5s)"
pub fn timeout_message(timeout_ms: u64) -> String {
    if timeout_ms % 1000 == 0 {
        format!("Execution timeout ({}s)", timeout_ms / 1000)
    } else {
        format!("Execution timeout ({}ms)", timeout_ms)
    }
}

/// Decode the JSON text a backend captured as the return value.
///
/// serde_json's own recursion limit (128) is lifted; nesting is bounded by
/// `MAX_OUTPUT_DEPTH` instead, and exceeding it is reported as its own error
/// rather than as unparseable output.
pub fn decode_output(raw: &str) -> ExecutionOutcome {
    let text = raw.trim();
    let depth = nesting_depth(text);
    if depth > MAX_OUTPUT_DEPTH {
        return ExecutionOutcome::RuntimeError(format!(
            "Output nesting depth {} exceeds the limit of {}",
            depth, MAX_OUTPUT_DEPTH
        ));
    }

    let mut deserializer = serde_json::Deserializer::from_str(text);
    deserializer.disable_recursion_limit();
    let parsed = Value::deserialize(&mut deserializer).and_then(|value| {
        deserializer.end()?;
        Ok(value)
    });

    match parsed {
        Ok(value) => ExecutionOutcome::Returned(value),
        Err(_) => ExecutionOutcome::Unparseable {
            raw: raw.to_string(),
        },
    }
}

/// Maximum bracket nesting outside of string literals
fn nesting_depth(text: &str) -> usize {
    let mut depth = 0usize;
    let mut max_depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for byte in text.bytes() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'[' | b'{' => {
                depth += 1;
                max_depth = max_depth.max(depth);
            }
            b']' | b'}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    max_depth
}

/// Rebuild `value` with every object's keys in sorted order
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut sorted = Map::new();
            for (key, inner) in entries {
                sorted.insert(key.clone(), canonicalize(inner));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Compact serialization of the canonical form
pub fn canonical_string(value: &Value) -> String {
    canonicalize(value).to_string()
}

/// Exact structural equality modulo object key order
pub fn values_match(actual: &Value, expected: &Value) -> bool {
    canonical_string(actual) == canonical_string(expected)
}

/// Evaluate a single test case execution output
pub fn evaluate_test(output: &TestExecutionOutput, test_case: &TestCase) -> TestResult {
    let (status, actual_output, error) = match &output.outcome {
        ExecutionOutcome::Returned(value) => {
            let status = if values_match(value, &test_case.expected_output) {
                TestStatus::Passed
            } else {
                TestStatus::Failed
            };
            (status, Some(value.clone()), None)
        }
        ExecutionOutcome::TimedOut { timeout_ms } => (
            TestStatus::TimeLimitExceeded,
            None,
            Some(timeout_message(*timeout_ms)),
        ),
        ExecutionOutcome::RuntimeError(message) => {
            (TestStatus::RuntimeError, None, Some(message.clone()))
        }
        ExecutionOutcome::Unparseable { raw } => (
            TestStatus::ParseError,
            Some(Value::String(raw.clone())),
            Some(PARSE_ERROR_MESSAGE.to_string()),
        ),
    };

    TestResult {
        passed: status == TestStatus::Passed,
        status,
        input: test_case.input.clone(),
        expected_output: test_case.expected_output.clone(),
        actual_output,
        error,
        execution_time: output.execution_time_ms,
    }
}

/// Pair outputs with their test cases positionally and build the response.
///
/// Outputs are produced in test-case order by the engine, so no lookup or
/// reordering happens here.
pub fn evaluate(test_cases: &[TestCase], outputs: &[TestExecutionOutput]) -> RunResponse {
    let results = test_cases
        .iter()
        .zip(outputs)
        .map(|(test_case, output)| evaluate_test(output, test_case))
        .collect();
    RunResponse::new(results)
}
