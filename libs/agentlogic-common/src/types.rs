use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Languages a submission can be written in.
///
/// The set is closed: each variant is bound to exactly one execution backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    JavaScript,
    Python,
}

/// How a language's submissions get executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Embedded interpreter inside the host process
    Sandbox,
    /// Freshly spawned interpreter process per test case
    Process,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::JavaScript, Language::Python];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::Python => "python",
        }
    }

    pub fn backend(&self) -> Backend {
        match self {
            Language::JavaScript => Backend::Sandbox,
            Language::Python => Backend::Process,
        }
    }

    /// Comma separated list used in validation messages
    pub fn supported_list() -> String {
        Self::ALL
            .iter()
            .map(Language::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Whether `name` can be called as a function in this language
    pub fn is_valid_identifier(&self, name: &str) -> bool {
        let allow_dollar = matches!(self, Language::JavaScript);
        let mut chars = name.chars();
        let first_ok = match chars.next() {
            Some(c) => c.is_ascii_alphabetic() || c == '_' || (allow_dollar && c == '$'),
            None => false,
        };
        first_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || (allow_dollar && c == '$'))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "javascript" => Ok(Language::JavaScript),
            "python" => Ok(Language::Python),
            _ => Err(ValidationError::UnsupportedLanguage {
                language: s.to_string(),
                supported: Language::supported_list(),
            }),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Sandbox => f.write_str("sandbox"),
            Backend::Process => f.write_str("process"),
        }
    }
}

/// One input/expected-output pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    #[serde(default)]
    pub input: Vec<Value>,
    #[serde(default)]
    pub expected_output: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Terminal state of a single test case execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Passed,
    /// Ran to completion but produced a different value
    Failed,
    TimeLimitExceeded,
    RuntimeError,
    /// Output could not be decoded as JSON
    ParseError,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub passed: bool,
    pub status: TestStatus,
    pub input: Vec<Value>,
    pub expected_output: Value,
    pub actual_output: Option<Value>,
    pub error: Option<String>,
    /// Milliseconds
    pub execution_time: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub all_passed: bool,
}

impl RunSummary {
    pub fn from_results(results: &[TestResult]) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.passed).count();
        let failed = total - passed;
        Self {
            total,
            passed,
            failed,
            all_passed: failed == 0,
        }
    }
}

/// A validated batch ready for execution
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub code: String,
    pub test_cases: Vec<TestCase>,
    pub language: Language,
    pub function_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResponse {
    pub success: bool,
    pub results: Vec<TestResult>,
    pub summary: RunSummary,
}

impl RunResponse {
    pub fn new(results: Vec<TestResult>) -> Self {
        let summary = RunSummary::from_results(&results);
        Self {
            success: true,
            results,
            summary,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>, error: Option<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(passed: bool) -> TestResult {
        TestResult {
            passed,
            status: if passed { TestStatus::Passed } else { TestStatus::Failed },
            input: vec![],
            expected_output: Value::Null,
            actual_output: Some(Value::Null),
            error: None,
            execution_time: 1,
        }
    }

    #[test]
    fn test_language_parsing() {
        assert_eq!("javascript".parse::<Language>().unwrap(), Language::JavaScript);
        assert_eq!("python".parse::<Language>().unwrap(), Language::Python);
        let err = "ruby".parse::<Language>().unwrap_err();
        assert!(err.to_string().contains("javascript, python"));
    }

    #[test]
    fn test_language_names_are_exact() {
        for name in ["Python", "JAVASCRIPT", " javascript ", "python\n"] {
            let err = name.parse::<Language>().unwrap_err();
            assert!(
                matches!(err, ValidationError::UnsupportedLanguage { .. }),
                "{:?} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_language_backends() {
        assert_eq!(Language::JavaScript.backend(), Backend::Sandbox);
        assert_eq!(Language::Python.backend(), Backend::Process);
    }

    #[test]
    fn test_identifier_rules() {
        assert!(Language::Python.is_valid_identifier("two_sum"));
        assert!(Language::JavaScript.is_valid_identifier("$helper"));
        assert!(!Language::Python.is_valid_identifier("$helper"));
        assert!(!Language::Python.is_valid_identifier("1abc"));
        assert!(!Language::JavaScript.is_valid_identifier("a(); evil"));
        assert!(!Language::JavaScript.is_valid_identifier(""));
    }

    #[test]
    fn test_summary_consistency() {
        let results = vec![result(true), result(false), result(true)];
        let summary = RunSummary::from_results(&results);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.failed, 1);
        assert!(!summary.all_passed);

        let summary = RunSummary::from_results(&[result(true)]);
        assert!(summary.all_passed);
    }

    #[test]
    fn test_result_wire_format() {
        let value = serde_json::to_value(result(true)).unwrap();
        assert_eq!(value["executionTime"], json!(1));
        assert_eq!(value["expectedOutput"], Value::Null);
        assert!(value.get("actualOutput").is_some());
        assert_eq!(value["error"], Value::Null);
        assert_eq!(value["status"], json!("passed"));
    }

    #[test]
    fn test_test_case_defaults() {
        let tc: TestCase = serde_json::from_value(json!({ "input": [1, 2] })).unwrap();
        assert_eq!(tc.input, vec![json!(1), json!(2)]);
        assert_eq!(tc.expected_output, Value::Null);
        assert!(tc.description.is_none());
    }
}
