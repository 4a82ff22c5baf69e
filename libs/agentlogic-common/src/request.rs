// Wire-level run request and its validation

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;
use crate::types::{Language, RunRequest, TestCase};

pub const DEFAULT_MAX_CODE_BYTES: usize = 1024 * 1024;
pub const DEFAULT_MAX_TEST_CASES: usize = 100;

/// Body of `POST /api/test-execution/run` as received.
///
/// Every field is optional here so that missing or mistyped fields surface as
/// a `ValidationError` instead of a generic body rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunPayload {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub test_cases: Option<Value>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub function_name: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct RequestLimits {
    pub max_code_bytes: usize,
    pub max_test_cases: usize,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            max_code_bytes: DEFAULT_MAX_CODE_BYTES,
            max_test_cases: DEFAULT_MAX_TEST_CASES,
        }
    }
}

impl RunPayload {
    /// Check the payload and turn it into a typed `RunRequest`.
    ///
    /// Order matters for the caller-visible message: presence first, then
    /// language, then the shape of the test cases.
    pub fn validate(self, limits: &RequestLimits) -> Result<RunRequest, ValidationError> {
        let code = self.code.ok_or(ValidationError::MissingField("code"))?;
        let raw_cases = self
            .test_cases
            .ok_or(ValidationError::MissingField("testCases"))?;
        let language_name = self
            .language
            .ok_or(ValidationError::MissingField("language"))?;

        let language: Language = language_name.parse()?;

        if code.trim().is_empty() {
            return Err(ValidationError::EmptyCode);
        }
        if code.len() > limits.max_code_bytes {
            return Err(ValidationError::CodeTooLarge {
                max: limits.max_code_bytes,
            });
        }

        let items = match raw_cases {
            Value::Array(items) if !items.is_empty() => items,
            _ => return Err(ValidationError::EmptyTestCases),
        };
        if items.len() > limits.max_test_cases {
            return Err(ValidationError::TooManyTestCases {
                count: items.len(),
                max: limits.max_test_cases,
            });
        }

        let test_cases = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                serde_json::from_value::<TestCase>(item).map_err(|e| {
                    ValidationError::InvalidTestCase {
                        index,
                        reason: e.to_string(),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let function_name = match self.function_name.map(|n| n.trim().to_string()) {
            Some(name) if name.is_empty() => None,
            Some(name) if !language.is_valid_identifier(&name) => {
                return Err(ValidationError::InvalidFunctionName(name));
            }
            other => other,
        };

        Ok(RunRequest {
            code,
            test_cases,
            language,
            function_name,
        })
    }
}
