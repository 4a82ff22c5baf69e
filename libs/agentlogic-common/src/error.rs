use thiserror::Error;

/// Reasons a batch is rejected before any test case runs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Code, test cases, and language are required (missing: {0})")]
    MissingField(&'static str),

    #[error("Code must not be empty")]
    EmptyCode,

    #[error("Test cases must be a non-empty array")]
    EmptyTestCases,

    #[error("Test case {index} is invalid: {reason}")]
    InvalidTestCase { index: usize, reason: String },

    #[error("Unsupported language '{language}'. Supported languages: {supported}")]
    UnsupportedLanguage { language: String, supported: String },

    #[error("Language '{0}' is not enabled on this server")]
    LanguageDisabled(String),

    #[error("Invalid function name '{0}'")]
    InvalidFunctionName(String),

    #[error("Code exceeds maximum size of {max} bytes")]
    CodeTooLarge { max: usize },

    #[error("Too many test cases: {count} (maximum {max})")]
    TooManyTestCases { count: usize, max: usize },
}
