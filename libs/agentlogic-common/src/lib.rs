pub mod error;
pub mod request;
pub mod types;

pub use error::ValidationError;
pub use request::{RequestLimits, RunPayload};
pub use types::{
    Backend, ErrorResponse, Language, RunRequest, RunResponse, RunSummary, TestCase, TestResult,
    TestStatus,
};
