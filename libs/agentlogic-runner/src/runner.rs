// Test runner facade: validation + batch execution

use crate::config::LanguageConfigManager;
use crate::executor;
use agentlogic_common::{RequestLimits, RunPayload, RunRequest, RunResponse, ValidationError};
use anyhow::Result;
use std::sync::Arc;

/// Entry point shared by the HTTP service and the CLI.
///
/// Cheap to clone; all state is immutable configuration.
#[derive(Debug, Clone)]
pub struct TestRunner {
    languages: Arc<LanguageConfigManager>,
    limits: RequestLimits,
}

impl TestRunner {
    pub fn new(languages: LanguageConfigManager, limits: RequestLimits) -> Self {
        Self {
            languages: Arc::new(languages),
            limits,
        }
    }

    pub fn languages(&self) -> &LanguageConfigManager {
        &self.languages
    }

    pub fn limits(&self) -> &RequestLimits {
        &self.limits
    }

    /// Reject a payload before anything is executed
    pub fn validate(&self, payload: RunPayload) -> Result<RunRequest, ValidationError> {
        let request = payload.validate(&self.limits)?;
        if !self.languages.is_enabled(request.language) {
            return Err(ValidationError::LanguageDisabled(request.language.to_string()));
        }
        Ok(request)
    }

    pub async fn run_tests(&self, request: &RunRequest) -> Result<RunResponse> {
        executor::execute_batch(request, &self.languages).await
    }
}
