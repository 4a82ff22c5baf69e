// Service settings read from the environment

use agentlogic_common::request::{DEFAULT_MAX_CODE_BYTES, DEFAULT_MAX_TEST_CASES};
use agentlogic_common::RequestLimits;
use anyhow::{Context, Result};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub rate_limit_max: u32,
    pub rate_limit_window: Duration,
    pub limits: RequestLimits,
    pub json_logs: bool,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_or("PORT", 3000)?,
            rate_limit_max: env_or("RATE_LIMIT_MAX", 10)?,
            rate_limit_window: Duration::from_secs(env_or("RATE_LIMIT_WINDOW_SECS", 60)?),
            limits: RequestLimits {
                max_code_bytes: env_or("MAX_CODE_BYTES", DEFAULT_MAX_CODE_BYTES)?,
                max_test_cases: env_or("MAX_TEST_CASES", DEFAULT_MAX_TEST_CASES)?,
            },
            json_logs: std::env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
        Err(_) => Ok(default),
    }
}
