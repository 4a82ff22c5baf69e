pub mod config;
pub mod engine;
pub mod entrypoint;
pub mod evaluator;
pub mod executor;
pub mod runner;

pub use config::{LanguageConfig, LanguageConfigManager};
pub use runner::TestRunner;
