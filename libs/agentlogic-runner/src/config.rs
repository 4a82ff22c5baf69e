// Language configuration management for the test runner
use agentlogic_common::{Backend, Language};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "config/languages.json";
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_MEMORY_LIMIT_MB: u32 = 64;
pub const DEFAULT_FUNCTION_NAME: &str = "solution";

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_memory_limit_mb() -> u32 {
    DEFAULT_MEMORY_LIMIT_MB
}

fn default_function_name() -> String {
    DEFAULT_FUNCTION_NAME.to_string()
}

/// Interpreter binary invocation for process-backed languages.
/// The driver script is always fed through stdin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageExecution {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageConfig {
    pub name: String,
    #[serde(default)]
    pub execution: Option<LanguageExecution>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Only enforced by the sandbox backend
    #[serde(default = "default_memory_limit_mb")]
    pub memory_limit_mb: u32,
    #[serde(default = "default_function_name")]
    pub default_function_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct LanguagesJson {
    languages: Vec<LanguageConfig>,
}

/// Language configuration manager
#[derive(Debug, Clone)]
pub struct LanguageConfigManager {
    configs: HashMap<Language, LanguageConfig>,
}

impl LanguageConfigManager {
    /// Load language configurations from a languages.json file
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            bail!("Language config file not found: {}", config_path.display());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        Self::from_json(&content)
            .with_context(|| format!("Invalid language config in {}", config_path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let languages_json: LanguagesJson =
            serde_json::from_str(content).context("Failed to parse languages.json")?;

        let mut configs = HashMap::new();
        for lang in languages_json.languages {
            let language: Language = lang
                .name
                .parse()
                .map_err(|_| anyhow::anyhow!("Unknown language '{}' in languages.json", lang.name))?;

            if language.backend() == Backend::Process && lang.execution.is_none() {
                bail!("Language '{}' needs an execution command", lang.name);
            }
            if lang.timeout_ms == 0 {
                bail!("Language '{}' has a zero timeout", lang.name);
            }
            if configs.insert(language, lang).is_some() {
                bail!("Language '{}' is configured twice", language);
            }
        }

        if configs.is_empty() {
            bail!("No languages configured in languages.json");
        }

        Ok(Self { configs })
    }

    /// Load from `LANGUAGES_CONFIG` or config/languages.json, falling back to
    /// built-in defaults when no file is present
    pub fn load_default() -> Result<Self> {
        let path = std::env::var("LANGUAGES_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let path = Path::new(&path);

        if path.exists() {
            Self::load(path)
        } else {
            warn!(path = %path.display(), "Language config not found, using built-in defaults");
            Ok(Self::builtin())
        }
    }

    /// javascript in the embedded sandbox, python through `python3`
    pub fn builtin() -> Self {
        let mut configs = HashMap::new();
        configs.insert(
            Language::JavaScript,
            LanguageConfig {
                name: Language::JavaScript.to_string(),
                execution: None,
                timeout_ms: DEFAULT_TIMEOUT_MS,
                memory_limit_mb: DEFAULT_MEMORY_LIMIT_MB,
                default_function_name: default_function_name(),
            },
        );
        configs.insert(
            Language::Python,
            LanguageConfig {
                name: Language::Python.to_string(),
                execution: Some(LanguageExecution {
                    command: "python3".to_string(),
                    args: vec!["-I".to_string()],
                }),
                timeout_ms: DEFAULT_TIMEOUT_MS,
                memory_limit_mb: DEFAULT_MEMORY_LIMIT_MB,
                default_function_name: default_function_name(),
            },
        );
        Self { configs }
    }

    /// Get configuration for a specific language
    pub fn get_config(&self, language: &Language) -> Result<&LanguageConfig> {
        self.configs
            .get(language)
            .ok_or_else(|| anyhow::anyhow!("No configuration found for language: {}", language))
    }

    pub fn is_enabled(&self, language: Language) -> bool {
        self.configs.contains_key(&language)
    }

    /// List all enabled languages, sorted by name
    pub fn list_languages(&self) -> Vec<Language> {
        let mut languages: Vec<Language> = self.configs.keys().copied().collect();
        languages.sort_by_key(|l| l.as_str());
        languages
    }

    /// Override the timeout of every language, used by tests and the CLI
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        for config in self.configs.values_mut() {
            config.timeout_ms = timeout_ms;
        }
        self
    }
}
