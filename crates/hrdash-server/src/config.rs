//! Configuration system for the HRDash server
//!
//! Loads configuration from:
//! 1. config.yaml - operational settings (port, source, assistant, logging)
//! 2. .env file - secrets (API keys)
//!
//! Environment variables always override config.yaml values.

use hrdash_query::IntentRules;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Where the indicator workbook lives
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Directory of per-year CSV files, or a JSON workbook file
    pub path: String,

    /// Seconds a loaded fact table is reused before reloading
    pub ttl_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: "./data".to_string(),
            ttl_secs: 300,
        }
    }
}

/// Question answering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Answering mode: "rules" or "llm"
    pub mode: String,

    /// Chat model (only used when mode = "llm")
    pub model: String,

    /// Rows of the filtered scope sent to the model
    pub max_rows: usize,

    /// Keyword table for the rule-based answerer
    pub rules: IntentRules,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            mode: "rules".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_rows: 500,
            rules: IntentRules::default(),
        }
    }
}

impl AssistantConfig {
    pub fn uses_llm(&self) -> bool {
        self.mode.eq_ignore_ascii_case("llm")
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or module-specific
    pub level: String,

    /// Output format: pretty, json, compact
    pub format: String,

    /// Output destination: stdout, file, both
    pub output: String,

    /// Directory for log files
    pub directory: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            output: "stdout".to_string(),
            directory: "./logs".to_string(),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub source: SourceConfig,
    pub assistant: AssistantConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from YAML file with environment variable overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Like [`Config::load`], but a missing file means defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            return Self::load(path);
        }
        let mut config = Config::default();
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("HRDASH_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("HRDASH_SERVER_PORT") {
            if let Ok(port_num) = port.parse() {
                self.server.port = port_num;
            }
        }

        if let Ok(path) = std::env::var("HRDASH_SOURCE_PATH") {
            self.source.path = path;
        }
        if let Ok(ttl) = std::env::var("HRDASH_SOURCE_TTL_SECS") {
            if let Ok(secs) = ttl.parse() {
                self.source.ttl_secs = secs;
            }
        }

        if let Ok(mode) = std::env::var("HRDASH_ASSISTANT_MODE") {
            self.assistant.mode = mode;
        }
        if let Ok(model) = std::env::var("HRDASH_ASSISTANT_MODEL") {
            self.assistant.model = model;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Ok(output) = std::env::var("LOG_OUTPUT") {
            self.logging.output = output;
        }
        if let Ok(dir) = std::env::var("LOG_DIR") {
            self.logging.directory = dir;
        }
    }

    /// Get OpenAI API key from environment (must be in .env)
    pub fn get_openai_api_key() -> Result<String, ConfigError> {
        std::env::var("OPENAI_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("OPENAI_API_KEY".to_string()))
    }

    /// Optional OpenAI-compatible endpoint
    pub fn get_openai_base_url() -> Option<String> {
        std::env::var("OPENAI_BASE_URL").ok()
    }

    /// Set logging environment variables for the logging module
    pub fn apply_logging_env(&self) {
        std::env::set_var("RUST_LOG", &self.logging.level);
        std::env::set_var("LOG_FORMAT", &self.logging.format);
        std::env::set_var("LOG_OUTPUT", &self.logging.output);
        std::env::set_var("LOG_DIR", &self.logging.directory);
    }
}
