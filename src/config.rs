//! Configuration loading and management for synopsis.
//!
//! Loads settings from `synopsis.toml` with environment variable overrides for
//! credentials. Every field has a default, so running without a config file
//! only requires the API keys in the environment.

use crate::error::{Classify, ErrorKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Upper bound on parallel per-source work during research
pub const MAX_CONCURRENCY: usize = 4;

const CONFIG_FILE: &str = "synopsis.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("missing required credential: {0}")]
    MissingApiKey(String),
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl Classify for ConfigError {
    fn kind(&self) -> ErrorKind {
        match self {
            ConfigError::MissingApiKey(_) => ErrorKind::Auth,
            _ => ErrorKind::Config,
        }
    }
}

/// Inference API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of the OpenAI-compatible endpoint
    pub base_url: String,
    /// Model identifier (e.g., "deepseek-r1-distill-llama-70b")
    pub model: String,
    /// Maximum number of tokens to generate per summary
    pub max_length: u32,
    /// Sampling temperature, 0.0 to 1.0
    pub temperature: f32,
    pub timeout_secs: u64,
}

/// Page fetching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Character ceiling applied to extracted page text
    pub max_chars: usize,
    pub timeout_secs: u64,
    pub user_agent: String,
}

/// Search API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub base_url: String,
    /// Number of results requested per query (1-10)
    pub max_results: usize,
    pub timeout_secs: u64,
}

/// Topic research configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    /// Sources processed at once; 1 keeps the run strictly sequential
    pub concurrency: usize,
    /// Token budget for the consolidation call
    pub consolidation_max_tokens: u32,
}

/// Report export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory research reports are written to
    pub dir: PathBuf,
    /// Write a JSON copy of every research report
    pub save_research: bool,
}

/// API keys configuration (loaded from environment)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApiConfig {
    #[serde(default)]
    pub groq_key: Option<String>,
    #[serde(default)]
    pub google_search_key: Option<String>,
    #[serde(default)]
    pub google_search_engine_id: Option<String>,
}

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub research: ResearchConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

impl Config {
    /// Load configuration from the default location, falling back to defaults
    /// when no file exists
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::find_config_file() {
            Some(path) => Self::parse_file(&path)?,
            None => {
                tracing::debug!("no {} found, using defaults", CONFIG_FILE);
                Config::default()
            }
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::parse_file(path)?;
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    fn parse_file(path: &Path) -> Result<Self, ConfigError> {
        tracing::debug!(path = %path.display(), "loading config");
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Override API keys from environment variables.
    ///
    /// The search variables also accept the `GROQ_`-prefixed names.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |names: &[&str]| {
            names
                .iter()
                .filter_map(|name| lookup(name))
                .find(|value| !value.trim().is_empty())
        };

        if let Some(key) = first(&["GROQ_API_KEY"]) {
            self.api.groq_key = Some(key);
        }
        if let Some(key) = first(&["GOOGLE_SEARCH_API_KEY", "GROQ_GOOGLE_SEARCH_API_KEY"]) {
            self.api.google_search_key = Some(key);
        }
        if let Some(id) = first(&["GOOGLE_SEARCH_ENGINE_ID", "GROQ_GOOGLE_SEARCH_ENGINE_ID"]) {
            self.api.google_search_engine_id = Some(id);
        }
    }

    /// Find the config file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        // Check current directory first
        let local_config = PathBuf::from(CONFIG_FILE);
        if local_config.exists() {
            return Some(local_config);
        }

        // Check home directory
        dirs::home_dir()
            .map(|home| home.join(".config").join("synopsis").join(CONFIG_FILE))
            .filter(|path| path.exists())
    }

    /// Reject values the APIs or the pipeline cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.llm.temperature) {
            return Err(ConfigError::Invalid {
                field: "llm.temperature",
                reason: format!("{} is outside 0.0-1.0", self.llm.temperature),
            });
        }
        if self.llm.max_length == 0 {
            return Err(ConfigError::Invalid {
                field: "llm.max_length",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "llm.model",
                reason: "must not be empty".to_string(),
            });
        }
        if self.fetch.max_chars == 0 {
            return Err(ConfigError::Invalid {
                field: "fetch.max_chars",
                reason: "must be greater than zero".to_string(),
            });
        }
        if !(1..=10).contains(&self.search.max_results) {
            return Err(ConfigError::Invalid {
                field: "search.max_results",
                reason: format!("{} is outside 1-10", self.search.max_results),
            });
        }
        if !(1..=MAX_CONCURRENCY).contains(&self.research.concurrency) {
            return Err(ConfigError::Invalid {
                field: "research.concurrency",
                reason: format!(
                    "{} is outside 1-{}",
                    self.research.concurrency, MAX_CONCURRENCY
                ),
            });
        }
        Ok(())
    }

    /// Get the inference API key
    pub fn llm_api_key(&self) -> Result<&str, ConfigError> {
        self.api
            .groq_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingApiKey("GROQ_API_KEY".to_string()))
    }

    /// Get the search API key and engine id
    pub fn search_credentials(&self) -> Result<(&str, &str), ConfigError> {
        let key = self
            .api
            .google_search_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingApiKey("GOOGLE_SEARCH_API_KEY".to_string()))?;
        let engine_id = self
            .api
            .google_search_engine_id
            .as_deref()
            .ok_or_else(|| ConfigError::MissingApiKey("GOOGLE_SEARCH_ENGINE_ID".to_string()))?;
        Ok((key, engine_id))
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "deepseek-r1-distill-llama-70b".to_string(),
            max_length: 1000,
            temperature: 0.7,
            timeout_secs: 60,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_chars: 10_000,
            timeout_secs: 10,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36"
                .to_string(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.googleapis.com".to_string(),
            max_results: 5,
            timeout_secs: 15,
        }
    }
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            consolidation_max_tokens: 1500,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            save_research: true,
        }
    }
}
