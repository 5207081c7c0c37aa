//! # Configuration Management Module
//!
//! ## Purpose
//! Centralized configuration management for the vocabulary corpus builder,
//! supporting TOML files and environment variable overrides with validation
//! and type-safe access to all system settings.
//!
//! ## Input/Output Specification
//! - **Input**: Configuration files (TOML), environment variables
//! - **Output**: Validated configuration structs with defaults and overrides
//! - **Validation**: Type checking, range validation, template verification
//!
//! ## Configuration Sources (in order of precedence)
//! 1. Environment variables (`WORDSTOCK_*`)
//! 2. Configuration files
//! 3. Default values
//!
//! ## Usage
//! ```rust,no_run
//! use wordstock::config::Config;
//!
//! let config = Config::from_file("config.toml").unwrap();
//! println!("Corpus dir: {:?}", config.snapshot.corpus_dir);
//! ```

use crate::errors::{HarvestError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure containing all system settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Dictionary fetching and extraction settings
    pub dictionary: DictionaryConfig,
    /// Corpus snapshot settings
    pub snapshot: SnapshotConfig,
    /// Flashcard store settings
    pub flashcard: FlashcardConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Dictionary fetching and extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DictionaryConfig {
    /// Candidate page URL templates tried in order; `{word}` is replaced
    /// with the query word. First template yielding content wins.
    pub candidate_url_templates: Vec<String>,
    /// Base URL used to absolutize relative audio links
    pub base_url: String,
    /// Request timeout in seconds
    pub request_timeout_seconds: u64,
    /// User agent sent with every page fetch
    pub user_agent: String,
    /// Maximum depth for alternate-spelling redirect expansion
    pub redirect_depth: usize,
    /// Politeness delay between queries (ms)
    pub rate_limit_delay_ms: u64,
}

/// Corpus snapshot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Directory holding dated corpus snapshots
    pub corpus_dir: PathBuf,
}

/// Flashcard store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlashcardConfig {
    /// Flashcard application endpoint
    pub endpoint: String,
    /// Collection (deck) to store cards in
    pub collection: String,
    /// Note model name
    pub model: String,
    /// Request timeout in seconds
    pub request_timeout_seconds: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Enable structured JSON logging
    pub json_format: bool,
}

impl Config {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::from_file("config.toml")
    }

    /// Load configuration from a specific file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!("Configuration file not found: {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| HarvestError::Config {
            message: format!("Failed to read config file {:?}: {}", path, e),
        })?;

        let mut config: Config = toml::from_str(&content).map_err(|e| HarvestError::Config {
            message: format!("Failed to parse config file {:?}: {}", path, e),
        })?;

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(dir) = std::env::var("WORDSTOCK_CORPUS_DIR") {
            self.snapshot.corpus_dir = PathBuf::from(dir);
        }
        if let Ok(level) = std::env::var("WORDSTOCK_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(endpoint) = std::env::var("WORDSTOCK_FLASHCARD_ENDPOINT") {
            self.flashcard.endpoint = endpoint;
        }
        if let Ok(timeout) = std::env::var("WORDSTOCK_FETCH_TIMEOUT_SECONDS") {
            self.dictionary.request_timeout_seconds =
                timeout.parse().map_err(|_| HarvestError::Config {
                    message: "Invalid number in WORDSTOCK_FETCH_TIMEOUT_SECONDS".to_string(),
                })?;
        }
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.dictionary.candidate_url_templates.is_empty() {
            return Err(HarvestError::ValidationFailed {
                field: "dictionary.candidate_url_templates".to_string(),
                reason: "At least one candidate URL template is required".to_string(),
            });
        }

        for template in &self.dictionary.candidate_url_templates {
            if !template.contains("{word}") {
                return Err(HarvestError::ValidationFailed {
                    field: "dictionary.candidate_url_templates".to_string(),
                    reason: format!("Template missing {{word}} placeholder: {}", template),
                });
            }
        }

        if self.dictionary.request_timeout_seconds == 0 {
            return Err(HarvestError::ValidationFailed {
                field: "dictionary.request_timeout_seconds".to_string(),
                reason: "Timeout cannot be zero".to_string(),
            });
        }

        // Deeper chains are allowed but bounded; a runaway depth is almost
        // certainly a configuration mistake.
        if self.dictionary.redirect_depth > 5 {
            return Err(HarvestError::ValidationFailed {
                field: "dictionary.redirect_depth".to_string(),
                reason: "Redirect depth above 5 is not supported".to_string(),
            });
        }

        Ok(())
    }

    /// Get configuration as TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| HarvestError::Config {
            message: format!("Failed to serialize config to TOML: {}", e),
        })
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = self.to_toml()?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dictionary: DictionaryConfig::default(),
            snapshot: SnapshotConfig::default(),
            flashcard: FlashcardConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for DictionaryConfig {
    fn default() -> Self {
        Self {
            candidate_url_templates: vec![
                "https://dictionary.cambridge.org/dictionary/english-chinese-simplified/{word}"
                    .to_string(),
                "https://dictionary.cambridge.org/dictionary/english/{word}".to_string(),
            ],
            base_url: "https://dictionary.cambridge.org".to_string(),
            request_timeout_seconds: 10,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/100.0.4896.127 Safari/537.36"
                .to_string(),
            redirect_depth: 1,
            rate_limit_delay_ms: 500,
        }
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            corpus_dir: PathBuf::from("./data/corpus"),
        }
    }
}

impl Default for FlashcardConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8765".to_string(),
            collection: "CambridgeDeck".to_string(),
            model: "WordType".to_string(),
            request_timeout_seconds: 2,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}
