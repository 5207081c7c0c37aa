//! # Error Handling Module
//!
//! ## Purpose
//! Centralized error handling for the vocabulary corpus builder, providing
//! structured error types and conversion utilities for all system components.
//!
//! ## Input/Output Specification
//! - **Input**: Error conditions from various system components
//! - **Output**: Structured error types with context and error chains
//! - **Error Categories**: Configuration, Snapshot, Flashcard, Ingestion
//!
//! ## Error Philosophy
//! Failures on the extraction path (fetch failures, parse-empty pages,
//! redirect cycles) are never surfaced as hard errors: the entry assembler
//! degrades to the unresolved placeholder record instead. The types here
//! cover the remaining genuinely fatal conditions: unreadable configuration,
//! snapshot I/O, malformed input files and flashcard store failures.

use thiserror::Error;

/// Result type used throughout the application
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Error types for the vocabulary corpus builder
#[derive(Debug, Error)]
pub enum HarvestError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Validation errors
    #[error("Validation failed for field '{field}': {reason}")]
    ValidationFailed { field: String, reason: String },

    /// Snapshot store errors
    #[error("Snapshot error in {folder}: {details}")]
    Snapshot { folder: String, details: String },

    /// Highlight input file errors
    #[error("Failed to read highlights from {file}: {details}")]
    InvalidHighlightFile { file: String, details: String },

    /// Flashcard store errors
    #[error("Flashcard store error: {details}")]
    FlashcardStore { details: String },

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client construction errors (fetch failures themselves are
    /// swallowed by the page fetcher and never reach this type)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Internal system errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl HarvestError {
    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            HarvestError::Config { .. } | HarvestError::ValidationFailed { .. } => "configuration",
            HarvestError::Snapshot { .. } => "snapshot",
            HarvestError::InvalidHighlightFile { .. } => "ingestion",
            HarvestError::FlashcardStore { .. } => "flashcard",
            HarvestError::Http(_) => "network",
            HarvestError::Io(_) | HarvestError::Json(_) | HarvestError::Toml(_) => "io",
            HarvestError::Internal { .. } => "generic",
        }
    }
}
