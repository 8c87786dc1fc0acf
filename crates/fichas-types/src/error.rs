//! Error types for fichas

use thiserror::Error;

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration not found")]
    NotFound,

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Template or raw text was not supplied; nothing was attempted.
    #[error("Missing input: {0}")]
    InputMissing(String),

    /// Template bytes could not be read as a spreadsheet. The whole batch is aborted.
    #[error("Failed to read template: {0}")]
    TemplateRead(String),

    #[error("Unexpected processing error: {0}")]
    UnexpectedProcessing(String),

    #[error("Preview export error: {0}")]
    Export(String),
}

pub type Result<T> = std::result::Result<T, Error>;
