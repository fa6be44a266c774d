use std::path::PathBuf;

use ffreplex_lib::ReplexError;
use thiserror::Error;

/// Main error type for the ffreplex binary
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Replex(#[from] ReplexError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Cannot serialize config: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    #[error("Invalid override {input:?}: {reason}")]
    Override { input: String, reason: String },

    #[error("No input files found in {}", .0.display())]
    NoInput(PathBuf),

    #[error("{failed} jobs failed, {skipped} skipped")]
    BatchFailed { failed: usize, skipped: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
