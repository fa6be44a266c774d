use std::path::PathBuf;

use thiserror::Error;

/// Main error type for audio planning and batch execution
#[derive(Error, Debug)]
pub enum ReplexError {
    /// The reference file does not exist or is not a regular file
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The probe returned no streams for the file
    #[error("No streams found in {}", .0.display())]
    EmptyCatalog(PathBuf),

    /// The probe output could not be parsed
    #[error("Invalid probe data: {0}")]
    InvalidProbe(String),

    /// The probing tool could not be run or exited with an error
    #[error("{tool} failed (exit code {exit_code}): {message}")]
    Probe {
        tool: String,
        exit_code: i32,
        message: String,
    },

    /// A track was selected for generation but no downmix rule covers the pair
    #[error("No downmix rule produces {target} from stream {source_index} ({source_layout})")]
    UnresolvedDownmix {
        target: String,
        source_index: usize,
        source_layout: String,
    },

    /// An external process exited with a non-zero status
    #[error("Job #{job} failed with exit code {}", exit_code.map(|c| c.to_string()).unwrap_or_else(|| "none".to_string()))]
    ProcessFailure { job: usize, exit_code: Option<i32> },

    /// An override referenced a track that is not part of the plan
    #[error("Track not found in plan: {0}")]
    TrackNotFound(String),

    /// Invalid downmix or batch configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A standard I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ReplexError>;
