//! Application configuration

use std::path::PathBuf;

use clap::ValueEnum;
use ffreplex_lib::discovery::DEFAULT_PATTERN;
use ffreplex_lib::transcode::scheduler::{DEFAULT_WORKERS, MAX_WORKERS, MIN_WORKERS};
use ffreplex_lib::{BatchOptions, DownmixGraph, FailurePolicy, OutputLayout};
use serde::{Deserialize, Serialize};

use crate::cli::{Args, FailureMode};
use crate::error::{AppError, Result};

/// Default backoff between retries of a failed job
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 2000;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Resolved settings for one run
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// ffmpeg binary
    pub ffmpeg: PathBuf,

    /// ffprobe binary
    pub ffprobe: PathBuf,

    /// Concurrent ffmpeg processes
    pub workers: usize,

    pub failure_policy: FailurePolicy,

    /// Output directory and extension
    pub output: OutputLayout,

    /// Regular expression selecting input files in a folder
    pub pattern: String,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    pub log_format: LogFormat,

    /// Downmix targets and rules
    pub downmix: DownmixGraph,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            workers: DEFAULT_WORKERS,
            failure_policy: FailurePolicy::Continue,
            output: OutputLayout::default(),
            pattern: DEFAULT_PATTERN.to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            downmix: DownmixGraph::default(),
        }
    }
}

impl AppConfig {
    /// Command line flags win over file values
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(ffmpeg) = &args.ffmpeg {
            self.ffmpeg = ffmpeg.clone();
        }
        if let Some(ffprobe) = &args.ffprobe {
            self.ffprobe = ffprobe.clone();
        }
        if let Some(workers) = args.workers {
            self.workers = workers as usize;
        }
        if let Some(dir) = &args.output_dir {
            self.output.directory = dir.clone();
        }
        if let Some(pattern) = &args.pattern {
            self.pattern = pattern.clone();
        }
        if let Some(format) = args.log_format {
            self.log_format = format;
        }
        if let Some(mode) = args.on_failure {
            self.failure_policy = match mode {
                FailureMode::Continue => FailurePolicy::Continue,
                FailureMode::HaltSlot => FailurePolicy::HaltSlot,
                FailureMode::Retry => FailurePolicy::Retry {
                    attempts: args.retries,
                    backoff_ms: match self.failure_policy {
                        FailurePolicy::Retry { backoff_ms, .. } => backoff_ms,
                        _ => DEFAULT_RETRY_BACKOFF_MS,
                    },
                },
            };
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_WORKERS..=MAX_WORKERS).contains(&self.workers) {
            return Err(AppError::Config(format!(
                "workers must be between {} and {}, got {}",
                MIN_WORKERS, MAX_WORKERS, self.workers
            )));
        }
        if self.output.extension.is_empty() || self.output.extension.starts_with('.') {
            return Err(AppError::Config(format!(
                "invalid output extension {:?}",
                self.output.extension
            )));
        }
        regex::Regex::new(&self.pattern)
            .map_err(|e| AppError::Config(format!("invalid pattern {:?}: {}", self.pattern, e)))?;
        self.downmix.validate()?;
        Ok(())
    }

    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions::new(self.workers, self.failure_policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_default_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.workers, 4);
        assert_eq!(config.batch_options().workers, 4);
    }

    #[test]
    fn test_args_override_config() {
        let args = Args::try_parse_from([
            "ffreplex",
            "in",
            "-w",
            "2",
            "--ffmpeg",
            "/opt/ffmpeg",
            "-o",
            "/out",
            "--on-failure",
            "retry",
            "--retries",
            "3",
        ])
        .unwrap();
        let mut config = AppConfig::default();
        config.apply_args(&args);

        assert_eq!(config.workers, 2);
        assert_eq!(config.ffmpeg, PathBuf::from("/opt/ffmpeg"));
        assert_eq!(config.ffprobe, PathBuf::from("ffprobe"));
        assert_eq!(config.output.directory, PathBuf::from("/out"));
        assert_eq!(
            config.failure_policy,
            FailurePolicy::Retry {
                attempts: 3,
                backoff_ms: DEFAULT_RETRY_BACKOFF_MS
            }
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = AppConfig {
            workers: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = AppConfig {
            pattern: "(".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.output.extension = ".mkv".to_string();
        assert!(config.validate().is_err());
    }
}
