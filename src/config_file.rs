//! Configuration file support
//!
//! Loads ffreplex settings from TOML files. Every section is optional;
//! missing values fall back to the defaults of [`AppConfig`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use ffreplex_lib::{DownmixGraph, FailurePolicy, OutputLayout};

use crate::config::{AppConfig, LogFormat};
use crate::error::Result;

/// Configuration file format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// External tools
    pub tools: Option<ToolSettings>,
    /// Batch execution settings
    pub batch: Option<BatchSettings>,
    /// Output settings
    pub output: Option<OutputSettings>,
    /// Logging settings
    pub logging: Option<LoggingSettings>,
    /// Downmix targets; replaces the built-in table when present
    pub downmix: Option<DownmixGraph>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    /// ffmpeg binary
    pub ffmpeg: Option<PathBuf>,
    /// ffprobe binary
    pub ffprobe: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSettings {
    /// Concurrent ffmpeg processes (1-12)
    pub workers: Option<usize>,
    /// What happens after a failed job
    pub failure_policy: Option<FailurePolicy>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    /// Output directory, relative to the input folder unless absolute
    pub directory: Option<PathBuf>,
    /// Extension of output files
    pub extension: Option<String>,
    /// Regular expression selecting input files
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (pretty, json)
    pub format: Option<LogFormat>,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: ConfigFile = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Generate default configuration file
    pub fn default_config() -> Self {
        let defaults = AppConfig::default();
        Self {
            tools: Some(ToolSettings {
                ffmpeg: Some(defaults.ffmpeg),
                ffprobe: Some(defaults.ffprobe),
            }),
            batch: Some(BatchSettings {
                workers: Some(defaults.workers),
                failure_policy: Some(defaults.failure_policy),
            }),
            output: Some(OutputSettings {
                directory: Some(defaults.output.directory),
                extension: Some(defaults.output.extension),
                pattern: Some(defaults.pattern),
            }),
            logging: Some(LoggingSettings {
                level: defaults.log_level,
                format: Some(defaults.log_format),
            }),
            downmix: Some(defaults.downmix),
        }
    }

    /// Convert to AppConfig
    pub fn into_app_config(self) -> Result<AppConfig> {
        let defaults = AppConfig::default();
        let tools = self.tools.unwrap_or(ToolSettings {
            ffmpeg: None,
            ffprobe: None,
        });
        let batch = self.batch.unwrap_or(BatchSettings {
            workers: None,
            failure_policy: None,
        });
        let output = self.output.unwrap_or(OutputSettings {
            directory: None,
            extension: None,
            pattern: None,
        });

        let config = AppConfig {
            ffmpeg: tools.ffmpeg.unwrap_or(defaults.ffmpeg),
            ffprobe: tools.ffprobe.unwrap_or(defaults.ffprobe),
            workers: batch.workers.unwrap_or(defaults.workers),
            failure_policy: batch.failure_policy.unwrap_or(defaults.failure_policy),
            output: OutputLayout {
                directory: output.directory.unwrap_or(defaults.output.directory),
                extension: output.extension.unwrap_or(defaults.output.extension),
            },
            pattern: output.pattern.unwrap_or(defaults.pattern),
            log_level: self
                .logging
                .as_ref()
                .map(|l| l.level.clone())
                .unwrap_or(defaults.log_level),
            log_format: self
                .logging
                .and_then(|l| l.format)
                .unwrap_or(defaults.log_format),
            downmix: self.downmix.unwrap_or(defaults.downmix),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Generate default configuration file at the specified path
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
    let config = ConfigFile::default_config();
    config.to_file(path)?;
    Ok(())
}
