//! ffprobe adapter
//!
//! Runs `ffprobe -show_streams` on a file and deserializes the stream records.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::error::{ReplexError, Result};

/// Stream tags we care about
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeTags {
    pub language: Option<String>,
    pub title: Option<String>,
}

/// One stream record as printed by `ffprobe -print_format json -show_streams`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeRecord {
    pub index: usize,
    pub codec_type: Option<String>,
    pub codec_name: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub display_aspect_ratio: Option<String>,
    pub channel_layout: Option<String>,
    pub channels: Option<u32>,
    #[serde(default)]
    pub tags: ProbeTags,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    streams: Option<Vec<ProbeRecord>>,
}

/// Parse ffprobe JSON output into stream records
pub fn parse_probe_output(data: &[u8]) -> Result<Vec<ProbeRecord>> {
    let output: ProbeOutput = serde_json::from_slice(data)
        .map_err(|e| ReplexError::InvalidProbe(format!("malformed ffprobe output: {}", e)))?;
    output
        .streams
        .ok_or_else(|| ReplexError::InvalidProbe("missing \"streams\" array".to_string()))
}

/// Check that the path names an existing regular file
pub fn ensure_regular_file(path: &Path) -> Result<()> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => Ok(()),
        _ => Err(ReplexError::NotFound(path.to_path_buf())),
    }
}

/// Probe a file with the given ffprobe binary
pub async fn probe_file(ffprobe: &Path, path: &Path) -> Result<Vec<ProbeRecord>> {
    ensure_regular_file(path)?;

    tracing::debug!("Probing file: {}", path.display());

    let output = Command::new(ffprobe)
        .args(["-v", "quiet", "-print_format", "json", "-show_streams"])
        .arg(path)
        .output()
        .await
        .map_err(|e| ReplexError::Probe {
            tool: ffprobe.display().to_string(),
            exit_code: -1,
            message: format!("failed to run: {}", e),
        })?;

    if !output.status.success() {
        return Err(ReplexError::Probe {
            tool: ffprobe.display().to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let records = parse_probe_output(&output.stdout)?;
    if records.is_empty() {
        return Err(ReplexError::EmptyCatalog(path.to_path_buf()));
    }

    tracing::debug!("{} streams in {}", records.len(), path.display());
    Ok(records)
}
