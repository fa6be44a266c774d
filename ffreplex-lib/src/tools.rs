//! External tool detection

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::process::Command;

use crate::error::{ReplexError, Result};

// helper.
macro_rules! regex {
    ($re:literal $(,)?) => {{
        static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
        RE.get_or_init(|| regex::Regex::new($re).unwrap())
    }};
}

/// A located ffmpeg binary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolInfo {
    pub path: PathBuf,
    pub version: String,
}

/// Extract the version from the first line of `ffmpeg -version`
pub fn parse_ffmpeg_version(output: &str) -> Option<String> {
    let first = output.lines().next()?;
    regex!(r"^ffmpeg\sversion\s(\S+)")
        .captures(first)
        .map(|caps| caps[1].to_string())
}

/// Run `<binary> -version` and check that it is ffmpeg
pub async fn detect_ffmpeg(binary: &Path) -> Result<ToolInfo> {
    let output = Command::new(binary)
        .arg("-version")
        .output()
        .await
        .map_err(|e| ReplexError::Probe {
            tool: binary.display().to_string(),
            exit_code: -1,
            message: format!("failed to run: {}", e),
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !output.status.success() {
        return Err(ReplexError::Probe {
            tool: binary.display().to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let version = parse_ffmpeg_version(&stdout).ok_or_else(|| ReplexError::Probe {
        tool: binary.display().to_string(),
        exit_code: 0,
        message: "unrecognized -version output".to_string(),
    })?;

    tracing::debug!("Found ffmpeg {} at {}", version, binary.display());
    Ok(ToolInfo {
        path: binary.to_path_buf(),
        version,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ffmpeg_version() {
        let out = "ffmpeg version 6.1.1-3ubuntu5 Copyright (c) 2000-2023 the FFmpeg developers\n\
                   built with gcc 13 (Ubuntu 13.2.0-23ubuntu3)\n";
        assert_eq!(parse_ffmpeg_version(out).as_deref(), Some("6.1.1-3ubuntu5"));
        assert_eq!(
            parse_ffmpeg_version("ffmpeg version n7.0 Copyright").as_deref(),
            Some("n7.0")
        );
        assert_eq!(parse_ffmpeg_version("ffprobe version 6.1"), None);
        assert_eq!(parse_ffmpeg_version(""), None);
    }

    #[tokio::test]
    async fn test_detect_missing_binary() {
        let dir = tempfile::tempdir().unwrap();
        let result = detect_ffmpeg(&dir.path().join("ffmpeg")).await;
        assert!(matches!(result, Err(ReplexError::Probe { exit_code: -1, .. })));
    }
}
