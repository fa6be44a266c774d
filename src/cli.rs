//! Command line arguments

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::LogFormat;

/// Normalize the audio tracks of media files: keep, drop or downmix per
/// language, then run ffmpeg over the whole batch.
#[derive(Parser, Debug, Clone)]
#[command(name = "ffreplex")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// File or folder to process. The first file found is the reference
    /// whose plan is applied to the whole batch.
    #[arg(required_unless_present = "generate_config")]
    pub input: Option<PathBuf>,

    /// TOML configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of concurrent ffmpeg processes (1-12).
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=12))]
    pub workers: Option<u8>,

    /// ffmpeg binary.
    #[arg(long)]
    pub ffmpeg: Option<PathBuf>,

    /// ffprobe binary.
    #[arg(long)]
    pub ffprobe: Option<PathBuf>,

    /// Output directory, relative to the input folder unless absolute.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Regular expression selecting input files in a folder.
    #[arg(short, long)]
    pub pattern: Option<String>,

    /// Track override, repeatable: `<index>=<source|none>` for an existing
    /// track, `<lang>:<layout>=<source|none>` for a generable one.
    #[arg(short = 's', long = "set", value_name = "TRACK=SOURCE")]
    pub overrides: Vec<String>,

    /// What to do when a job fails.
    #[arg(long, value_enum)]
    pub on_failure: Option<FailureMode>,

    /// Extra attempts for `--on-failure retry`.
    #[arg(long, default_value_t = 2)]
    pub retries: u32,

    /// Print the commands instead of running them.
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Print the plan of the reference file in this format and exit.
    #[arg(long, value_enum)]
    pub print_plan: Option<PlanFormat>,

    /// Log output format.
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Write a default configuration file to this path and exit.
    #[arg(long, value_name = "PATH")]
    pub generate_config: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    Continue,
    HaltSlot,
    Retry,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanFormat {
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args() {
        let args = Args::try_parse_from([
            "ffreplex",
            "/media/show",
            "-w",
            "6",
            "--set",
            "3=none",
            "--set",
            "eng:stereo=1",
            "--on-failure",
            "halt-slot",
            "-n",
        ])
        .unwrap();
        assert_eq!(args.input, Some(PathBuf::from("/media/show")));
        assert_eq!(args.workers, Some(6));
        assert_eq!(args.overrides, vec!["3=none", "eng:stereo=1"]);
        assert_eq!(args.on_failure, Some(FailureMode::HaltSlot));
        assert!(args.dry_run);
        assert_eq!(args.retries, 2);
    }

    #[test]
    fn test_worker_range() {
        assert!(Args::try_parse_from(["ffreplex", "a.mkv", "-w", "0"]).is_err());
        assert!(Args::try_parse_from(["ffreplex", "a.mkv", "-w", "13"]).is_err());
        assert!(Args::try_parse_from(["ffreplex", "a.mkv", "-w", "12"]).is_ok());
    }

    #[test]
    fn test_input_required() {
        assert!(Args::try_parse_from(["ffreplex"]).is_err());
        let args = Args::try_parse_from(["ffreplex", "--generate-config", "x.toml"]).unwrap();
        assert!(args.input.is_none());
    }
}
