//! ffreplex
//!
//! Normalizes the audio tracks of a batch of media files. The first file is
//! probed and planned (keep, drop or downmix each track per language), the
//! plan is adjusted with overrides, then ffmpeg runs over every file on a
//! bounded pool of worker slots.

mod cli;
mod config;
mod config_file;
mod console;
mod error;

use std::path::{Path, PathBuf};

use clap::Parser;
use ffreplex_lib::discovery::list_files_excluding;
use ffreplex_lib::tools::detect_ffmpeg;
use ffreplex_lib::{
    load_plan, prepare_jobs, start_batch, BatchEvent, CommandLauncher, ReplexError,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Args, PlanFormat};
use crate::config::{AppConfig, LogFormat};
use crate::config_file::{generate_default_config, ConfigFile};
use crate::error::{AppError, Result};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
const APP_NAME: &str = "ffreplex";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(path) = &args.generate_config {
        generate_default_config(path)?;
        println!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    let config = load_config(&args)?;
    init_logging(&config);

    tracing::info!("{} v{} starting", APP_NAME, VERSION);
    tracing::debug!("Configuration loaded: {:?}", config);

    run(args, config).await
}

/// Config file (explicit path, or `ffreplex.toml` when present), then flags
fn load_config(args: &Args) -> Result<AppConfig> {
    let path = match &args.config {
        Some(path) => Some(path.clone()),
        None => Some(PathBuf::from("ffreplex.toml")).filter(|p| p.exists()),
    };
    let mut config = match path {
        Some(path) => ConfigFile::from_file(&path)?.into_app_config()?,
        None => AppConfig::default(),
    };
    config.apply_args(args);
    config.validate()?;
    Ok(config)
}

/// Initialize logging with tracing
fn init_logging(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "ffreplex={level},ffreplex_lib={level}",
            level = config.log_level
        )
        .into()
    });
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

/// Output directory excluded from discovery, so earlier results are not reprocessed
fn excluded_dir(root: Option<&Path>, config: &AppConfig) -> Option<PathBuf> {
    root.map(|root| root.join(&config.output.directory))
}

async fn run(args: Args, config: AppConfig) -> Result<()> {
    let input = args
        .input
        .clone()
        .ok_or_else(|| AppError::Config("no input given".to_string()))?;
    let input = input
        .canonicalize()
        .map_err(|_| ReplexError::NotFound(input.clone()))?;
    let root = input.is_dir().then(|| input.clone());

    // Tools
    match detect_ffmpeg(&config.ffmpeg).await {
        Ok(info) => tracing::info!("ffmpeg {} ({})", info.version, info.path.display()),
        Err(e) if args.dry_run || args.print_plan.is_some() => {
            tracing::warn!("ffmpeg not usable: {}", e)
        }
        Err(e) => return Err(e.into()),
    }

    // Files
    let pattern = regex::Regex::new(&config.pattern)
        .map_err(|e| AppError::Config(format!("invalid pattern: {}", e)))?;
    let excluded = excluded_dir(root.as_deref(), &config);
    let files = list_files_excluding(&input, &pattern, excluded.as_deref())?;
    let Some(reference) = files.first() else {
        return Err(AppError::NoInput(input));
    };

    // Reference plan
    let mut plan = load_plan(&config.ffprobe, reference, &config.downmix).await?;
    console::apply_overrides(&mut plan, &args.overrides)?;

    match args.print_plan {
        Some(PlanFormat::Json) => {
            println!("{}", serde_json::to_string_pretty(&plan)?);
            return Ok(());
        }
        Some(PlanFormat::Text) => {
            print!("{}", console::render_plan(&plan));
            return Ok(());
        }
        None => {}
    }

    println!(" === FFReplex === \n");
    println!(" === Available downmixes === \n");
    print!("{}", config.downmix);
    println!("\n === Files === \n");
    print!("{}", console::render_header(&files, plan.source()));
    for file in &files {
        println!(" - {}", file.display());
    }
    println!("\n === Plan === \n");
    print!("{}", console::render_plan(&plan));

    // Jobs
    let prepared = prepare_jobs(
        &config.ffprobe,
        &files,
        &plan,
        &config.downmix,
        root.as_deref(),
        &config.output,
    )
    .await;
    for (file, e) in &prepared.excluded {
        println!(" !! {} excluded: {}", file.display(), e);
    }

    if args.dry_run {
        for job in &prepared.jobs {
            println!(" > {} {}", config.ffmpeg.display(), job.command);
        }
        return Ok(());
    }

    let total = prepared.jobs.len();
    let commands: Vec<String> = prepared.jobs.iter().map(|j| j.command.to_string()).collect();
    let mut handle = start_batch(
        prepared.jobs,
        config.batch_options(),
        CommandLauncher::new(&config.ffmpeg),
    );
    tracing::info!(batch = %handle.id(), "Processing {} files on {} slots", total, config.workers);

    let canceller = handle.canceller();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling batch");
            canceller.cancel();
        }
    });

    let mut summary = None;
    while let Some(event) = handle.next_event().await {
        match event {
            BatchEvent::Started { job, slot, attempt } => {
                println!(" === Starting process of file #{} on slot [{}]", job, slot);
                if attempt > 1 {
                    println!("     attempt {}", attempt);
                }
                println!(" > {} {}", config.ffmpeg.display(), commands[job]);
            }
            BatchEvent::Retrying {
                job,
                slot,
                attempt,
                backoff_ms,
            } => {
                println!(
                    " -- Retrying #{} on slot [{}] in {} ms (attempt {})",
                    job, slot, backoff_ms, attempt
                );
            }
            BatchEvent::Completed(report) => {
                tracing::debug!("job {} output:\n{}", report.job, report.output);
                if report.success {
                    println!(" === Done #{}: {}", report.job, report.input.display());
                } else {
                    let tail: Vec<&str> = report.output.lines().rev().take(5).collect();
                    for line in tail.iter().rev() {
                        println!("     {}", line);
                    }
                    println!(
                        " !! Failed #{}: {} (exit code {:?})",
                        report.job,
                        report.input.display(),
                        report.exit_code
                    );
                }
            }
            BatchEvent::Skipped { job, reason, .. } => {
                println!(" -- Skipped #{} ({:?})", job, reason);
            }
            BatchEvent::Drained(s) => {
                println!("\n === FINISHED ===");
                summary = Some(s);
            }
            BatchEvent::Aborted(s) => {
                println!("\n === ABORTED ===");
                summary = Some(s);
            }
        }
    }

    let summary = summary.ok_or_else(|| AppError::Config("batch ended without a summary".to_string()))?;
    println!(
        "{} succeeded, {} failed, {} skipped, {} excluded",
        summary.succeeded,
        summary.failed.len(),
        summary.skipped.len(),
        prepared.excluded.len()
    );

    if summary.is_success() && prepared.excluded.is_empty() {
        Ok(())
    } else {
        Err(AppError::BatchFailed {
            failed: summary.failed.len() + prepared.excluded.len(),
            skipped: summary.skipped.len(),
        })
    }
}
