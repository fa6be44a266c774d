//! Console front end: plan rendering and override parsing

use std::fmt::Write;
use std::path::PathBuf;

use ffreplex_lib::types::AudioStream;
use ffreplex_lib::{Catalog, PlanEntry, PlannedCatalog, TrackChoice, TrackIdentity};

use crate::error::{AppError, Result};

/// File count and primary video summary
pub fn render_header(files: &[PathBuf], catalog: &Catalog) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} files - {}",
        files.len(),
        catalog.source_path().display()
    );
    match catalog.primary_video() {
        Some(v) => {
            let _ = writeln!(
                out,
                "Video : {} streams - {}x{} | {}",
                catalog.video_streams.len(),
                v.width,
                v.height,
                v.display_aspect_ratio.as_deref().unwrap_or("?")
            );
        }
        None => {
            let _ = writeln!(out, "Video : none");
        }
    }
    out
}

fn stream_label(catalog: &Catalog, index: usize) -> String {
    catalog
        .audio_stream(index)
        .map(AudioStream::label)
        .unwrap_or_else(|| format!("#{}", index))
}

fn describe_choice(catalog: &Catalog, entry: &PlanEntry, choice: &TrackChoice) -> String {
    match choice {
        TrackChoice::Keep(index) => format!("KEEP | {}", stream_label(catalog, *index)),
        TrackChoice::GenerateFrom(index) => {
            format!("GENERATE FROM | {}", stream_label(catalog, *index))
        }
        TrackChoice::Remove => match entry.existing_index {
            Some(index) => format!("REMOVE | {}", stream_label(catalog, index)),
            None => "REMOVE".to_string(),
        },
        TrackChoice::DoNotGenerate => "DO NOT GENERATE".to_string(),
    }
}

/// The current selection of an entry, as one of its choices
fn current_choice(entry: &PlanEntry) -> TrackChoice {
    match (entry.chosen_source_index, entry.existing_index) {
        (Some(chosen), Some(existing)) if chosen == existing => TrackChoice::Keep(chosen),
        (Some(chosen), _) => TrackChoice::GenerateFrom(chosen),
        (None, Some(_)) => TrackChoice::Remove,
        (None, None) => TrackChoice::DoNotGenerate,
    }
}

/// One block per language, one line per track with its selection and the
/// other available choices
pub fn render_plan(plan: &PlannedCatalog) -> String {
    let catalog = plan.source();
    let mut out = String::new();

    for group in plan.audio_groups() {
        let _ = writeln!(out, "{}", group.language.to_uppercase());
        for entry in &group.entries {
            let identity = TrackIdentity::of(entry);
            let current = current_choice(entry);
            let _ = write!(
                out,
                "  {:<16} {:<14} {}",
                entry.target_layout,
                format!("[{}]", identity),
                describe_choice(catalog, entry, &current)
            );
            if entry.is_unresolved() {
                let _ = write!(out, " (no compatible source)");
            }
            let _ = writeln!(out);

            let others: Vec<String> = plan
                .choices(&identity)
                .unwrap_or_default()
                .iter()
                .filter(|c| **c != current)
                .map(|c| describe_choice(catalog, entry, c))
                .collect();
            if !others.is_empty() {
                let _ = writeln!(out, "  {:<16} {:<14} or: {}", "", "", others.join(", "));
            }
        }
    }
    out
}

/// Parse `<index>=<source|none>` or `<lang>:<layout>=<source|none>`
pub fn parse_override(input: &str) -> Result<(TrackIdentity, Option<usize>)> {
    let invalid = |reason: &str| AppError::Override {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let (track, source) = input
        .split_once('=')
        .ok_or_else(|| invalid("expected TRACK=SOURCE"))?;
    let track = track.trim();
    let source = source.trim();

    let identity = match track.parse::<usize>() {
        Ok(index) => TrackIdentity::Existing(index),
        Err(_) => {
            let (language, layout) = track
                .split_once(':')
                .ok_or_else(|| invalid("track must be a stream index or LANG:LAYOUT"))?;
            if language.is_empty() || layout.is_empty() {
                return Err(invalid("track must be a stream index or LANG:LAYOUT"));
            }
            TrackIdentity::Generated {
                language: language.to_lowercase(),
                target_layout: layout.to_string(),
            }
        }
    };

    let source = match source.to_lowercase().as_str() {
        "none" | "remove" | "skip" => None,
        other => Some(
            other
                .parse::<usize>()
                .map_err(|_| invalid("source must be a stream index or none"))?,
        ),
    };

    Ok((identity, source))
}

/// Apply command line overrides; only choices offered for the track are accepted
pub fn apply_overrides(plan: &mut PlannedCatalog, overrides: &[String]) -> Result<()> {
    for input in overrides {
        let (identity, source) = parse_override(input)?;
        let choices = plan.choices(&identity)?;
        if !choices.iter().any(|c| c.source_index() == source) {
            return Err(AppError::Override {
                input: input.clone(),
                reason: format!(
                    "not a choice for {} (available: {})",
                    identity,
                    choices
                        .iter()
                        .map(|c| c
                            .source_index()
                            .map(|i| i.to_string())
                            .unwrap_or_else(|| "none".to_string()))
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            });
        }
        tracing::info!("Override {} -> {}", identity, source.map_or("none".to_string(), |s| s.to_string()));
        plan.set_track_choice(&identity, source)?;
    }
    Ok(())
}
