//! Catalog builder - turns probe records into a categorized, ordered catalog

use std::path::Path;

use crate::audio_plan::layout;
use crate::error::{ReplexError, Result};
use crate::probe::ProbeRecord;
use crate::types::{AudioGroup, Catalog, PlanEntry, Stream};

use super::{analyze_audio_stream, analyze_other_stream, analyze_subtitle_stream, analyze_video_stream};

/// Classify a probe record by its `codec_type`
pub fn classify(record: &ProbeRecord) -> Stream {
    match record.codec_type.as_deref() {
        Some("video") => Stream::Video(analyze_video_stream(record)),
        Some("audio") => Stream::Audio(analyze_audio_stream(record)),
        Some("subtitle") => Stream::Subtitle(analyze_subtitle_stream(record)),
        _ => Stream::Other(analyze_other_stream(record)),
    }
}

/// Build the catalog of a file from its probe records
pub fn build_catalog(path: &Path, records: &[ProbeRecord]) -> Result<Catalog> {
    if records.is_empty() {
        return Err(ReplexError::EmptyCatalog(path.to_path_buf()));
    }

    let mut catalog = Catalog::new(path.to_path_buf());

    for record in records {
        if catalog_contains(&catalog, record.index) {
            return Err(ReplexError::InvalidProbe(format!(
                "duplicate stream index {} in {}",
                record.index,
                path.display()
            )));
        }

        match classify(record) {
            Stream::Video(info) => {
                tracing::debug!(
                    "Found video stream #{}: {}x{} {:?}",
                    info.index,
                    info.width,
                    info.height,
                    info.display_aspect_ratio
                );
                catalog.video_streams.push(info);
            }
            Stream::Audio(info) => {
                tracing::debug!(
                    "Found audio stream #{}: layout={}, language={}",
                    info.index,
                    info.layout,
                    info.language
                );
                let entry = PlanEntry::existing(&info);
                match catalog
                    .audio_groups
                    .iter_mut()
                    .find(|g| g.language == info.language)
                {
                    Some(group) => group.entries.push(entry),
                    None => catalog.audio_groups.push(AudioGroup {
                        language: info.language.clone(),
                        entries: vec![entry],
                    }),
                }
                catalog.audio_streams.push(info);
            }
            Stream::Subtitle(info) => {
                tracing::debug!("Found subtitle stream #{}", info.index);
                catalog.subtitle_streams.push(info);
            }
            Stream::Other(info) => {
                tracing::debug!("Found {} stream #{}", info.codec_type, info.index);
                catalog.other_streams.push(info);
            }
        }
    }

    for group in &mut catalog.audio_groups {
        sort_entries(&mut group.entries);
    }

    Ok(catalog)
}

/// Sort entries best layout first. The sort is stable, so equal layouts keep
/// the order they were pushed in.
pub(crate) fn sort_entries(entries: &mut [PlanEntry]) {
    entries.sort_by(|a, b| layout::compare(&b.target_layout, &a.target_layout));
}

fn catalog_contains(catalog: &Catalog, index: usize) -> bool {
    catalog.video_streams.iter().any(|s| s.index == index)
        || catalog.audio_streams.iter().any(|s| s.index == index)
        || catalog.subtitle_streams.iter().any(|s| s.index == index)
        || catalog.other_streams.iter().any(|s| s.index == index)
}
