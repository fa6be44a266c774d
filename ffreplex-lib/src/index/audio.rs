//! Audio stream analysis

use crate::probe::ProbeRecord;
use crate::types::{AudioStream, UNDEFINED_LANGUAGE, UNKNOWN_LAYOUT};

/// Extract audio metadata from a probe record
pub fn analyze_audio_stream(record: &ProbeRecord) -> AudioStream {
    AudioStream {
        index: record.index,
        codec_name: record.codec_name.clone(),
        layout: get_channel_layout(record),
        channels: record.channels,
        language: get_stream_language(record),
        title: record.tags.title.clone().filter(|t| !t.trim().is_empty()),
    }
}

/// Language tag, or `und` when the stream is untagged
fn get_stream_language(record: &ProbeRecord) -> String {
    record
        .tags
        .language
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_lowercase)
        .unwrap_or_else(|| UNDEFINED_LANGUAGE.to_string())
}

/// Channel layout token, falling back to the usual layout for the channel count
fn get_channel_layout(record: &ProbeRecord) -> String {
    if let Some(layout) = record
        .channel_layout
        .as_deref()
        .filter(|l| !l.is_empty())
    {
        return layout.to_string();
    }

    let fallback = match record.channels {
        Some(1) => "mono",
        Some(2) => "stereo",
        Some(6) => "5.1",
        Some(8) => "7.1",
        _ => UNKNOWN_LAYOUT,
    };
    fallback.to_string()
}
