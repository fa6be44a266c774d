//! Subtitle and auxiliary stream analysis

use crate::probe::ProbeRecord;
use crate::types::{OtherStream, SubtitleStream};

/// Extract subtitle metadata from a probe record
pub fn analyze_subtitle_stream(record: &ProbeRecord) -> SubtitleStream {
    SubtitleStream {
        index: record.index,
        codec_name: record.codec_name.clone(),
        language: record.tags.language.clone(),
    }
}

/// Attachments, data and anything else ffprobe reports
pub fn analyze_other_stream(record: &ProbeRecord) -> OtherStream {
    OtherStream {
        index: record.index,
        codec_type: record
            .codec_type
            .clone()
            .unwrap_or_else(|| "unknown".to_string()),
        codec_name: record.codec_name.clone(),
    }
}
