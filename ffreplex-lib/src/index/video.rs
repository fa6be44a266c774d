//! Video stream analysis

use crate::probe::ProbeRecord;
use crate::types::VideoStream;

/// Extract video metadata from a probe record
pub fn analyze_video_stream(record: &ProbeRecord) -> VideoStream {
    VideoStream {
        index: record.index,
        codec_name: record.codec_name.clone(),
        width: record.width.unwrap_or(0),
        height: record.height.unwrap_or(0),
        display_aspect_ratio: record
            .display_aspect_ratio
            .clone()
            .filter(|r| r != "0:1"),
    }
}
