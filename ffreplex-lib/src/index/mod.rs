//! Stream indexing module
//!
//! Builds a per-file catalog from probed stream records:
//! - Video streams in input order
//! - Audio streams grouped by language, best layout first
//! - Subtitle and auxiliary streams kept by index

pub mod audio;
pub mod scanner;
pub mod subtitle;
pub mod video;

pub use audio::analyze_audio_stream;
pub use scanner::build_catalog;
pub use subtitle::{analyze_other_stream, analyze_subtitle_stream};
pub use video::analyze_video_stream;
