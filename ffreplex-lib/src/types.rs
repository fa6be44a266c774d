use std::path::{Path, PathBuf};

use serde::Serialize;

/// Language key used for audio streams without a language tag
pub const UNDEFINED_LANGUAGE: &str = "und";

/// Layout token used for audio streams without a channel layout
pub const UNKNOWN_LAYOUT: &str = "unknown";

/// Video stream information
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoStream {
    pub index: usize,
    pub codec_name: Option<String>,
    pub width: u32,
    pub height: u32,
    pub display_aspect_ratio: Option<String>,
}

/// Audio stream information
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioStream {
    pub index: usize,
    pub codec_name: Option<String>,
    /// Channel layout token, e.g. "5.1(side)"
    pub layout: String,
    pub channels: Option<u32>,
    pub language: String,
    pub title: Option<String>,
}

impl AudioStream {
    /// Human readable label: the title when tagged, else layout and codec
    pub fn label(&self) -> String {
        match &self.title {
            Some(title) => title.clone(),
            None => match &self.codec_name {
                Some(codec) => format!("#{} {} {}", self.index, codec, self.layout),
                None => format!("#{} {}", self.index, self.layout),
            },
        }
    }
}

/// Subtitle stream information
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubtitleStream {
    pub index: usize,
    pub codec_name: Option<String>,
    pub language: Option<String>,
}

/// Any stream that is not video, audio or subtitle (attachments, data)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OtherStream {
    pub index: usize,
    pub codec_type: String,
    pub codec_name: Option<String>,
}

/// One track of the source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Stream {
    Video(VideoStream),
    Audio(AudioStream),
    Subtitle(SubtitleStream),
    Other(OtherStream),
}

impl Stream {
    pub fn index(&self) -> usize {
        match self {
            Stream::Video(v) => v.index,
            Stream::Audio(a) => a.index,
            Stream::Subtitle(s) => s.index,
            Stream::Other(o) => o.index,
        }
    }
}

/// One audio output decision: keep, generate from another track, or drop.
///
/// `existing_index` is set for tracks present in the input. `chosen_source_index`
/// is the input stream this output is produced from: equal to `existing_index`
/// means copy, another index means downmix, `None` means drop or do not generate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanEntry {
    pub target_layout: String,
    pub language: String,
    pub title: Option<String>,
    pub existing_index: Option<usize>,
    pub chosen_source_index: Option<usize>,
    pub candidate_source_indices: Vec<usize>,
}

impl PlanEntry {
    /// Entry for a track present in the input, initially kept as-is
    pub fn existing(stream: &AudioStream) -> Self {
        Self {
            target_layout: stream.layout.clone(),
            language: stream.language.clone(),
            title: stream.title.clone(),
            existing_index: Some(stream.index),
            chosen_source_index: Some(stream.index),
            candidate_source_indices: Vec::new(),
        }
    }

    /// Entry for a track that can be derived from one of `candidates`
    pub fn generable(
        language: &str,
        target_layout: &str,
        candidates: Vec<usize>,
        chosen: Option<usize>,
    ) -> Self {
        Self {
            target_layout: target_layout.to_string(),
            language: language.to_string(),
            title: None,
            existing_index: None,
            chosen_source_index: chosen,
            candidate_source_indices: candidates,
        }
    }

    pub fn is_existing(&self) -> bool {
        self.existing_index.is_some()
    }

    /// The track is written as a verbatim copy
    pub fn is_copy(&self) -> bool {
        self.existing_index.is_some() && self.chosen_source_index == self.existing_index
    }

    /// The track is produced through a downmix of another stream
    pub fn is_downmix(&self) -> bool {
        self.chosen_source_index.is_some() && self.chosen_source_index != self.existing_index
    }

    /// The track is dropped (existing) or not generated (generable)
    pub fn is_dropped(&self) -> bool {
        self.chosen_source_index.is_none()
    }

    /// A generable track with no compatible source in its language group
    pub fn is_unresolved(&self) -> bool {
        self.existing_index.is_none() && self.candidate_source_indices.is_empty()
    }
}

/// Audio entries of one language, best layout first
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioGroup {
    pub language: String,
    pub entries: Vec<PlanEntry>,
}

/// Categorized snapshot of all streams of one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Catalog {
    pub source_path: PathBuf,
    pub video_streams: Vec<VideoStream>,
    /// Language groups in first-encounter order
    pub audio_groups: Vec<AudioGroup>,
    /// All audio streams in input order
    pub audio_streams: Vec<AudioStream>,
    pub subtitle_streams: Vec<SubtitleStream>,
    pub other_streams: Vec<OtherStream>,
}

impl Catalog {
    pub fn new(source_path: PathBuf) -> Self {
        Self {
            source_path,
            video_streams: Vec::new(),
            audio_groups: Vec::new(),
            audio_streams: Vec::new(),
            subtitle_streams: Vec::new(),
            other_streams: Vec::new(),
        }
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn primary_video(&self) -> Option<&VideoStream> {
        self.video_streams.first()
    }

    pub fn audio_stream(&self, index: usize) -> Option<&AudioStream> {
        self.audio_streams.iter().find(|a| a.index == index)
    }

    pub fn audio_group(&self, language: &str) -> Option<&AudioGroup> {
        self.audio_groups.iter().find(|g| g.language == language)
    }

    pub fn stream_count(&self) -> usize {
        self.video_streams.len()
            + self.audio_streams.len()
            + self.subtitle_streams.len()
            + self.other_streams.len()
    }
}

/// A catalog extended with generable audio entries.
///
/// The only mutation path is the override sink (`set_track_choice`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedCatalog {
    pub(crate) source: Catalog,
    pub(crate) audio_groups: Vec<AudioGroup>,
}

impl PlannedCatalog {
    /// The immutable catalog this plan was derived from
    pub fn source(&self) -> &Catalog {
        &self.source
    }

    pub fn audio_groups(&self) -> &[AudioGroup] {
        &self.audio_groups
    }

    pub fn audio_group(&self, language: &str) -> Option<&AudioGroup> {
        self.audio_groups.iter().find(|g| g.language == language)
    }

    /// All audio entries, group by group, in output order
    pub fn entries(&self) -> impl Iterator<Item = &PlanEntry> {
        self.audio_groups.iter().flat_map(|g| g.entries.iter())
    }

    /// Whether any entry requires a downmix
    pub fn requires_transcoding(&self) -> bool {
        self.entries().any(PlanEntry::is_downmix)
    }
}
