//! Command synthesis - turns a finalized plan into ffmpeg stream mappings

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::audio_plan::DownmixGraph;
use crate::error::{ReplexError, Result};
use crate::types::{PlanEntry, PlannedCatalog};

/// Codec name ffmpeg uses for stream copy
pub const COPY_CODEC: &str = "copy";

/// Output stream category, in the order outputs are allocated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Video,
    Audio,
    Subtitle,
    Other,
}

impl StreamKind {
    fn slot(self) -> usize {
        match self {
            StreamKind::Video => 0,
            StreamKind::Audio => 1,
            StreamKind::Subtitle => 2,
            StreamKind::Other => 3,
        }
    }

    fn specifier(self) -> Option<&'static str> {
        match self {
            StreamKind::Video => Some("v"),
            StreamKind::Audio => Some("a"),
            StreamKind::Subtitle => Some("s"),
            StreamKind::Other => None,
        }
    }
}

/// One output stream: where it comes from and how it is encoded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamMapping {
    pub kind: StreamKind,
    pub input_index: usize,
    /// Position among all output streams
    pub output_index: usize,
    /// Position among output streams of the same kind
    pub kind_index: usize,
    pub codec: String,
    pub filter: Option<String>,
    pub title: Option<String>,
}

impl StreamMapping {
    pub fn is_copy(&self) -> bool {
        self.codec == COPY_CODEC && self.filter.is_none()
    }

    /// Stream specifier for per-output options, e.g. `a:2`
    fn output_specifier(&self) -> String {
        match self.kind.specifier() {
            Some(kind) => format!("{}:{}", kind, self.kind_index),
            None => self.output_index.to_string(),
        }
    }

    fn push_args(&self, args: &mut Vec<String>) {
        let spec = self.output_specifier();
        args.push("-map".to_string());
        args.push(format!("0:{}", self.input_index));
        args.push(format!("-c:{}", spec));
        args.push(self.codec.clone());
        if let Some(filter) = &self.filter {
            args.push(format!("-filter:{}", spec));
            args.push(filter.clone());
        }
        if let Some(title) = &self.title {
            args.push(format!("-metadata:s:{}", spec));
            args.push(format!("title={}", title));
        }
    }
}

/// A complete ffmpeg invocation for one input file (without the binary)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Command {
    pub input: PathBuf,
    pub output: PathBuf,
    pub mappings: Vec<StreamMapping>,
}

impl Command {
    /// Serialized ffmpeg arguments, one `-map` per output stream in output order
    pub fn to_args(&self) -> Vec<String> {
        let mut args: Vec<String> = ["-hide_banner", "-nostdin", "-y", "-i"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.push(self.input.to_string_lossy().into_owned());
        for mapping in &self.mappings {
            mapping.push_args(&mut args);
        }
        args.push(self.output.to_string_lossy().into_owned());
        args
    }

    pub fn filter_count(&self) -> usize {
        self.mappings.iter().filter(|m| m.filter.is_some()).count()
    }

    pub fn mappings_of(&self, kind: StreamKind) -> impl Iterator<Item = &StreamMapping> {
        self.mappings.iter().filter(move |m| m.kind == kind)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self
            .to_args()
            .into_iter()
            .map(|a| {
                if a.is_empty() || a.contains(char::is_whitespace) || a.contains('|') {
                    format!("'{}'", a)
                } else {
                    a
                }
            })
            .collect();
        write!(f, "{}", args.join(" "))
    }
}

/// One file-level unit of work for the scheduler
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Job {
    pub input: PathBuf,
    pub command: Command,
}

impl Job {
    pub fn new(command: Command) -> Self {
        Self {
            input: command.input.clone(),
            command,
        }
    }

    pub fn output(&self) -> &Path {
        &self.command.output
    }
}

/// Where output files go
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLayout {
    /// Output directory, relative to the batch root (or to the input's
    /// directory for single files) unless absolute
    pub directory: PathBuf,
    /// Extension of output files, without the dot
    pub extension: String,
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("ffreplex"),
            extension: "mkv".to_string(),
        }
    }
}

/// Derive the output path of `input`: same base name, configured extension.
///
/// Inputs found under `root` keep their sub-directory inside the output directory.
pub fn output_path_for(input: &Path, root: Option<&Path>, layout: &OutputLayout) -> PathBuf {
    let file_name = input
        .file_stem()
        .map(|s| {
            let mut name = s.to_os_string();
            name.push(".");
            name.push(&layout.extension);
            name
        })
        .unwrap_or_else(|| format!("output.{}", layout.extension).into());

    let input_dir = input.parent().unwrap_or_else(|| Path::new(""));
    let target_dir = match root.and_then(|r| input_dir.strip_prefix(r).ok().map(|rel| (r, rel))) {
        Some((root, relative)) => root.join(&layout.directory).join(relative),
        None => input_dir.join(&layout.directory),
    };

    target_dir.join(file_name)
}

#[derive(Default)]
struct OutputCounter {
    next: usize,
    per_kind: [usize; 4],
}

impl OutputCounter {
    fn push(
        &mut self,
        mappings: &mut Vec<StreamMapping>,
        kind: StreamKind,
        input_index: usize,
        codec: &str,
        filter: Option<&str>,
        title: Option<String>,
    ) {
        let kind_index = self.per_kind[kind.slot()];
        mappings.push(StreamMapping {
            kind,
            input_index,
            output_index: self.next,
            kind_index,
            codec: codec.to_string(),
            filter: filter.map(|f| f.to_string()),
            title,
        });
        self.next += 1;
        self.per_kind[kind.slot()] += 1;
    }
}

/// Build the ffmpeg command writing `plan` applied to `input` into `output`.
///
/// Pure: nothing is launched. Fails with `UnresolvedDownmix` when an entry
/// asks for a downmix the graph cannot produce.
pub fn synthesize(
    input: &Path,
    output: &Path,
    plan: &PlannedCatalog,
    graph: &DownmixGraph,
) -> Result<Command> {
    let catalog = plan.source();
    let mut counter = OutputCounter::default();
    let mut mappings = Vec::with_capacity(catalog.stream_count() + 2);

    for video in &catalog.video_streams {
        counter.push(&mut mappings, StreamKind::Video, video.index, COPY_CODEC, None, None);
    }

    for entry in plan.entries() {
        let Some(source) = entry.chosen_source_index else {
            continue;
        };

        if entry.existing_index == Some(source) {
            counter.push(&mut mappings, StreamKind::Audio, source, COPY_CODEC, None, None);
            continue;
        }

        let (filter, codec) = resolve_downmix(plan, graph, entry, source)?;
        counter.push(
            &mut mappings,
            StreamKind::Audio,
            source,
            codec,
            Some(filter),
            Some(format!("{} (downmix)", entry.target_layout)),
        );
    }

    for subtitle in &catalog.subtitle_streams {
        counter.push(&mut mappings, StreamKind::Subtitle, subtitle.index, COPY_CODEC, None, None);
    }

    for other in &catalog.other_streams {
        counter.push(&mut mappings, StreamKind::Other, other.index, COPY_CODEC, None, None);
    }

    Ok(Command {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        mappings,
    })
}

fn resolve_downmix<'g>(
    plan: &PlannedCatalog,
    graph: &'g DownmixGraph,
    entry: &PlanEntry,
    source: usize,
) -> Result<(&'g str, &'g str)> {
    let unresolved = |layout: &str| ReplexError::UnresolvedDownmix {
        target: entry.target_layout.clone(),
        source_index: source,
        source_layout: layout.to_string(),
    };

    let stream = plan
        .source()
        .audio_stream(source)
        .ok_or_else(|| unresolved("not an audio stream"))?;
    let rule = graph
        .resolve(&entry.target_layout, &stream.layout)
        .ok_or_else(|| unresolved(&stream.layout))?;

    Ok((rule.filter.as_str(), rule.codec.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_plan::{plan_audio_tracks, TrackIdentity};
    use crate::tests::fixtures::{audio, catalog, other, subtitle, video};

    fn plan_for(records: Vec<crate::probe::ProbeRecord>) -> PlannedCatalog {
        plan_audio_tracks(&catalog(records), &DownmixGraph::default())
    }

    fn synth(plan: &PlannedCatalog) -> Result<Command> {
        synthesize(
            Path::new("/media/in.mkv"),
            Path::new("/media/ffreplex/in.mkv"),
            plan,
            &DownmixGraph::default(),
        )
    }

    #[test]
    fn test_copy_only_plan_has_no_filters() {
        let mut plan = plan_for(vec![
            video(0),
            audio(1, "stereo", Some("eng")),
            audio(2, "5.1", Some("eng")),
            subtitle(3, Some("eng")),
        ]);
        // Skip the generable entries so every remaining one is a verbatim copy
        let generated: Vec<TrackIdentity> = plan
            .entries()
            .filter(|e| !e.is_existing())
            .map(TrackIdentity::of)
            .collect();
        for identity in &generated {
            plan.set_track_choice(identity, None).unwrap();
        }

        let command = synth(&plan).unwrap();
        assert_eq!(command.filter_count(), 0);
        assert!(command.mappings.iter().all(StreamMapping::is_copy));
        assert_eq!(command.mappings.len(), 4);
    }

    #[test]
    fn test_output_order_and_indices() {
        let plan = plan_for(vec![
            subtitle(0, None),
            audio(1, "stereo", Some("eng")),
            video(2),
            other(3, "attachment"),
            audio(4, "5.1", Some("fre")),
            video(5),
        ]);
        let command = synth(&plan).unwrap();

        let kinds: Vec<(StreamKind, usize)> = command
            .mappings
            .iter()
            .map(|m| (m.kind, m.input_index))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (StreamKind::Video, 2),
                (StreamKind::Video, 5),
                (StreamKind::Audio, 1),
                (StreamKind::Audio, 4),
                (StreamKind::Audio, 4),
                (StreamKind::Subtitle, 0),
                (StreamKind::Other, 3),
            ]
        );
        for (i, mapping) in command.mappings.iter().enumerate() {
            assert_eq!(mapping.output_index, i);
        }
        let audio_kind: Vec<usize> = command
            .mappings_of(StreamKind::Audio)
            .map(|m| m.kind_index)
            .collect();
        assert_eq!(audio_kind, vec![0, 1, 2]);
    }

    #[test]
    fn test_dropped_and_unresolved_entries_emit_nothing() {
        let mut plan = plan_for(vec![audio(1, "stereo", Some("eng")), audio(2, "mono", Some("eng"))]);
        plan.set_track_choice(&TrackIdentity::Existing(2), None).unwrap();

        let command = synth(&plan).unwrap();
        assert_eq!(command.mappings.len(), 1);
        assert_eq!(command.mappings[0].input_index, 1);
        assert_eq!(command.mappings[0].output_index, 0);
    }

    #[test]
    fn test_unresolved_downmix_is_an_error() {
        let mut plan = plan_for(vec![audio(1, "stereo", Some("eng")), audio(2, "mono", Some("eng"))]);
        let surround = TrackIdentity::Generated {
            language: "eng".to_string(),
            target_layout: "5.1".to_string(),
        };
        plan.set_track_choice(&surround, Some(1)).unwrap();
        match synth(&plan) {
            Err(ReplexError::UnresolvedDownmix {
                target,
                source_index,
                source_layout,
            }) => {
                assert_eq!(target, "5.1");
                assert_eq!(source_index, 1);
                assert_eq!(source_layout, "stereo");
            }
            other => panic!("expected UnresolvedDownmix, got {:?}", other),
        }

        plan.set_track_choice(&surround, Some(99)).unwrap();
        assert!(matches!(synth(&plan), Err(ReplexError::UnresolvedDownmix { .. })));
    }

    #[test]
    fn test_to_args() {
        let plan = plan_for(vec![video(0), audio(1, "5.1", Some("eng")), other(2, "attachment")]);
        let command = synth(&plan).unwrap();
        let args = command.to_args();
        let graph = DownmixGraph::default();
        let rule = graph.resolve("stereo", "5.1").unwrap();

        let expected: Vec<String> = [
            "-hide_banner", "-nostdin", "-y", "-i", "/media/in.mkv",
            "-map", "0:0", "-c:v:0", "copy",
            "-map", "0:1", "-c:a:0", "copy",
            "-map", "0:1", "-c:a:1", rule.codec.as_str(), "-filter:a:1", rule.filter.as_str(),
            "-metadata:s:a:1", "title=stereo (downmix)",
            "-map", "0:2", "-c:3", "copy",
            "/media/ffreplex/in.mkv",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        assert_eq!(args, expected);
        assert_eq!(args.iter().filter(|a| *a == "-map").count(), 4);
        assert!(command.to_string().contains("'pan=stereo|"));
    }

    #[test]
    fn test_output_path_for() {
        let layout = OutputLayout::default();
        assert_eq!(
            output_path_for(Path::new("/media/show/s01/e01.mkv"), Some(Path::new("/media/show")), &layout),
            PathBuf::from("/media/show/ffreplex/s01/e01.mkv")
        );
        assert_eq!(
            output_path_for(Path::new("/media/movie.mkv"), None, &layout),
            PathBuf::from("/media/ffreplex/movie.mkv")
        );
        let absolute = OutputLayout {
            directory: PathBuf::from("/out"),
            extension: "mka".to_string(),
        };
        assert_eq!(
            output_path_for(Path::new("/media/show/s01/e01.mkv"), Some(Path::new("/media/show")), &absolute),
            PathBuf::from("/out/s01/e01.mka")
        );
    }
}
