use std::path::{Path, PathBuf};

use crate::audio_plan::{plan_audio_tracks, DownmixGraph, TrackIdentity};
use crate::error::{ReplexError, Result};
use crate::index::build_catalog;
use crate::probe::probe_file;
use crate::transcode::{output_path_for, synthesize, Job, OutputLayout};
use crate::types::PlannedCatalog;

/// Probe a file and compute its default audio plan
pub async fn load_plan(ffprobe: &Path, path: &Path, graph: &DownmixGraph) -> Result<PlannedCatalog> {
    let records = probe_file(ffprobe, path).await?;
    let catalog = build_catalog(path, &records)?;
    Ok(plan_audio_tracks(&catalog, graph))
}

/// Carry the track selections the user changed on `reference` over to
/// another file's plan.
///
/// Tracks are matched by identity. Entries still at their default are left
/// alone, so each file keeps its own best source. A changed selection is
/// applied only when the target entry offers it as a choice; otherwise the
/// target's default stays in place.
pub fn transfer_choices(
    reference: &PlannedCatalog,
    graph: &DownmixGraph,
    target: &mut PlannedCatalog,
) {
    let defaults = plan_audio_tracks(reference.source(), graph);

    for entry in reference.entries() {
        let identity = TrackIdentity::of(entry);
        let default = defaults.entry(&identity).map(|e| e.chosen_source_index);
        if default == Some(entry.chosen_source_index) {
            continue;
        }

        let offered = target
            .choices(&identity)
            .map(|choices| choices.iter().any(|c| c.source_index() == entry.chosen_source_index))
            .unwrap_or(false);
        if !offered {
            tracing::debug!(
                "{}: selection {} not applicable",
                target.source().source_path().display(),
                identity
            );
            continue;
        }
        // The identity was found just above, so this cannot fail
        let _ = target.apply_override(&identity, entry.chosen_source_index);
    }
}

/// Build the job for one file from its plan, with the reference selections applied
pub fn job_for_plan(
    mut plan: PlannedCatalog,
    reference: &PlannedCatalog,
    graph: &DownmixGraph,
    root: Option<&Path>,
    layout: &OutputLayout,
) -> Result<Job> {
    transfer_choices(reference, graph, &mut plan);
    let input = plan.source().source_path().to_path_buf();
    let output = output_path_for(&input, root, layout);
    let command = synthesize(&input, &output, &plan, graph)?;
    Ok(Job::new(command))
}

/// Jobs ready to run, and the files left out with the reason
#[derive(Debug, Default)]
pub struct PreparedBatch {
    pub jobs: Vec<Job>,
    pub excluded: Vec<(PathBuf, ReplexError)>,
}

/// Probe, plan and synthesize every file of a batch.
///
/// A file that cannot be probed or synthesized is excluded with a warning;
/// the others proceed.
pub async fn prepare_jobs(
    ffprobe: &Path,
    files: &[PathBuf],
    reference: &PlannedCatalog,
    graph: &DownmixGraph,
    root: Option<&Path>,
    layout: &OutputLayout,
) -> PreparedBatch {
    let mut batch = PreparedBatch::default();

    for file in files {
        let plan = if file.as_path() == reference.source().source_path() {
            Ok(reference.clone())
        } else {
            load_plan(ffprobe, file, graph).await
        };

        match plan.and_then(|plan| job_for_plan(plan, reference, graph, root, layout)) {
            Ok(job) => batch.jobs.push(job),
            Err(e) => {
                tracing::warn!("Skipping {}: {}", file.display(), e);
                batch.excluded.push((file.clone(), e));
            }
        }
    }

    tracing::info!(
        "Prepared {} jobs ({} files excluded)",
        batch.jobs.len(),
        batch.excluded.len()
    );
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixtures::{audio, catalog_at, video};
    use crate::transcode::StreamKind;

    fn plan(path: &str, records: Vec<crate::probe::ProbeRecord>) -> PlannedCatalog {
        plan_audio_tracks(&catalog_at(path, records), &DownmixGraph::default())
    }

    #[test]
    fn test_transfer_choices() {
        let mut reference = plan(
            "/m/a.mkv",
            vec![video(0), audio(1, "5.1", Some("eng")), audio(2, "mono", Some("eng"))],
        );
        reference
            .set_track_choice(&TrackIdentity::Existing(2), None)
            .unwrap();

        let mut other = plan(
            "/m/b.mkv",
            vec![video(0), audio(1, "5.1", Some("eng")), audio(2, "mono", Some("eng"))],
        );
        transfer_choices(&reference, &DownmixGraph::default(), &mut other);
        assert!(other.entry(&TrackIdentity::Existing(2)).unwrap().is_dropped());
        assert_eq!(other.source().source_path(), Path::new("/m/b.mkv"));
    }

    #[test]
    fn test_transfer_ignores_missing_tracks() {
        let mut reference = plan(
            "/m/a.mkv",
            vec![audio(1, "7.1", Some("eng")), audio(2, "5.1", Some("eng"))],
        );
        let stereo = TrackIdentity::Generated {
            language: "eng".to_string(),
            target_layout: "stereo".to_string(),
        };
        reference.set_track_choice(&stereo, Some(2)).unwrap();

        // Same identity, but stream 2 is not audio in this file
        let mut other = plan("/m/b.mkv", vec![audio(1, "7.1", Some("eng")), video(2)]);
        transfer_choices(&reference, &DownmixGraph::default(), &mut other);
        assert_eq!(other.entry(&stereo).unwrap().chosen_source_index, Some(1));
    }

    #[test]
    fn test_defaults_follow_each_file_stream_order() {
        let graph = DownmixGraph::default();
        let reference = plan(
            "/m/a.mkv",
            vec![video(0), audio(1, "5.1", Some("eng")), audio(2, "stereo", Some("fre"))],
        );
        let other = plan(
            "/m/b.mkv",
            vec![video(0), audio(1, "stereo", Some("fre")), audio(2, "5.1", Some("eng"))],
        );

        let job = job_for_plan(other, &reference, &graph, None, &OutputLayout::default()).unwrap();
        let generated: Vec<usize> = job
            .command
            .mappings_of(StreamKind::Audio)
            .filter(|m| m.filter.is_some())
            .map(|m| m.input_index)
            .collect();
        assert_eq!(generated, vec![2]);
    }

    #[test]
    fn test_changed_selection_needs_a_matching_source() {
        let graph = DownmixGraph::default();
        let stereo = TrackIdentity::Generated {
            language: "eng".to_string(),
            target_layout: "stereo".to_string(),
        };
        let mut reference = plan(
            "/m/a.mkv",
            vec![
                audio(1, "7.1", Some("eng")),
                audio(2, "5.1", Some("eng")),
                audio(3, "5.1", Some("fre")),
            ],
        );
        reference.set_track_choice(&stereo, Some(2)).unwrap();

        // Same layout, so the English 5.1 is still a candidate
        let mut same = plan(
            "/m/b.mkv",
            vec![
                audio(1, "7.1", Some("eng")),
                audio(2, "5.1", Some("eng")),
                audio(3, "5.1", Some("fre")),
            ],
        );
        transfer_choices(&reference, &graph, &mut same);
        assert_eq!(same.entry(&stereo).unwrap().chosen_source_index, Some(2));

        // Stream 2 is the French track here: never a source for eng:stereo
        let mut swapped = plan(
            "/m/c.mkv",
            vec![
                audio(1, "7.1", Some("eng")),
                audio(2, "5.1", Some("fre")),
                audio(3, "5.1", Some("eng")),
            ],
        );
        transfer_choices(&reference, &graph, &mut swapped);
        assert_eq!(swapped.entry(&stereo).unwrap().chosen_source_index, Some(1));
    }

    #[test]
    fn test_job_for_plan() {
        let reference = plan("/m/show/s1/a.mkv", vec![video(0), audio(1, "5.1", Some("eng"))]);
        let job = job_for_plan(
            reference.clone(),
            &reference,
            &DownmixGraph::default(),
            Some(Path::new("/m/show")),
            &OutputLayout::default(),
        )
        .unwrap();
        assert_eq!(job.input, PathBuf::from("/m/show/s1/a.mkv"));
        assert_eq!(job.output(), Path::new("/m/show/ffreplex/s1/a.mkv"));
        assert_eq!(job.command.filter_count(), 1);
    }

    #[tokio::test]
    async fn test_prepare_jobs_excludes_failing_files() {
        let dir = tempfile::tempdir().unwrap();
        let reference_path = dir.path().join("a.mkv");
        let reference = plan(
            reference_path.to_str().unwrap(),
            vec![video(0), audio(1, "stereo", Some("eng"))],
        );
        let missing = dir.path().join("gone.mkv");

        let batch = prepare_jobs(
            Path::new("ffprobe"),
            &[reference_path.clone(), missing.clone()],
            &reference,
            &DownmixGraph::default(),
            Some(dir.path()),
            &OutputLayout::default(),
        )
        .await;

        assert_eq!(batch.jobs.len(), 1);
        assert_eq!(batch.jobs[0].input, reference_path);
        assert_eq!(batch.excluded.len(), 1);
        assert_eq!(batch.excluded[0].0, missing);
        assert!(matches!(batch.excluded[0].1, ReplexError::NotFound(_)));
    }
}
