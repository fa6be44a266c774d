//! Audio track planner - determines which audio tracks to keep, drop or generate

use crate::audio_plan::downmix::DownmixGraph;
use crate::audio_plan::layout;
use crate::index::scanner::sort_entries;
use crate::types::{AudioGroup, Catalog, PlanEntry, PlannedCatalog};

/// Plan audio tracks for a catalog.
///
/// For each language group, binds every existing track to the tracks it could
/// be downmixed from, then adds a generable entry for each downmix target the
/// group does not already satisfy. The input catalog is left untouched.
pub fn plan_audio_tracks(catalog: &Catalog, graph: &DownmixGraph) -> PlannedCatalog {
    let audio_groups = catalog
        .audio_groups
        .iter()
        .map(|group| plan_group(group, graph))
        .collect();

    PlannedCatalog {
        source: catalog.clone(),
        audio_groups,
    }
}

fn plan_group(group: &AudioGroup, graph: &DownmixGraph) -> AudioGroup {
    let sources: Vec<(&str, usize)> = group
        .entries
        .iter()
        .filter_map(|e| e.existing_index.map(|i| (e.target_layout.as_str(), i)))
        .collect();

    let mut entries: Vec<PlanEntry> = Vec::with_capacity(group.entries.len() + 2);

    // 1. Existing tracks: any other track of the group may feed a downmix to this layout
    for entry in group.entries.iter().filter(|e| e.is_existing()) {
        let own = entry.existing_index;
        let mut entry = entry.clone();
        entry.candidate_source_indices = graph.compatible_sources(
            &entry.target_layout,
            sources.iter().copied().filter(|(_, i)| Some(*i) != own),
        );
        entries.push(entry);
    }

    // 2. Missing targets: generate from the best compatible track, if any
    for target in graph.generated_targets() {
        if sources.iter().any(|(l, _)| target.is_satisfied_by(l)) {
            continue;
        }

        let candidates = graph.compatible_sources(&target.layout, sources.iter().copied());
        let chosen = layout::best_source(
            sources
                .iter()
                .copied()
                .filter(|(_, i)| candidates.contains(i)),
        );

        match chosen {
            Some(index) => tracing::debug!(
                "[{}] {} will be generated from stream #{}",
                group.language,
                target.layout,
                index
            ),
            None => tracing::debug!(
                "[{}] {} is missing and has no compatible source",
                group.language,
                target.layout
            ),
        }

        entries.push(PlanEntry::generable(
            &group.language,
            &target.layout,
            candidates,
            chosen,
        ));
    }

    // 3. Merge: generable entries land after existing ones of the same layout
    sort_entries(&mut entries);

    AudioGroup {
        language: group.language.clone(),
        entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixtures::{audio, catalog, video};

    fn group<'a>(plan: &'a PlannedCatalog, language: &str) -> &'a [PlanEntry] {
        &plan.audio_group(language).unwrap().entries
    }

    #[test]
    fn test_plan_adds_stereo_from_surround() {
        let catalog = catalog(vec![video(0), audio(1, "5.1", Some("eng")), audio(2, "mono", Some("eng"))]);
        let plan = plan_audio_tracks(&catalog, &DownmixGraph::default());
        let entries = group(&plan, "eng");

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].existing_index, Some(1));
        assert!(entries[0].is_copy());
        assert_eq!(entries[1].target_layout, "stereo");
        assert_eq!(entries[1].existing_index, None);
        assert_eq!(entries[1].chosen_source_index, Some(1));
        assert_eq!(entries[1].candidate_source_indices, vec![1]);
        assert_eq!(entries[2].existing_index, Some(2));
        assert!(entries[2].is_copy());
    }

    #[test]
    fn test_plan_stereo_only_gets_unresolved_surround() {
        let catalog = catalog(vec![audio(1, "stereo", Some("eng"))]);
        let plan = plan_audio_tracks(&catalog, &DownmixGraph::default());
        let entries = group(&plan, "eng");

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].target_layout, "5.1");
        assert!(entries[0].candidate_source_indices.is_empty());
        assert_eq!(entries[0].chosen_source_index, None);
        assert!(entries[0].is_unresolved());
        assert_eq!(entries[1].existing_index, Some(1));
    }

    #[test]
    fn test_no_synthetic_entry_when_target_satisfied() {
        let catalog = catalog(vec![
            audio(1, "downmix", Some("eng")),
            audio(2, "5.1(side)", Some("eng")),
            audio(3, "7.1", Some("fre")),
            audio(4, "stereo", Some("fre")),
        ]);
        let plan = plan_audio_tracks(&catalog, &DownmixGraph::default());

        for entries in [group(&plan, "eng"), group(&plan, "fre")] {
            let synthetic_stereo = entries
                .iter()
                .filter(|e| !e.is_existing() && e.target_layout == "stereo")
                .count();
            assert_eq!(synthetic_stereo, 0);
        }
        assert!(group(&plan, "eng").iter().all(|e| e.is_existing()));

        let fre = group(&plan, "fre");
        let surround = fre.iter().find(|e| !e.is_existing()).unwrap();
        assert_eq!(surround.target_layout, "5.1");
        assert_eq!(surround.chosen_source_index, Some(3));
    }

    #[test]
    fn test_existing_entries_get_candidates_but_not_themselves() {
        let catalog = catalog(vec![
            audio(1, "7.1", Some("eng")),
            audio(2, "5.1", Some("eng")),
            audio(3, "stereo", Some("eng")),
        ]);
        let plan = plan_audio_tracks(&catalog, &DownmixGraph::default());
        let entries = group(&plan, "eng");

        let by_index = |i: usize| entries.iter().find(|e| e.existing_index == Some(i)).unwrap();
        assert!(by_index(1).candidate_source_indices.is_empty());
        assert_eq!(by_index(2).candidate_source_indices, vec![1]);
        assert_eq!(by_index(3).candidate_source_indices, vec![1, 2]);
        assert!(entries.iter().all(|e| e.is_existing()));
    }

    #[test]
    fn test_best_ranked_source_is_chosen() {
        let catalog = catalog(vec![
            audio(1, "5.1", Some("jpn")),
            audio(2, "7.1", Some("jpn")),
            audio(3, "7.1", Some("jpn")),
        ]);
        let plan = plan_audio_tracks(&catalog, &DownmixGraph::default());
        let stereo = group(&plan, "jpn")
            .iter()
            .find(|e| e.target_layout == "stereo")
            .unwrap();
        assert_eq!(stereo.candidate_source_indices, vec![2, 3, 1]);
        assert_eq!(stereo.chosen_source_index, Some(2));
    }

    #[test]
    fn test_synthetic_entries_sorted_by_quality() {
        let catalog = catalog(vec![audio(1, "mono", None), audio(2, "7.1", None)]);
        let plan = plan_audio_tracks(&catalog, &DownmixGraph::default());
        let layouts: Vec<&str> = group(&plan, "und")
            .iter()
            .map(|e| e.target_layout.as_str())
            .collect();
        assert_eq!(layouts, vec!["7.1", "5.1", "stereo", "mono"]);
    }

    #[test]
    fn test_plan_is_idempotent() {
        let catalog = catalog(vec![
            video(0),
            audio(1, "5.1", Some("eng")),
            audio(2, "mono", Some("eng")),
            audio(3, "stereo", Some("ger")),
        ]);
        let graph = DownmixGraph::default();
        let first = plan_audio_tracks(&catalog, &graph);
        let second = plan_audio_tracks(&catalog, &graph);
        assert_eq!(first, second);

        let replanned = plan_audio_tracks(first.source(), &graph);
        assert_eq!(replanned, first);
        assert_eq!(first.source(), &catalog);
    }
}
