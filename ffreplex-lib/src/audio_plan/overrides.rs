//! Plan overrides
//!
//! The only way to change a plan once it exists: pin the source a track is
//! produced from, or drop it. Front ends list the available choices with
//! [`PlannedCatalog::choices`] and apply the selection with
//! [`PlannedCatalog::set_track_choice`].

use std::fmt;

use serde::Serialize;

use crate::error::{ReplexError, Result};
use crate::types::{PlanEntry, PlannedCatalog};

/// Stable identity of a planned audio track
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum TrackIdentity {
    /// A track present in the input, by stream index
    Existing(usize),
    /// A generable track, by language group and target layout
    Generated {
        language: String,
        target_layout: String,
    },
}

impl TrackIdentity {
    pub fn of(entry: &PlanEntry) -> Self {
        match entry.existing_index {
            Some(index) => TrackIdentity::Existing(index),
            None => TrackIdentity::Generated {
                language: entry.language.clone(),
                target_layout: entry.target_layout.clone(),
            },
        }
    }

    fn matches(&self, entry: &PlanEntry) -> bool {
        match self {
            TrackIdentity::Existing(index) => entry.existing_index == Some(*index),
            TrackIdentity::Generated {
                language,
                target_layout,
            } => {
                entry.existing_index.is_none()
                    && &entry.language == language
                    && &entry.target_layout == target_layout
            }
        }
    }
}

impl fmt::Display for TrackIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackIdentity::Existing(index) => write!(f, "#{}", index),
            TrackIdentity::Generated {
                language,
                target_layout,
            } => write!(f, "{}:{}", language, target_layout),
        }
    }
}

/// One option a front end offers for a track
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TrackChoice {
    /// Copy the existing track unchanged
    Keep(usize),
    /// Produce the track by downmixing this source stream
    GenerateFrom(usize),
    /// Drop the existing track
    Remove,
    /// Skip a generable track
    DoNotGenerate,
}

impl TrackChoice {
    /// Source index this choice writes into the plan
    pub fn source_index(&self) -> Option<usize> {
        match self {
            TrackChoice::Keep(index) | TrackChoice::GenerateFrom(index) => Some(*index),
            TrackChoice::Remove | TrackChoice::DoNotGenerate => None,
        }
    }
}

impl PlannedCatalog {
    pub fn entry(&self, identity: &TrackIdentity) -> Option<&PlanEntry> {
        self.entries().find(|e| identity.matches(e))
    }

    /// Overwrite the chosen source of one track. Last write wins; no other
    /// field and no ordering changes.
    pub fn apply_override(
        &mut self,
        identity: &TrackIdentity,
        source_index: Option<usize>,
    ) -> Result<()> {
        let entry = self
            .audio_groups
            .iter_mut()
            .flat_map(|g| g.entries.iter_mut())
            .find(|e| identity.matches(e))
            .ok_or_else(|| ReplexError::TrackNotFound(identity.to_string()))?;

        tracing::debug!(
            "Override {}: {:?} -> {:?}",
            identity,
            entry.chosen_source_index,
            source_index
        );
        entry.chosen_source_index = source_index;
        Ok(())
    }

    /// Front-end entry point for a track selection
    pub fn set_track_choice(
        &mut self,
        identity: &TrackIdentity,
        source_index: Option<usize>,
    ) -> Result<()> {
        self.apply_override(identity, source_index)
    }

    /// Choices to present for a track: keep (existing only), one generate
    /// option per compatible source, then remove / do not generate.
    pub fn choices(&self, identity: &TrackIdentity) -> Result<Vec<TrackChoice>> {
        let entry = self
            .entry(identity)
            .ok_or_else(|| ReplexError::TrackNotFound(identity.to_string()))?;

        let mut choices = Vec::with_capacity(entry.candidate_source_indices.len() + 2);
        if let Some(index) = entry.existing_index {
            choices.push(TrackChoice::Keep(index));
        }
        choices.extend(
            entry
                .candidate_source_indices
                .iter()
                .map(|i| TrackChoice::GenerateFrom(*i)),
        );
        choices.push(if entry.is_existing() {
            TrackChoice::Remove
        } else {
            TrackChoice::DoNotGenerate
        });
        Ok(choices)
    }
}
