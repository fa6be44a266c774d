pub(crate) mod api;
pub mod audio_plan;
pub mod discovery;
pub(crate) mod error;
pub mod index;
pub mod probe;
pub mod tools;
pub mod transcode;
pub mod types;

#[cfg(test)]
pub(crate) mod tests;

pub use api::*;
pub use audio_plan::{
    plan_audio_tracks, CompatibilityRule, DownmixGraph, DownmixTarget, TrackChoice, TrackIdentity,
};
pub use error::{ReplexError, Result};
pub use index::build_catalog;
pub use transcode::{
    start_batch, synthesize, BatchEvent, BatchHandle, BatchOptions, BatchSummary, CommandLauncher,
    FailurePolicy, Job, OutputLayout,
};
pub use types::{Catalog, PlanEntry, PlannedCatalog};
