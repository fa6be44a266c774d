//! Audio track planning module
//!
//! This module decides what happens to every audio track of a file:
//! - Channel layout quality ranking
//! - Downmix compatibility rules (which layouts can feed which targets)
//! - Per-language planning of missing downmixed tracks
//! - User overrides of the chosen source per track

pub mod downmix;
pub mod layout;
pub mod overrides;
pub mod planner;

pub use downmix::{CompatibilityRule, DownmixGraph, DownmixTarget};
pub use overrides::{TrackChoice, TrackIdentity};
pub use planner::plan_audio_tracks;
