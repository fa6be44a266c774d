//! Transcoding module
//!
//! Turns finalized plans into ffmpeg invocations and runs them:
//! - Command synthesis (stream mappings, downmix filters, output paths)
//! - Process launching
//! - Round-robin batch scheduling over worker slots

pub mod command;
pub mod process;
pub mod scheduler;

pub use command::{output_path_for, synthesize, Command, Job, OutputLayout, StreamKind, StreamMapping};
pub use process::{CommandLauncher, ProcessLauncher, ProcessOutcome};
pub use scheduler::{
    distribute, start_batch, BatchCanceller, BatchEvent, BatchHandle, BatchOptions, BatchSummary,
    FailurePolicy, JobReport, SkipReason,
};
