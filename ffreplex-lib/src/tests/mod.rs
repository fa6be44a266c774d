//! Integration testing module
//!
//! End-to-end tests for the planning and batch pipeline:
//! - Probe output to catalog and plan
//! - Overrides and command synthesis
//! - Batch execution with an in-memory launcher
