//! Core types and configuration.
//!
//! This module contains the fundamental types used throughout the crate:
//! - [`ProcessingConfig`]: Immutable per-batch settings
//! - [`ProgressEvent`]: Per-file progress notification
//! - [`BatchReport`]: Result of a batch run

mod config;
mod progress;
mod types;

pub use config::{
    clamp_quality, ProcessingConfig, UnattainablePolicy, WatermarkMode, DEFAULT_OUTPUT_DIR,
    DEFAULT_TARGET_SIZE_KB, DEFAULT_WORKER_LIMIT,
};
pub use progress::ProgressEvent;
pub use types::{BatchReport, BatchState, FileOutcome, FileReport, SkipReason};
