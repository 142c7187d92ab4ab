// Module declarations in dependency order
pub mod utils;
pub mod core;
pub mod processing;
pub mod worker;

// Public exports for external consumers
pub use crate::core::{
    BatchReport, BatchState, FileOutcome, FileReport, ProcessingConfig, ProgressEvent, SkipReason,
    UnattainablePolicy, WatermarkMode,
};
pub use processing::{FolderPipeline, ImagePipeline};
pub use utils::{ImageFormat, PipelineError, PipelineResult, ValidationError};

// This library file is the public API. The CLI in main.rs is one thin consumer of it.
