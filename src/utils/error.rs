//! Error types for the watermark pipeline.
//!
//! Provides a hierarchy of error types using `thiserror` for ergonomic error handling.
//! Only [`PipelineError::Precondition`], [`PipelineError::UnsupportedFormat`] and
//! [`PipelineError::Validation`] ever escape a batch run; everything else is
//! contained to the file that produced it.

use std::io;
use std::path::PathBuf;
use thiserror::Error;
use serde::Serialize;

/// Validation errors for processing settings.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ValidationError {
    /// A resize bound was zero
    #[error("Invalid bounds {width}x{height}: both dimensions must be positive")]
    Bounds { width: u32, height: u32 },
    /// The size budget was zero
    #[error("Target size must be at least 1 KB")]
    TargetSize,
    /// The worker pool would never admit a task
    #[error("Worker limit must be at least 1")]
    WorkerLimit,
}

/// Main error type for the pipeline.
///
/// Serializable so an external UI can present it however it likes.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PipelineError {
    /// Batch cannot start: unreadable source directory, unloadable watermark,
    /// or an output directory that cannot be created
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Settings rejected before any work started
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Source file could not be decoded
    #[error("Failed to decode '{}': {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    /// Encoder rejected the pixel buffer
    #[error("Failed to encode {format}: {reason}")]
    Encode { format: String, reason: String },

    /// No quality in 1..=100 fits the size budget
    #[error("Could not optimize quality for {format} to fit {target_kb} KB")]
    QualityUnattainable { target_kb: u64, format: String },

    /// Unsupported or invalid image format
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// Crop rectangle does not fit inside the source
    #[error("Cannot crop {target_width}x{target_height} out of {source_width}x{source_height}")]
    InvalidCropDimensions {
        source_width: u32,
        source_height: u32,
        target_width: u32,
        target_height: u32,
    },

    /// File IO error
    #[error("IO error: {0}")]
    Io(String),

    /// The worker running this file died before reporting
    #[error("Worker error: {0}")]
    Worker(String),
}

/// Convenience result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

// Helper methods for error creation
impl PipelineError {
    pub fn precondition<T: Into<String>>(msg: T) -> Self {
        Self::Precondition(msg.into())
    }

    pub fn decode(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn encode(format: impl ToString, reason: impl ToString) -> Self {
        Self::Encode {
            format: format.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn unsupported_format<T: Into<String>>(format: T) -> Self {
        Self::UnsupportedFormat(format.into())
    }

    /// Whether this error aborts a whole batch rather than a single file.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Precondition(_) | Self::Validation(_) | Self::UnsupportedFormat(_)
        )
    }
}

// Convert std::io::Error to PipelineError
impl From<io::Error> for PipelineError {
    fn from(err: io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
