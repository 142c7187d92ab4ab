//! Core types for per-file outcomes and batch reports.

use std::path::PathBuf;
use serde::Serialize;
use crate::utils::PipelineError;

/// Lifecycle of one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchState {
    #[default]
    Idle,
    Scanning,
    Processing,
    Completed,
    /// Setup failed before any file was attempted
    Failed,
}

/// Why a directory entry was not processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    WatermarkFile,
    UnsupportedExtension(String),
}

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum FileOutcome {
    Written {
        path: PathBuf,
        quality: u8,
        size_bytes: u64,
    },
    Skipped {
        reason: SkipReason,
    },
    Failed {
        error: PipelineError,
    },
}

impl FileOutcome {
    pub fn produced_path(&self) -> Option<&PathBuf> {
        match self {
            Self::Written { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Outcome of one file, tagged with its name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub file_name: String,
    pub source_path: PathBuf,
    pub outcome: FileOutcome,
}

/// Result of a batch run.
///
/// Contains one [`FileReport`] per directory entry, in source order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub state: BatchState,
    pub files: Vec<FileReport>,
    /// Total wall-clock time for the batch in milliseconds
    pub elapsed_ms: u64,
}

impl BatchReport {
    pub fn written(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|f| matches!(f.outcome, FileOutcome::Written { .. }))
    }

    pub fn skipped(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|f| matches!(f.outcome, FileOutcome::Skipped { .. }))
    }

    /// Failed files with their errors
    pub fn errors(&self) -> impl Iterator<Item = (&str, &PipelineError)> {
        self.files.iter().filter_map(|f| match &f.outcome {
            FileOutcome::Failed { error } => Some((f.file_name.as_str(), error)),
            _ => None,
        })
    }

    /// Bytes written across all outputs
    pub fn total_output_bytes(&self) -> u64 {
        self.files
            .iter()
            .filter_map(|f| match f.outcome {
                FileOutcome::Written { size_bytes, .. } => Some(size_bytes),
                _ => None,
            })
            .sum()
    }
}
