use std::path::PathBuf;
use serde::Serialize;

/// Per-file progress notification handed to the caller's callback.
///
/// Emitted once per completed file (success, skip or failure) and once more
/// at the end of the batch with `current == total` and no file attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    /// Number of files completed so far
    pub current: usize,
    /// Number of files in the batch
    pub total: usize,
    /// Output written for the file that just completed, if any
    pub produced_path: Option<PathBuf>,
    /// Name of the file that just completed; empty on the final event
    pub file_name: String,
}

impl ProgressEvent {
    pub fn file_completed(current: usize, total: usize, produced_path: Option<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            current,
            total,
            produced_path,
            file_name: file_name.into(),
        }
    }

    /// The closing `total/total` event.
    pub fn finished(total: usize) -> Self {
        Self {
            current: total,
            total,
            produced_path: None,
            file_name: String::new(),
        }
    }

    /// Progress percentage (0-100)
    pub fn percentage(&self) -> usize {
        if self.total > 0 {
            (self.current * 100) / self.total
        } else {
            100
        }
    }

    pub fn is_final(&self) -> bool {
        self.current == self.total && self.file_name.is_empty()
    }
}
