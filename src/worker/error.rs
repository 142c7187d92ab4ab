use crate::utils::PipelineError;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Worker pool is closed: {0}")]
    CapacityError(String),

    #[error("Worker panicked: {0}")]
    Panicked(String),

    #[error("Worker task was lost before reporting")]
    Lost,
}

pub type WorkerResult<T> = Result<T, WorkerError>;

impl From<tokio::sync::AcquireError> for WorkerError {
    fn from(err: tokio::sync::AcquireError) -> Self {
        WorkerError::CapacityError(format!("Failed to acquire worker: {}", err))
    }
}

impl From<tokio::task::JoinError> for WorkerError {
    fn from(err: tokio::task::JoinError) -> Self {
        WorkerError::Panicked(err.to_string())
    }
}

// A dead worker only ever costs its own file.
impl From<WorkerError> for PipelineError {
    fn from(err: WorkerError) -> Self {
        PipelineError::Worker(err.to_string())
    }
}
