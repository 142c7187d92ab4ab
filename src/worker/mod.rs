mod pool;
mod error;

pub use pool::{WorkerPool, DEFAULT_WORKERS};
pub use error::{WorkerError, WorkerResult};
