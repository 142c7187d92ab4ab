use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::worker::{WorkerError, WorkerResult};

pub const DEFAULT_WORKERS: usize = 4;

/// Bounded pool running blocking jobs, at most `worker_count` at a time.
///
/// Every item gets its own task; a semaphore permit is taken before the job
/// starts and released when it ends, whatever the outcome. Completions are
/// reported on the calling task, one at a time, in completion order.
#[derive(Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    active_workers: Arc<AtomicUsize>,
    peak_workers: Arc<AtomicUsize>,
    worker_count: usize,
}

impl WorkerPool {
    pub fn new(worker_count: Option<usize>) -> Self {
        let worker_count = worker_count.unwrap_or(DEFAULT_WORKERS).max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(worker_count)),
            active_workers: Arc::new(AtomicUsize::new(0)),
            peak_workers: Arc::new(AtomicUsize::new(0)),
            worker_count,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn active_workers(&self) -> usize {
        self.active_workers.load(Ordering::SeqCst)
    }

    /// Highest number of jobs seen running at once
    pub fn peak_workers(&self) -> usize {
        self.peak_workers.load(Ordering::SeqCst)
    }

    /// Runs `job` over every item and calls `on_complete(index, result)` once per item.
    ///
    /// Returns only after every job has finished and released its permit. A
    /// panicking job is reported as [`WorkerError::Panicked`] for its own item;
    /// siblings keep running.
    pub async fn run<T, R, F, C>(&self, items: Vec<T>, job: F, mut on_complete: C)
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> R + Send + Sync + 'static,
        C: FnMut(usize, WorkerResult<R>),
    {
        let job = Arc::new(job);
        let mut pending: BTreeSet<usize> = (0..items.len()).collect();
        let mut tasks = JoinSet::new();
        debug!("Queueing {} jobs on {} workers", items.len(), self.worker_count);

        for (index, item) in items.into_iter().enumerate() {
            let semaphore = Arc::clone(&self.semaphore);
            let active = Arc::clone(&self.active_workers);
            let peak = Arc::clone(&self.peak_workers);
            let job = Arc::clone(&job);

            tasks.spawn(async move {
                let permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => return (index, Err(WorkerError::from(e))),
                };
                let running = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(running, Ordering::SeqCst);

                let result = tokio::task::spawn_blocking(move || job(item))
                    .await
                    .map_err(WorkerError::from);

                active.fetch_sub(1, Ordering::SeqCst);
                drop(permit);
                (index, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => {
                    pending.remove(&index);
                    on_complete(index, result);
                }
                Err(e) => warn!("Worker task failed to join: {e}"),
            }
        }

        for index in pending {
            on_complete(index, Err(WorkerError::Lost));
        }
    }
}
