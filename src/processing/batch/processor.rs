use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::core::{BatchReport, BatchState, FileOutcome, FileReport, ProcessingConfig, ProgressEvent};
use crate::processing::ImagePipeline;
use crate::utils::{ensure_output_dir, list_source_files, PipelineError, PipelineResult, SourceEntry};
use crate::worker::WorkerPool;

/// Runs the image pipeline over every file of a directory.
///
/// The watermark and configuration are loaded once at construction and shared
/// read-only with every worker. One bad file never stops the batch.
pub struct FolderPipeline {
    pipeline: Arc<ImagePipeline>,
    pool: WorkerPool,
    state: Mutex<BatchState>,
}

impl FolderPipeline {
    /// Loads the watermark and validates `config`.
    pub fn new(watermark_path: impl AsRef<Path>, config: ProcessingConfig) -> PipelineResult<Self> {
        let pipeline = ImagePipeline::new(watermark_path, config)?;
        Ok(Self::from_pipeline(pipeline))
    }

    pub fn from_pipeline(pipeline: ImagePipeline) -> Self {
        let pool = WorkerPool::new(Some(pipeline.config().worker_limit));
        Self {
            pipeline: Arc::new(pipeline),
            pool,
            state: Mutex::new(BatchState::Idle),
        }
    }

    pub fn state(&self) -> BatchState {
        self.state.lock().map(|s| *s).unwrap_or(BatchState::Failed)
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    fn transition(&self, next: BatchState) {
        if let Ok(mut state) = self.state.lock() {
            debug!("Batch state {:?} -> {:?}", *state, next);
            *state = next;
        }
    }

    /// Processes every file in `source_dir` into the configured output directory.
    ///
    /// `progress` is called once per file as it completes, then once more with
    /// `current == total`. Only setup failures are returned as errors; per-file
    /// failures are in the report.
    pub async fn process_folder<P>(&self, source_dir: impl AsRef<Path>, mut progress: P) -> PipelineResult<BatchReport>
    where
        P: FnMut(ProgressEvent),
    {
        let start = Instant::now();
        let source_dir = source_dir.as_ref();
        let out_dir = self.pipeline.config().output_dir.clone();

        self.transition(BatchState::Scanning);
        let entries = match self.prepare(source_dir, &out_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Batch failed before processing: {e}");
                self.transition(BatchState::Failed);
                return Err(e);
            }
        };

        let total = entries.len();
        info!(
            "Processing {total} files from '{}' into '{}' with {} workers",
            source_dir.display(),
            out_dir.display(),
            self.pool.worker_count()
        );
        self.transition(BatchState::Processing);

        let mut reports: Vec<Option<FileReport>> = vec![None; total];
        let mut completed = 0;
        let pipeline = Arc::clone(&self.pipeline);
        let job_out_dir = out_dir.clone();

        self.pool
            .run(
                entries.clone(),
                move |entry: SourceEntry| pipeline.process_entry(&entry, &job_out_dir),
                |index, result| {
                    let entry = &entries[index];
                    let outcome = result.unwrap_or_else(|e| {
                        warn!("Error processing file {}: {e}", entry.file_name);
                        FileOutcome::Failed { error: PipelineError::from(e) }
                    });

                    completed += 1;
                    progress(ProgressEvent::file_completed(
                        completed,
                        total,
                        outcome.produced_path().cloned(),
                        entry.file_name.clone(),
                    ));

                    reports[index] = Some(FileReport {
                        file_name: entry.file_name.clone(),
                        source_path: entry.path.clone(),
                        outcome,
                    });
                },
            )
            .await;

        progress(ProgressEvent::finished(total));
        self.transition(BatchState::Completed);

        let report = BatchReport {
            state: BatchState::Completed,
            files: reports.into_iter().flatten().collect(),
            elapsed_ms: start.elapsed().as_millis() as u64,
        };

        let failed = report.errors().count();
        if failed > 0 {
            warn!("Batch completed with {failed} failed files out of {total}");
        }
        info!(
            "Processing completed in {:?}: {} written, {} skipped, {failed} failed",
            start.elapsed(),
            report.written().count(),
            report.skipped().count()
        );

        Ok(report)
    }

    async fn prepare(&self, source_dir: &Path, out_dir: &Path) -> PipelineResult<Vec<SourceEntry>> {
        let entries = list_source_files(source_dir).await?;
        ensure_output_dir(out_dir).await?;
        Ok(entries)
    }
}
