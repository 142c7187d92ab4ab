// This is the command-line entry point. The processing core lives in lib.rs;
// everything here is argument parsing and presentation.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use watermark_batch::{
    FolderPipeline, ImageFormat, ProcessingConfig, ProgressEvent, UnattainablePolicy, WatermarkMode,
};

/// Watermark every image in a folder and re-encode it under a size budget.
#[derive(Parser, Debug)]
#[command(name = "watermark-batch")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory containing the source images
    #[arg(value_name = "SOURCE_DIR")]
    source: PathBuf,

    /// Watermark image (PNG with alpha recommended)
    #[arg(short, long, value_name = "PATH")]
    watermark: PathBuf,

    /// JSON settings file; command-line flags override its values
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Output format: png, jpg (jpeg) or webp
    #[arg(short, long)]
    format: Option<String>,

    /// Encoder quality (clamped to 1-100)
    #[arg(short, long, allow_negative_numbers = true)]
    quality: Option<i32>,

    #[arg(long)]
    max_width: Option<u32>,

    #[arg(long)]
    max_height: Option<u32>,

    /// Output size budget in KB
    #[arg(long)]
    target_kb: Option<u64>,

    /// Watermark fitting: crop or resize
    #[arg(short, long)]
    mode: Option<String>,

    /// Concurrent workers
    #[arg(long)]
    workers: Option<usize>,

    /// Encode at quality 1 instead of skipping files that cannot meet the budget
    #[arg(long, default_value_t = false)]
    force_minimum_quality: bool,

    /// Skip the quality search: lossless WebP, PNG for every other format
    #[arg(long, default_value_t = false)]
    plain: bool,

    /// Never resize beyond the watermark's own dimensions
    #[arg(long, default_value_t = false)]
    clamp_to_watermark: bool,
}

impl Args {
    fn into_config(self) -> anyhow::Result<(PathBuf, PathBuf, ProcessingConfig)> {
        let mut config = match &self.config {
            Some(path) => ProcessingConfig::from_json_file(path)?,
            None => ProcessingConfig::jpg_preset(),
        };

        if let Some(format) = &self.format {
            config.output_format = format.parse::<ImageFormat>()?;
        }
        if let Some(quality) = self.quality {
            config.quality = watermark_batch::core::clamp_quality(quality);
        }
        if let Some(w) = self.max_width {
            config.max_width = w;
        }
        if let Some(h) = self.max_height {
            config.max_height = h;
        }
        if let Some(kb) = self.target_kb {
            config.target_size_kb = kb;
        }
        if let Some(mode) = &self.mode {
            config.watermark_mode = mode.parse::<WatermarkMode>()?;
        }
        if let Some(workers) = self.workers {
            config.worker_limit = workers;
        }
        if let Some(dir) = self.output {
            config.output_dir = dir;
        }
        if self.force_minimum_quality {
            config.on_unattainable = UnattainablePolicy::Minimum;
        }
        if self.plain {
            config.optimize_size = false;
        }
        if self.clamp_to_watermark {
            let (w, h) = image::image_dimensions(&self.watermark)
                .with_context(|| format!("cannot read watermark '{}'", self.watermark.display()))?;
            config = config.clamp_to_watermark(w, h);
        }

        Ok((self.source, self.watermark, config))
    }
}

async fn run(args: Args) -> anyhow::Result<bool> {
    let (source, watermark, config) = args.into_config()?;
    let pipeline = FolderPipeline::new(&watermark, config)
        .with_context(|| format!("cannot start batch with watermark '{}'", watermark.display()))?;

    let report = pipeline
        .process_folder(&source, |event: ProgressEvent| {
            if event.is_final() {
                println!("[{}/{}] done", event.current, event.total);
            } else {
                let produced = event
                    .produced_path
                    .as_ref()
                    .map(|p| format!(" -> {}", p.display()))
                    .unwrap_or_default();
                println!("[{}/{}] {}{produced}", event.current, event.total, event.file_name);
            }
        })
        .await
        .with_context(|| format!("cannot process '{}'", source.display()))?;

    for (file, err) in report.errors() {
        error!("{file}: {err}");
    }
    info!(
        "{} written ({} KB total) in {} ms",
        report.written().count(),
        report.total_output_bytes() / 1024,
        report.elapsed_ms
    );

    Ok(report.errors().next().is_none())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_file(false)         // Remove file path
        .with_line_number(false)  // Remove line numbers
        .with_thread_ids(false)   // Remove thread IDs
        .with_target(false)       // Remove module path
        .with_ansi(true)          // Keep colored output
        .with_writer(std::io::stderr)
        .compact()                // Use compact formatter instead of pretty
        .init();

    match run(Args::parse()).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
