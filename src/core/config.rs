//! Processing configuration, snapshotted once per batch run.

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::utils::{ImageFormat, PipelineError, PipelineResult};

pub const DEFAULT_MAX_DIMENSION: u32 = 1200;
pub const DEFAULT_TARGET_SIZE_KB: u64 = 100;
pub const DEFAULT_WORKER_LIMIT: usize = 4;
pub const DEFAULT_OUTPUT_DIR: &str = "Images_watermarked";

/// How the watermark is fit onto a target of different size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatermarkMode {
    /// Center-crop an oversized watermark; upscale a smaller one
    #[default]
    Crop,
    /// Always stretch the watermark to the target size
    Resize,
}

impl std::str::FromStr for WatermarkMode {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "crop" => Ok(Self::Crop),
            "resize" => Ok(Self::Resize),
            other => Err(PipelineError::precondition(format!("Unknown watermark mode: {other}"))),
        }
    }
}

/// What to do with a file whose size budget cannot be met at any quality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnattainablePolicy {
    /// Report the file as failed and write nothing
    #[default]
    Skip,
    /// Encode at quality 1 and log a warning
    Minimum,
}

/// Settings for one batch run.
///
/// Build with [`ProcessingConfig::new`] or one of the presets so the quality
/// is clamped and the format normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessingConfig {
    pub max_width: u32,
    pub max_height: u32,
    pub output_format: ImageFormat,
    /// Encoder quality (1-100). Used as-is for PNG; lossy formats search for their own.
    #[serde(deserialize_with = "de_clamped_quality")]
    pub quality: u8,
    #[serde(rename = "targetSizeKB")]
    pub target_size_kb: u64,
    pub watermark_mode: WatermarkMode,
    pub worker_limit: usize,
    pub output_dir: PathBuf,
    pub on_unattainable: UnattainablePolicy,
    /// When false, files are written losslessly (WebP) or as PNG with no quality search.
    pub optimize_size: bool,
}

impl ProcessingConfig {
    /// Creates a config, normalizing the format name and clamping quality to 1..=100.
    pub fn new(max_width: u32, max_height: u32, format: &str, quality: i32) -> PipelineResult<Self> {
        Ok(Self {
            max_width,
            max_height,
            output_format: format.parse()?,
            quality: clamp_quality(quality),
            target_size_kb: DEFAULT_TARGET_SIZE_KB,
            watermark_mode: WatermarkMode::default(),
            worker_limit: DEFAULT_WORKER_LIMIT,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            on_unattainable: UnattainablePolicy::default(),
            optimize_size: true,
        })
    }

    pub fn webp_preset() -> Self {
        Self {
            output_format: ImageFormat::WebP,
            quality: 85,
            ..Self::default()
        }
    }

    pub fn jpg_preset() -> Self {
        Self {
            output_format: ImageFormat::JPEG,
            quality: 80,
            ..Self::default()
        }
    }

    pub fn with_max_size(mut self, width: u32, height: u32) -> Self {
        self.max_width = width;
        self.max_height = height;
        self
    }

    pub fn with_target_size_kb(mut self, kb: u64) -> Self {
        self.target_size_kb = kb;
        self
    }

    pub fn with_watermark_mode(mut self, mode: WatermarkMode) -> Self {
        self.watermark_mode = mode;
        self
    }

    pub fn with_worker_limit(mut self, workers: usize) -> Self {
        self.worker_limit = workers;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_unattainable_policy(mut self, policy: UnattainablePolicy) -> Self {
        self.on_unattainable = policy;
        self
    }

    pub fn with_size_optimization(mut self, enabled: bool) -> Self {
        self.optimize_size = enabled;
        self
    }

    /// Caps the resize bounds at the watermark's dimensions.
    ///
    /// Outputs larger than the watermark would only ever see an upscaled one.
    pub fn clamp_to_watermark(mut self, watermark_width: u32, watermark_height: u32) -> Self {
        self.max_width = self.max_width.min(watermark_width);
        self.max_height = self.max_height.min(watermark_height);
        self
    }

    /// Loads settings from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::precondition(format!("Cannot read settings '{}': {e}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            PipelineError::precondition(format!("Invalid settings '{}': {e}", path.display()))
        })
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_DIMENSION,
            max_height: DEFAULT_MAX_DIMENSION,
            output_format: ImageFormat::PNG,
            quality: 75,
            target_size_kb: DEFAULT_TARGET_SIZE_KB,
            watermark_mode: WatermarkMode::default(),
            worker_limit: DEFAULT_WORKER_LIMIT,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            on_unattainable: UnattainablePolicy::default(),
            optimize_size: true,
        }
    }
}

pub fn clamp_quality(quality: i32) -> u8 {
    quality.clamp(1, 100) as u8
}

fn de_clamped_quality<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = i32::deserialize(deserializer)?;
    Ok(clamp_quality(raw))
}
