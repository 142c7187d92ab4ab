//! Per-file pipeline: decode → fit → watermark → quality search → encode → write.
//!
//! Everything here is blocking and runs on tokio's blocking thread pool when
//! driven by the folder pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use image::{DynamicImage, GenericImageView};
use tracing::{debug, warn};

use crate::core::{FileOutcome, ProcessingConfig, SkipReason, UnattainablePolicy};
use crate::utils::{
    extract_filename, is_supported_input, output_path_for, validate_config, ImageFormat,
    PipelineError, PipelineResult, SourceEntry,
};

use super::codec;
use super::compositor::blend;
use super::geometry::fit_resize;
use super::optimizer::{optimize_quality, QualityChoice, MIN_QUALITY};

/// An encoded image ready to be written.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    /// Container of `bytes`; differs from the configured format only for plain saves
    pub format: ImageFormat,
    pub quality: u8,
    pub width: u32,
    pub height: u32,
}

/// Watermark plus settings, shared read-only by every worker of a batch.
#[derive(Debug, Clone)]
pub struct ImagePipeline {
    watermark: Arc<DynamicImage>,
    watermark_name: String,
    config: Arc<ProcessingConfig>,
}

impl ImagePipeline {
    /// Validates `config` and loads the watermark.
    ///
    /// Both are batch preconditions: nothing runs if either fails.
    pub fn new(watermark_path: impl AsRef<Path>, config: ProcessingConfig) -> PipelineResult<Self> {
        let watermark_path = watermark_path.as_ref();
        validate_config(&config)?;

        let watermark = codec::decode(watermark_path).map_err(|e| {
            PipelineError::precondition(format!("Error loading watermark: {e}"))
        })?;
        debug!(
            "Loaded watermark '{}': {}x{}",
            watermark_path.display(),
            watermark.width(),
            watermark.height()
        );

        Ok(Self::assemble(watermark, extract_filename(watermark_path), config))
    }

    /// Builds a pipeline around an already decoded watermark.
    ///
    /// `config` goes through the same validation as [`ImagePipeline::new`].
    pub fn from_parts(watermark: DynamicImage, watermark_name: impl Into<String>, config: ProcessingConfig) -> PipelineResult<Self> {
        validate_config(&config)?;
        Ok(Self::assemble(watermark, watermark_name, config))
    }

    fn assemble(watermark: DynamicImage, watermark_name: impl Into<String>, config: ProcessingConfig) -> Self {
        Self {
            watermark: Arc::new(watermark),
            watermark_name: watermark_name.into(),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    /// Entries sharing the watermark's file name are never processed.
    ///
    /// Matches on name only, so a same-named file in another directory is skipped too.
    pub fn is_watermark_file(&self, file_name: &str) -> bool {
        !self.watermark_name.is_empty() && file_name == self.watermark_name
    }

    /// Resizes and watermarks an already decoded image.
    pub fn compose(&self, image: DynamicImage) -> PipelineResult<DynamicImage> {
        let cfg = &self.config;
        let (orig_w, orig_h) = image.dimensions();
        let image = fit_resize(image, cfg.max_width, cfg.max_height);
        let (width, height) = image.dimensions();
        if (width, height) != (orig_w, orig_h) {
            debug!("Resized image from {orig_w}x{orig_h} to {width}x{height}");
        }

        blend(&image, &self.watermark, cfg.watermark_mode)
    }

    /// Resizes, watermarks and encodes an already decoded image.
    pub fn render(&self, image: DynamicImage) -> PipelineResult<EncodedImage> {
        let cfg = &self.config;
        let composite = self.compose(image)?;
        let (width, height) = composite.dimensions();

        let (bytes, format, quality) = if cfg.optimize_size {
            let quality = self.choose_quality(&composite)?;
            (codec::encode(&composite, quality, cfg.output_format)?, cfg.output_format, quality)
        } else {
            let (bytes, format) = codec::encode_plain(&composite, cfg.output_format)?;
            (bytes, format, cfg.quality)
        };

        Ok(EncodedImage {
            bytes,
            format,
            quality,
            width,
            height,
        })
    }

    fn choose_quality(&self, composite: &DynamicImage) -> PipelineResult<u8> {
        let cfg = &self.config;
        match optimize_quality(composite, cfg.output_format, cfg.target_size_kb) {
            Ok(QualityChoice { quality, probes, .. }) => {
                debug!("Optimized quality: {quality} after {probes} probes");
                Ok(quality)
            }
            Err(PipelineError::QualityUnattainable { target_kb, format })
                if cfg.on_unattainable == UnattainablePolicy::Minimum =>
            {
                warn!("Could not fit {format} into {target_kb} KB, falling back to quality {MIN_QUALITY}");
                Ok(MIN_QUALITY)
            }
            Err(e) => Err(e),
        }
    }

    /// Processes one source file into `out_dir`, returning the written path.
    pub fn process_file(&self, source: &Path, out_dir: &Path) -> PipelineResult<(PathBuf, EncodedImage)> {
        let image = codec::decode(source)?;
        let encoded = self.render(image)?;

        let output_path = output_path_for(source, out_dir, encoded.format);
        std::fs::write(&output_path, &encoded.bytes)?;

        let size_kb = encoded.bytes.len() as u64 / 1024;
        if self.config.optimize_size && encoded.format.is_lossy() && size_kb > self.config.target_size_kb {
            warn!(
                "'{}' is {size_kb} KB, over the {} KB budget",
                output_path.display(),
                self.config.target_size_kb
            );
        }
        debug!(
            "Image saved to {} ({size_kb} KB, quality {})",
            output_path.display(),
            encoded.quality
        );

        Ok((output_path, encoded))
    }

    /// Classifies a directory entry and processes it if eligible.
    ///
    /// Never fails: every error is folded into [`FileOutcome::Failed`].
    pub fn process_entry(&self, entry: &SourceEntry, out_dir: &Path) -> FileOutcome {
        if self.is_watermark_file(&entry.file_name) {
            debug!("Skipping watermark file {}", entry.file_name);
            return FileOutcome::Skipped {
                reason: SkipReason::WatermarkFile,
            };
        }

        if !is_supported_input(&entry.path) {
            let ext = entry
                .path
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default();
            debug!("Skipping file {}: unsupported extension '{ext}'", entry.file_name);
            return FileOutcome::Skipped {
                reason: SkipReason::UnsupportedExtension(ext),
            };
        }

        match self.process_file(&entry.path, out_dir) {
            Ok((path, encoded)) => FileOutcome::Written {
                path,
                quality: encoded.quality,
                size_bytes: encoded.bytes.len() as u64,
            },
            Err(error) => {
                warn!("Error processing file {}: {error}", entry.file_name);
                FileOutcome::Failed { error }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ImageFormat;
    use image::{Rgba, RgbaImage};

    fn watermark() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(100, 100, |x, _| {
            if x < 50 { Rgba([255, 255, 255, 255]) } else { Rgba([0, 0, 0, 0]) }
        }))
    }

    fn source(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 120, 255])
        }))
    }

    #[test]
    fn render_resizes_before_watermarking() {
        let cfg = ProcessingConfig::default().with_max_size(60, 60);
        let pipeline = ImagePipeline::from_parts(watermark(), "wm.png", cfg).unwrap();
        let encoded = pipeline.render(source(120, 90)).unwrap();
        assert_eq!((encoded.width, encoded.height), (60, 45));

        let decoded = image::load_from_memory(&encoded.bytes).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (60, 45));
        // Left edge is covered by the opaque part of the cropped watermark.
        assert_eq!(decoded.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn unattainable_budget_respects_policy() {
        let cfg = ProcessingConfig::jpg_preset().with_target_size_kb(1);
        let big = source(1000, 1000);

        let skip = ImagePipeline::from_parts(watermark(), "wm.png", cfg.clone()).unwrap();
        let err = skip.render(big.clone()).unwrap_err();
        assert_eq!(err, PipelineError::QualityUnattainable { target_kb: 1, format: "jpg".into() });

        let minimum = ImagePipeline::from_parts(
            watermark(),
            "wm.png",
            cfg.with_unattainable_policy(UnattainablePolicy::Minimum),
        )
        .unwrap();
        let encoded = minimum.render(big).unwrap();
        assert_eq!(encoded.quality, MIN_QUALITY);
    }

    #[test]
    fn entries_are_classified() {
        let dir = tempfile::TempDir::new().unwrap();
        let pipeline = ImagePipeline::from_parts(watermark(), "watermark.png", ProcessingConfig::default()).unwrap();

        let wm_entry = SourceEntry { path: dir.path().join("watermark.png"), file_name: "watermark.png".into() };
        assert_eq!(
            pipeline.process_entry(&wm_entry, dir.path()),
            FileOutcome::Skipped { reason: SkipReason::WatermarkFile }
        );

        let txt = SourceEntry { path: dir.path().join("notes.txt"), file_name: "notes.txt".into() };
        assert_eq!(
            pipeline.process_entry(&txt, dir.path()),
            FileOutcome::Skipped { reason: SkipReason::UnsupportedExtension("txt".into()) }
        );

        let missing = SourceEntry { path: dir.path().join("gone.png"), file_name: "gone.png".into() };
        assert!(matches!(
            pipeline.process_entry(&missing, dir.path()),
            FileOutcome::Failed { error: PipelineError::Decode { .. } }
        ));
    }

    #[test]
    fn process_file_writes_with_configured_extension() {
        let dir = tempfile::TempDir::new().unwrap();
        let src = dir.path().join("photo.PNG");
        source(40, 30).save_with_format(&src, image::ImageFormat::Png).unwrap();

        let cfg = ProcessingConfig::webp_preset();
        let pipeline = ImagePipeline::from_parts(watermark(), "wm.png", cfg).unwrap();
        let (path, encoded) = pipeline.process_file(&src, dir.path()).unwrap();

        assert_eq!(path, dir.path().join("photo.webp"));
        assert_eq!(std::fs::read(&path).unwrap(), encoded.bytes);
        assert_eq!(crate::utils::format_from_extension(&path).unwrap(), ImageFormat::WebP);
    }

    #[test]
    fn plain_mode_skips_search_and_stores_losslessly() {
        let dir = tempfile::TempDir::new().unwrap();
        let src = dir.path().join("photo.jpg");
        source(40, 30).to_rgb8().save(&src).unwrap();

        let cfg = ProcessingConfig::jpg_preset().with_size_optimization(false);
        let pipeline = ImagePipeline::from_parts(watermark(), "wm.png", cfg).unwrap();
        let (path, encoded) = pipeline.process_file(&src, dir.path()).unwrap();
        assert_eq!(path, dir.path().join("photo.png"));
        assert_eq!(encoded.format, ImageFormat::PNG);

        let cfg = ProcessingConfig::webp_preset().with_size_optimization(false);
        let pipeline = ImagePipeline::from_parts(watermark(), "wm.png", cfg).unwrap();
        let composite = pipeline.compose(codec::decode(&src).unwrap()).unwrap().to_rgba8();
        let (path, _) = pipeline.process_file(&src, dir.path()).unwrap();
        assert_eq!(path, dir.path().join("photo.webp"));
        assert_eq!(codec::decode(&path).unwrap().to_rgba8(), composite);
    }

    #[test]
    fn from_parts_rejects_zero_bounds() {
        let err = ImagePipeline::from_parts(watermark(), "wm.png", ProcessingConfig::default().with_max_size(0, 600))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }

    #[test]
    fn new_rejects_missing_watermark_and_bad_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = ImagePipeline::new(dir.path().join("nope.png"), ProcessingConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Precondition(_)));

        let err = ImagePipeline::new(dir.path().join("nope.png"), ProcessingConfig::default().with_target_size_kb(0)).unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }
}
