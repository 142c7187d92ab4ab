//! Uniform decode/encode across PNG, JPEG and WebP.
//!
//! Pixel buffers are [`DynamicImage`]s; bytes only exist at the edges.
//! Format dispatch is a plain `match` on [`ImageFormat`], so an unknown
//! format can only fail at parse time.

use std::path::Path;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageReader};
use libwebp_sys::WebPPreset;
use tracing::debug;

use crate::utils::{ImageFormat, PipelineError, PipelineResult};

type Result<T> = PipelineResult<T>;

/// libwebp `method` used for the plain lossless save (0 = fast, 6 = smallest).
const WEBP_LOSSLESS_EFFORT: i32 = 6;

/// Decodes the image at `path`, sniffing the container from its bytes.
pub fn decode(path: impl AsRef<Path>) -> Result<DynamicImage> {
    let path = path.as_ref();
    ImageReader::open(path)
        .map_err(|e| PipelineError::decode(path, e))?
        .with_guessed_format()
        .map_err(|e| PipelineError::decode(path, e))?
        .decode()
        .map_err(|e| PipelineError::decode(path, e))
}

/// Encodes `image` into `format` at `quality` (1-100), returning the file bytes.
///
/// PNG ignores `quality`; WebP goes through the lossy encoder.
pub fn encode(image: &DynamicImage, quality: u8, format: ImageFormat) -> Result<Vec<u8>> {
    match format {
        ImageFormat::PNG => encode_png(image),
        ImageFormat::JPEG => encode_jpeg(image, quality),
        ImageFormat::WebP => encode_webp_lossy(image, quality),
    }
}

/// Encodes `image` without any size optimization.
///
/// WebP is stored losslessly; every other format is stored as PNG. Returns the
/// bytes together with the container actually produced.
pub fn encode_plain(image: &DynamicImage, format: ImageFormat) -> Result<(Vec<u8>, ImageFormat)> {
    match format {
        ImageFormat::WebP => Ok((encode_webp_lossless(image)?, ImageFormat::WebP)),
        _ => Ok((encode_png(image)?, ImageFormat::PNG)),
    }
}

/// Writes `image` through [`encode_plain`], correcting the extension of `path`
/// to the container produced.
pub fn save_plain(image: &DynamicImage, path: impl AsRef<Path>, format: ImageFormat) -> Result<std::path::PathBuf> {
    let (bytes, written) = encode_plain(image, format)?;
    let path = path.as_ref().with_extension(written.primary_extension());
    std::fs::write(&path, bytes)?;
    debug!("Saved {}", path.display());
    Ok(path)
}

/// PNG always goes through a straight (non-premultiplied) RGBA8 buffer so alpha survives.
fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(rgba.as_raw(), width, height, ExtendedColorType::Rgba8)
        .map_err(|e| PipelineError::encode(ImageFormat::PNG, e))?;
    Ok(buf)
}

/// JPEG has no alpha; the channel is dropped.
fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100))
        .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
        .map_err(|e| PipelineError::encode(ImageFormat::JPEG, e))?;
    Ok(buf)
}

fn encode_webp_lossy(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let config = lossy_webp_config(quality)?;

    webp::Encoder::from_rgba(rgba.as_raw(), width, height)
        .encode_advanced(&config)
        .map(|mem| mem.to_vec())
        .map_err(|e| PipelineError::encode(ImageFormat::WebP, format!("{e:?}")))
}

fn encode_webp_lossless(image: &DynamicImage) -> Result<Vec<u8>> {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut config = webp_config(WebPPreset::WEBP_PRESET_DEFAULT, 75.0)?;
    config.lossless = 1;
    config.method = WEBP_LOSSLESS_EFFORT;

    webp::Encoder::from_rgba(rgba.as_raw(), width, height)
        .encode_advanced(&config)
        .map(|mem| mem.to_vec())
        .map_err(|e| PipelineError::encode(ImageFormat::WebP, format!("{e:?}")))
}

/// Photo preset at `quality`: stronger spatial noise shaping and smoother filtering
/// than the default preset, tuned for photographic content.
fn lossy_webp_config(quality: u8) -> Result<webp::WebPConfig> {
    let mut config = webp_config(WebPPreset::WEBP_PRESET_PHOTO, f32::from(quality))?;
    config.lossless = 0;
    Ok(config)
}

fn webp_config(preset: WebPPreset, quality: f32) -> Result<webp::WebPConfig> {
    webp::WebPConfig::new_with_preset(preset, quality)
        .map_err(|_| PipelineError::encode(ImageFormat::WebP, "failed to create WebPConfig"))
}
