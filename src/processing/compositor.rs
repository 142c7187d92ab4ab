//! Alpha-composites a watermark over a base image.
//!
//! The watermark's own alpha channel is used unmodified: there is no extra
//! opacity factor. A semi-transparent result must come from the watermark file.

use image::{imageops, DynamicImage, GenericImageView, Rgba, RgbaImage};
use tracing::debug;

use crate::core::WatermarkMode;
use crate::processing::geometry::{crop_center, resize_exact};
use crate::utils::PipelineResult;

/// Fits `watermark` onto a `width`×`height` target according to `mode`.
///
/// `Resize` always resamples. `Crop` resamples only when the watermark is no
/// larger than the target on both axes; otherwise it takes a centered crop.
pub fn prepare_watermark(watermark: &DynamicImage, width: u32, height: u32, mode: WatermarkMode) -> PipelineResult<DynamicImage> {
    let (wm_w, wm_h) = watermark.dimensions();

    if (wm_w, wm_h) == (width, height) {
        return Ok(watermark.clone());
    }

    match mode {
        WatermarkMode::Resize => Ok(resize_exact(watermark, width, height)),
        WatermarkMode::Crop if wm_w <= width && wm_h <= height => Ok(resize_exact(watermark, width, height)),
        WatermarkMode::Crop if wm_w >= width && wm_h >= height => {
            debug!("Cropping watermark {wm_w}x{wm_h} to {width}x{height} from center");
            crop_center(watermark, width, height)
        }
        // Larger on one axis, smaller on the other: center the crop on the
        // larger axis, keep the whole smaller axis and leave the rest transparent.
        WatermarkMode::Crop => Ok(crop_onto_transparent(watermark, width, height)),
    }
}

/// Crops the overlap of a centered `width`×`height` window out of `watermark`
/// without resampling and places it at the origin of a transparent layer.
fn crop_onto_transparent(watermark: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    let (wm_w, wm_h) = watermark.dimensions();
    let x = wm_w.saturating_sub(width) / 2;
    let y = wm_h.saturating_sub(height) / 2;
    let region = watermark.crop_imm(x, y, wm_w.min(width), wm_h.min(height)).to_rgba8();
    debug!(
        "Cropping watermark {wm_w}x{wm_h} to {}x{} inside a {width}x{height} layer",
        region.width(),
        region.height()
    );

    let mut layer = RgbaImage::new(width, height);
    imageops::replace(&mut layer, &region, 0, 0);
    DynamicImage::ImageRgba8(layer)
}

/// Returns a new RGBA image: `base` copied in, then the prepared watermark
/// composited over it with "over" blending.
pub fn blend(base: &DynamicImage, watermark: &DynamicImage, mode: WatermarkMode) -> PipelineResult<DynamicImage> {
    let (width, height) = base.dimensions();
    let layer = prepare_watermark(watermark, width, height, mode)?.to_rgba8();

    let mut canvas = base.to_rgba8();
    for (dst, src) in canvas.pixels_mut().zip(layer.pixels()) {
        *dst = over(*src, *dst);
    }
    Ok(DynamicImage::ImageRgba8(canvas))
}

/// Straight-alpha "over": `top` weighted by its alpha onto `bottom`.
///
/// Integer arithmetic keeps the endpoints exact: alpha 255 yields `top`,
/// alpha 0 yields `bottom`.
pub fn over(top: Rgba<u8>, bottom: Rgba<u8>) -> Rgba<u8> {
    let fa = u32::from(top[3]);
    if fa == 255 {
        return top;
    }
    if fa == 0 {
        return bottom;
    }

    let ba = u32::from(bottom[3]);
    let inv = 255 - fa;
    // Output alpha scaled by 255.
    let alpha = fa * 255 + ba * inv;
    if alpha == 0 {
        return Rgba([0, 0, 0, 0]);
    }

    let channel = |i: usize| {
        let c = u32::from(top[i]) * fa * 255 + u32::from(bottom[i]) * ba * inv;
        ((c + alpha / 2) / alpha) as u8
    };
    Rgba([channel(0), channel(1), channel(2), ((alpha + 127) / 255) as u8])
}
