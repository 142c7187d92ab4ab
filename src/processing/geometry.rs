//! Resize-to-fit, exact resize and center crop.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

use crate::utils::{PipelineError, PipelineResult};

/// Lanczos with a 3-lobe window.
const FILTER: FilterType = FilterType::Lanczos3;

/// Dimensions `(width, height)` scaled down to fit within `max_w`×`max_h`.
///
/// Returns the input unchanged when it already fits. Otherwise the limiting
/// axis lands exactly on its bound and the other axis is rounded, never
/// below 1 and never above its own bound. A zero bound counts as 1.
pub fn fit_dimensions(width: u32, height: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    let (max_w, max_h) = (max_w.max(1), max_h.max(1));
    if width <= max_w && height <= max_h {
        return (width, height);
    }

    let (w, h, mw, mh) = (u64::from(width), u64::from(height), u64::from(max_w), u64::from(max_h));
    // Compare max_w/width against max_h/height without floats.
    if mw * h <= mh * w {
        let scaled = (h * mw + w / 2) / w;
        (max_w, scaled.clamp(1, mh) as u32)
    } else {
        let scaled = (w * mh + h / 2) / h;
        (scaled.clamp(1, mw) as u32, max_h)
    }
}

/// Scales `img` down to fit within the bounds, preserving aspect ratio.
/// Images already within bounds are returned untouched.
pub fn fit_resize(img: DynamicImage, max_w: u32, max_h: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    let (new_w, new_h) = fit_dimensions(width, height, max_w, max_h);
    if (new_w, new_h) == (width, height) {
        return img;
    }
    resize_exact(&img, new_w, new_h)
}

/// Stretches `img` to exactly `width`×`height`.
pub fn resize_exact(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    img.resize_exact(width, height, FILTER)
}

/// Crops a centered `width`×`height` rectangle out of `img`.
pub fn crop_center(img: &DynamicImage, width: u32, height: u32) -> PipelineResult<DynamicImage> {
    let (src_w, src_h) = img.dimensions();
    if width > src_w || height > src_h || width == 0 || height == 0 {
        return Err(PipelineError::InvalidCropDimensions {
            source_width: src_w,
            source_height: src_h,
            target_width: width,
            target_height: height,
        });
    }

    let x = (src_w - width) / 2;
    let y = (src_h - height) / 2;
    Ok(img.crop_imm(x, y, width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use proptest::prelude::*;

    fn solid(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([1, 2, 3, 255])))
    }

    #[test]
    fn fit_resize_is_identity_within_bounds() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_fn(30, 20, |x, y| Rgba([x as u8, y as u8, 0, 255])));
        let out = fit_resize(img.clone(), 30, 20);
        assert_eq!(out, img);
    }

    #[test]
    fn fit_resize_scales_landscape() {
        let out = fit_resize(solid(2400, 1200), 1200, 1200);
        assert_eq!(out.dimensions(), (1200, 600));
    }

    #[test]
    fn fit_resize_scales_portrait() {
        let out = fit_resize(solid(300, 900), 500, 300);
        assert_eq!(out.dimensions(), (100, 300));
    }

    #[test]
    fn zero_bounds_do_not_panic() {
        assert_eq!(fit_dimensions(400, 200, 0, 100), (1, 1));
        assert_eq!(fit_dimensions(400, 200, 100, 0), (2, 1));
        assert_eq!(fit_dimensions(400, 200, 0, 0), (1, 1));
        assert_eq!(fit_resize(solid(40, 20), 0, 10).dimensions(), (1, 1));
    }

    #[test]
    fn resize_exact_stretches() {
        assert_eq!(resize_exact(&solid(10, 40), 33, 7).dimensions(), (33, 7));
    }

    #[test]
    fn crop_center_takes_the_middle() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_fn(10, 6, |x, y| Rgba([x as u8, y as u8, 0, 255])));
        let out = crop_center(&img, 4, 2).unwrap().to_rgba8();
        assert_eq!(out.dimensions(), (4, 2));
        assert_eq!(out.get_pixel(0, 0), &Rgba([3, 2, 0, 255]));
        assert_eq!(out.get_pixel(3, 1), &Rgba([6, 3, 0, 255]));
    }

    #[test]
    fn crop_center_rejects_oversized_targets() {
        let err = crop_center(&solid(10, 10), 11, 5).unwrap_err();
        assert_eq!(
            err,
            PipelineError::InvalidCropDimensions {
                source_width: 10,
                source_height: 10,
                target_width: 11,
                target_height: 5,
            }
        );
        assert!(crop_center(&solid(10, 10), 5, 11).is_err());
    }

    proptest! {
        #[test]
        fn fit_dimensions_within_bounds_is_identity(w in 1u32..4000, h in 1u32..4000, extra_w in 0u32..500, extra_h in 0u32..500) {
            prop_assert_eq!(fit_dimensions(w, h, w + extra_w, h + extra_h), (w, h));
        }

        #[test]
        fn fit_dimensions_hits_one_bound(w in 1u32..6000, h in 1u32..6000, mw in 1u32..2000, mh in 1u32..2000) {
            prop_assume!(w > mw || h > mh);
            let (nw, nh) = fit_dimensions(w, h, mw, mh);
            prop_assert!(nw <= mw && nh <= mh);
            prop_assert!(nw == mw || nh == mh);
            prop_assert!(nw >= 1 && nh >= 1);

            // Aspect ratio holds up to rounding of the non-limiting axis.
            let src = w as f64 / h as f64;
            if nw == mw {
                let ideal = mw as f64 / src;
                prop_assert!((nh as f64 - ideal).abs() <= 0.5 + 1e-9 || nh == 1 || nh == mh);
            } else {
                let ideal = mh as f64 * src;
                prop_assert!((nw as f64 - ideal).abs() <= 0.5 + 1e-9 || nw == 1 || nw == mw);
            }
        }
    }
}
