//! Binary search for the highest encoder quality that fits a size budget.
//!
//! Relies on encoded size never shrinking as quality rises, which holds for
//! the quality-scaled lossy encoders used here. That turns up to 100 encode
//! passes into at most 7.

use image::DynamicImage;
use tracing::debug;

use crate::processing::codec;
use crate::utils::{ImageFormat, PipelineError, PipelineResult};

pub const MIN_QUALITY: u8 = 1;
pub const MAX_QUALITY: u8 = 100;

/// Quality reported for PNG, whose encoder is lossless and ignores it.
pub const PNG_NOMINAL_QUALITY: u8 = 80;

/// Result of a quality search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityChoice {
    pub quality: u8,
    /// Encoded size at `quality`, in whole KB. `None` when nothing was probed.
    pub size_kb: Option<u64>,
    /// Number of encode passes spent
    pub probes: u32,
}

/// Searches `[MIN_QUALITY, MAX_QUALITY]` for the largest quality whose probed
/// size in bytes, divided by 1024, is at most `target_kb`.
///
/// `probe` encodes at the given quality and returns the byte count. Probes run
/// sequentially. Fails with [`PipelineError::QualityUnattainable`] when no
/// probed quality fits.
pub fn search_quality<F>(format: ImageFormat, target_kb: u64, mut probe: F) -> PipelineResult<QualityChoice>
where
    F: FnMut(u8) -> PipelineResult<u64>,
{
    let (mut low, mut high) = (i32::from(MIN_QUALITY), i32::from(MAX_QUALITY));
    let mut best: Option<(u8, u64)> = None;
    let mut probes = 0;

    while low <= high {
        let mid = low + (high - low) / 2;
        let size_kb = probe(mid as u8)? / 1024;
        probes += 1;
        debug!("Testing {format} quality {mid}, size {size_kb} KB");

        if size_kb <= target_kb {
            best = Some((mid as u8, size_kb));
            low = mid + 1;
        } else {
            high = mid - 1;
        }
    }

    match best {
        Some((quality, size_kb)) => Ok(QualityChoice {
            quality,
            size_kb: Some(size_kb),
            probes,
        }),
        None => Err(PipelineError::QualityUnattainable {
            target_kb,
            format: format.to_string(),
        }),
    }
}

/// Picks the encoder quality for `image` under `target_kb`.
///
/// PNG skips the search and returns [`PNG_NOMINAL_QUALITY`].
pub fn optimize_quality(image: &DynamicImage, format: ImageFormat, target_kb: u64) -> PipelineResult<QualityChoice> {
    if !format.is_lossy() {
        return Ok(QualityChoice {
            quality: PNG_NOMINAL_QUALITY,
            size_kb: None,
            probes: 0,
        });
    }

    search_quality(format, target_kb, |quality| {
        codec::encode(image, quality, format).map(|bytes| bytes.len() as u64)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    /// Strictly increasing: 1 KB per quality step.
    fn linear(q: u8) -> PipelineResult<u64> {
        Ok(u64::from(q) * 1024)
    }

    #[test]
    fn finds_exact_boundary() {
        let choice = search_quality(ImageFormat::JPEG, 42, linear).unwrap();
        assert_eq!(choice.quality, 42);
        assert_eq!(choice.size_kb, Some(42));
        assert!(choice.probes <= 7);
    }

    #[test]
    fn generous_budget_returns_max_quality() {
        let choice = search_quality(ImageFormat::WebP, 10_000, linear).unwrap();
        assert_eq!(choice.quality, MAX_QUALITY);
    }

    #[test]
    fn sizes_are_floored_to_whole_kb() {
        // 1024 * q + 1023 still floors to q KB.
        let choice = search_quality(ImageFormat::JPEG, 30, |q| Ok(u64::from(q) * 1024 + 1023)).unwrap();
        assert_eq!(choice.quality, 30);
    }

    #[test]
    fn impossible_budget_is_unattainable() {
        let err = search_quality(ImageFormat::JPEG, 0, linear).unwrap_err();
        assert_eq!(
            err,
            PipelineError::QualityUnattainable { target_kb: 0, format: "jpg".into() }
        );
    }

    #[test]
    fn probe_errors_propagate() {
        let err = search_quality(ImageFormat::WebP, 50, |_| Err(PipelineError::encode("webp", "boom"))).unwrap_err();
        assert!(matches!(err, PipelineError::Encode { .. }));
    }

    #[test]
    fn probes_follow_binary_search_order() {
        let mut seen = Vec::new();
        search_quality(ImageFormat::JPEG, 75, |q| {
            seen.push(q);
            linear(q)
        })
        .unwrap();
        assert_eq!(seen.first(), Some(&50));
        assert_eq!(seen.get(1), Some(&75));
    }

    #[test]
    fn png_skips_search() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 255])));
        let choice = optimize_quality(&img, ImageFormat::PNG, 1).unwrap();
        assert_eq!(choice, QualityChoice { quality: PNG_NOMINAL_QUALITY, size_kb: None, probes: 0 });
    }

    #[test]
    fn real_jpeg_fits_budget() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_fn(256, 256, |x, y| {
            Rgba([(x ^ y) as u8, (x * 3) as u8, (y * 5) as u8, 255])
        }));
        let choice = optimize_quality(&img, ImageFormat::JPEG, 10).unwrap();
        let bytes = codec::encode(&img, choice.quality, ImageFormat::JPEG).unwrap();
        assert!(bytes.len() as u64 / 1024 <= 10);
    }

    proptest! {
        /// For any monotonic size curve the result is the true maximum fitting quality.
        #[test]
        fn matches_linear_scan_on_monotonic_curves(
            steps in proptest::collection::btree_set(1u8..=100, 0..20),
            target in 0u64..40,
        ) {
            let steps: BTreeSet<u8> = steps;
            // Size in KB = number of step points at or below q.
            let size_kb = |q: u8| steps.range(..=q).count() as u64;

            let expected = (MIN_QUALITY..=MAX_QUALITY).rev().find(|&q| size_kb(q) <= target);
            let result = search_quality(ImageFormat::WebP, target, |q| Ok(size_kb(q) * 1024));

            match expected {
                Some(q) => prop_assert_eq!(result.unwrap().quality, q),
                None => prop_assert!(
                    matches!(result, Err(PipelineError::QualityUnattainable { .. })),
                    "expected unattainable"
                ),
            }
        }
    }
}
