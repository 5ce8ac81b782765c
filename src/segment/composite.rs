//! Mask selection and alpha compositing.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, GrayImage, RgbaImage};

use crate::error::TransformError;

use super::model::SegmentMask;

/// Pick the mask to keep.
///
/// Policy: the highest-scoring mask whose label matches `preferred_label`
/// (case-insensitive); failing that, the mask with the largest bounding box.
/// Ties go to the earlier mask. Empty masks are never selected.
pub fn select_mask<'a>(masks: &'a [SegmentMask], preferred_label: &str) -> Option<&'a SegmentMask> {
    let candidates = || masks.iter().filter(|m| m.bounding_area() > 0);

    let preferred = candidates()
        .filter(|m| m.label.eq_ignore_ascii_case(preferred_label))
        .fold(None, |best: Option<&SegmentMask>, m| match best {
            Some(b) if b.score >= m.score => Some(b),
            _ => Some(m),
        });

    preferred.or_else(|| {
        candidates().fold(None, |best: Option<&SegmentMask>, m| match best {
            Some(b) if b.bounding_area() >= m.bounding_area() => Some(b),
            _ => Some(m),
        })
    })
}

/// Use `mask` as the alpha layer of `source`.
///
/// The mask is scaled to the source dimensions, then each output pixel's
/// alpha becomes `source_alpha * mask / 255`.
pub fn apply_mask(source: &DynamicImage, mask: &GrayImage) -> Result<RgbaImage, TransformError> {
    let (width, height) = source.dimensions();
    if width == 0 || height == 0 {
        return Err(TransformError::Composite {
            message: "source image has no pixels".to_string(),
        });
    }
    if mask.width() == 0 || mask.height() == 0 {
        return Err(TransformError::Composite {
            message: "mask has no pixels".to_string(),
        });
    }

    let alpha = if mask.dimensions() == (width, height) {
        mask.clone()
    } else {
        imageops::resize(mask, width, height, FilterType::Triangle)
    };

    let mut output = source.to_rgba8();
    for (px, m) in output.pixels_mut().zip(alpha.pixels()) {
        px[3] = ((px[3] as u16 * m[0] as u16 + 127) / 255) as u8;
    }

    Ok(output)
}

// =============================================================================
// Tests
// =============================================================================
