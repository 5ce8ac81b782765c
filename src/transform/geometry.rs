//! Resize geometry.
//!
//! Planning is separated from pixel work so the dimension rules can be
//! checked (and limit-tested) before any resampling happens.
//!
//! # Rules
//!
//! | Request            | Output                                               |
//! |--------------------|------------------------------------------------------|
//! | no width/height    | source size, untouched                               |
//! | width only         | `width x round(src_h * width / src_w)`, any fit      |
//! | height only        | `round(src_w * height / src_h) x height`, any fit    |
//! | both, `fill`       | exactly `W x H`, stretched                           |
//! | both, `cover`      | exactly `W x H`, centre crop of the source, then scale|
//! | both, `contain`    | exactly `W x H`, scaled by `min(sx, sy)`, letterbox  |
//! | both, `inside`     | scaled by `min(sx, sy)`, at most `W x H`             |
//! | both, `outside`    | scaled by `max(sx, sy)`, at least `W x H`            |
//!
//! Every computed dimension is rounded to nearest and never below 1.
//! Enlargement is allowed.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, RgbaImage};

use super::params::FitStrategy;

/// Resampling filter for all geometric resizes.
pub const RESIZE_FILTER: FilterType = FilterType::Lanczos3;

/// A resolved resize, ready to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizePlan {
    /// Keep the source dimensions.
    Passthrough { width: u32, height: u32 },

    /// Resample directly to the given size.
    Exact { width: u32, height: u32 },

    /// Crop the source window at `(x, y)`, then resample it to `width x height`.
    CoverCrop {
        x: u32,
        y: u32,
        crop_width: u32,
        crop_height: u32,
        width: u32,
        height: u32,
    },

    /// Resample to `scaled`, then centre on a transparent `width x height` canvas.
    Letterbox {
        scaled_width: u32,
        scaled_height: u32,
        width: u32,
        height: u32,
    },
}

impl ResizePlan {
    /// Final output dimensions.
    pub fn output_dimensions(&self) -> (u32, u32) {
        match *self {
            ResizePlan::Passthrough { width, height }
            | ResizePlan::Exact { width, height }
            | ResizePlan::CoverCrop { width, height, .. }
            | ResizePlan::Letterbox { width, height, .. } => (width, height),
        }
    }

    /// Longest side of the output, used for limit checks.
    ///
    /// No plan ever resamples to anything larger than its output.
    pub fn max_extent(&self) -> u32 {
        let (width, height) = self.output_dimensions();
        width.max(height)
    }
}

#[inline]
fn scale_dim(value: u32, factor: f64) -> u32 {
    ((value as f64 * factor).round() as u32).max(1)
}

/// Compute the resize plan for a source of `src_width x src_height`.
pub fn plan_resize(
    src_width: u32,
    src_height: u32,
    width: Option<u32>,
    height: Option<u32>,
    fit: FitStrategy,
) -> ResizePlan {
    let src_w = src_width.max(1);
    let src_h = src_height.max(1);

    let (target_w, target_h) = match (width, height) {
        (None, None) => {
            return ResizePlan::Passthrough {
                width: src_width,
                height: src_height,
            }
        }
        (Some(w), None) => {
            let w = w.max(1);
            return ResizePlan::Exact {
                width: w,
                height: scale_dim(src_h, w as f64 / src_w as f64),
            };
        }
        (None, Some(h)) => {
            let h = h.max(1);
            return ResizePlan::Exact {
                width: scale_dim(src_w, h as f64 / src_h as f64),
                height: h,
            };
        }
        (Some(w), Some(h)) => (w.max(1), h.max(1)),
    };

    let sx = target_w as f64 / src_w as f64;
    let sy = target_h as f64 / src_h as f64;

    match fit {
        FitStrategy::Fill => ResizePlan::Exact {
            width: target_w,
            height: target_h,
        },
        FitStrategy::Inside => {
            let scale = sx.min(sy);
            ResizePlan::Exact {
                width: scale_dim(src_w, scale).min(target_w),
                height: scale_dim(src_h, scale).min(target_h),
            }
        }
        FitStrategy::Outside => {
            let scale = sx.max(sy);
            ResizePlan::Exact {
                width: scale_dim(src_w, scale).max(target_w),
                height: scale_dim(src_h, scale).max(target_h),
            }
        }
        FitStrategy::Cover => {
            let scale = sx.max(sy);
            let crop_width = scale_dim(target_w, 1.0 / scale).min(src_w);
            let crop_height = scale_dim(target_h, 1.0 / scale).min(src_h);
            ResizePlan::CoverCrop {
                x: (src_w - crop_width) / 2,
                y: (src_h - crop_height) / 2,
                crop_width,
                crop_height,
                width: target_w,
                height: target_h,
            }
        }
        FitStrategy::Contain => {
            let scale = sx.min(sy);
            ResizePlan::Letterbox {
                scaled_width: scale_dim(src_w, scale).min(target_w),
                scaled_height: scale_dim(src_h, scale).min(target_h),
                width: target_w,
                height: target_h,
            }
        }
    }
}

fn resample(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    if img.dimensions() == (width, height) {
        img.clone()
    } else {
        img.resize_exact(width, height, RESIZE_FILTER)
    }
}

/// Apply a plan to an image.
pub fn apply_plan(img: &DynamicImage, plan: ResizePlan) -> DynamicImage {
    match plan {
        ResizePlan::Passthrough { .. } => img.clone(),
        ResizePlan::Exact { width, height } => resample(img, width, height),
        ResizePlan::CoverCrop {
            x,
            y,
            crop_width,
            crop_height,
            width,
            height,
        } => resample(&img.crop_imm(x, y, crop_width, crop_height), width, height),
        ResizePlan::Letterbox {
            scaled_width,
            scaled_height,
            width,
            height,
        } => {
            let scaled = resample(img, scaled_width, scaled_height).to_rgba8();
            let mut canvas = RgbaImage::new(width, height);
            let x = (width - scaled_width) / 2;
            let y = (height - scaled_height) / 2;
            imageops::overlay(&mut canvas, &scaled, x as i64, y as i64);
            DynamicImage::ImageRgba8(canvas)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
