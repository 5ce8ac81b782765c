//! Built-in contrast-based foreground segmenter.
//!
//! This is the default [`SegmentationModel`]. It needs no weights and is
//! fully deterministic, which makes it suitable for product shots and
//! portraits on plain backgrounds. It works in five steps:
//!
//! 1. Downscale so the longer side is at most `working_size`.
//! 2. Estimate the background colour as the per-channel median of the opaque
//!    pixels in a border ring.
//! 3. Measure every pixel's RGB distance from that colour. Fully transparent
//!    pixels are background; if the whole ring is transparent, alpha itself
//!    is the distance.
//! 4. Threshold the distances with Otsu's method (never below `min_contrast`).
//! 5. Split the foreground into 4-connected components and emit each one
//!    larger than `min_area_fraction` as a `"foreground"` mask.
//!
//! Masks are returned at working resolution; the compositor scales them back.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, GrayImage, Luma, RgbaImage};
use tracing::debug;

use crate::error::SegmentError;

use super::model::{ModelLoader, SegmentMask, SegmentationModel};

/// Label attached to every mask this model emits.
pub const FOREGROUND_LABEL: &str = "foreground";

/// Default longest side of the working image.
pub const DEFAULT_WORKING_SIZE: u32 = 320;

/// Default minimum distance from the background colour to count as foreground.
pub const DEFAULT_MIN_CONTRAST: u8 = 24;

/// Default minimum component size, as a fraction of working pixels.
pub const DEFAULT_MIN_AREA_FRACTION: f32 = 0.005;

// =============================================================================
// Configuration
// =============================================================================

/// Tuning for [`SaliencySegmenter`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SaliencyConfig {
    pub working_size: u32,
    pub min_contrast: u8,
    pub min_area_fraction: f32,
}

impl Default for SaliencyConfig {
    fn default() -> Self {
        Self {
            working_size: DEFAULT_WORKING_SIZE,
            min_contrast: DEFAULT_MIN_CONTRAST,
            min_area_fraction: DEFAULT_MIN_AREA_FRACTION,
        }
    }
}

impl SaliencyConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if !(16..=4096).contains(&self.working_size) {
            return Err("segment working size must be between 16 and 4096".to_string());
        }
        if !(0.0..1.0).contains(&self.min_area_fraction) {
            return Err("segment minimum area must be in [0, 1)".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Loader
// =============================================================================

/// Loader for the built-in segmenter.
#[derive(Debug, Clone, Default)]
pub struct SaliencyModelLoader {
    config: SaliencyConfig,
}

impl SaliencyModelLoader {
    pub fn new(config: SaliencyConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ModelLoader for SaliencyModelLoader {
    async fn load(&self) -> Result<Arc<dyn SegmentationModel>, SegmentError> {
        self.config.validate().map_err(SegmentError::Load)?;
        Ok(Arc::new(SaliencySegmenter::new(self.config)))
    }
}

// =============================================================================
// Segmenter
// =============================================================================

/// Contrast-against-background segmenter.
#[derive(Debug, Clone)]
pub struct SaliencySegmenter {
    config: SaliencyConfig,
}

impl SaliencySegmenter {
    pub fn new(config: SaliencyConfig) -> Self {
        Self { config }
    }

    fn working_image(&self, image: &DynamicImage) -> RgbaImage {
        let (w, h) = image.dimensions();
        let size = self.config.working_size;
        if w.max(h) > size {
            image.resize(size, size, FilterType::Triangle).to_rgba8()
        } else {
            image.to_rgba8()
        }
    }
}

impl SegmentationModel for SaliencySegmenter {
    fn name(&self) -> &str {
        "saliency"
    }

    fn segment(&self, image: &DynamicImage) -> Result<Vec<SegmentMask>, SegmentError> {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return Err(SegmentError::Inference("image has no pixels".to_string()));
        }

        let work = self.working_image(image);
        let background = border_median(&work);
        let distances = distance_map(&work, background);
        let threshold = otsu_threshold(&distances).max(self.config.min_contrast);

        let total = distances.len();
        let min_area = ((total as f64 * self.config.min_area_fraction as f64).ceil() as usize).max(1);

        let masks: Vec<SegmentMask> = connected_components(&distances, work.width(), work.height(), threshold)
            .into_iter()
            .filter(|component| component.len() >= min_area)
            .map(|component| {
                let mut mask = GrayImage::new(work.width(), work.height());
                let mut contrast_sum = 0u64;
                for &idx in &component {
                    let x = idx as u32 % work.width();
                    let y = idx as u32 / work.width();
                    mask.put_pixel(x, y, Luma([255]));
                    contrast_sum += distances[idx] as u64;
                }
                let score = contrast_sum as f32 / (component.len() as f32 * 255.0);
                SegmentMask::new(FOREGROUND_LABEL, score, mask)
            })
            .collect();

        debug!(
            background = ?background,
            threshold = threshold,
            masks = masks.len(),
            "Saliency segmentation complete"
        );

        Ok(masks)
    }
}

/// Per-channel median over the non-transparent pixels of a border ring.
///
/// `None` when every ring pixel is fully transparent.
fn border_median(img: &RgbaImage) -> Option<[u8; 3]> {
    let (w, h) = img.dimensions();
    let ring = (w.min(h) / 32).max(1);

    let mut channels: [Vec<u8>; 3] = [Vec::new(), Vec::new(), Vec::new()];
    for (x, y, px) in img.enumerate_pixels() {
        let on_ring =
            x < ring || y < ring || x >= w.saturating_sub(ring) || y >= h.saturating_sub(ring);
        if on_ring && px[3] > 0 {
            for (c, values) in channels.iter_mut().enumerate() {
                values.push(px[c]);
            }
        }
    }

    let mut median = [0u8; 3];
    for (c, values) in channels.iter_mut().enumerate() {
        if values.is_empty() {
            return None;
        }
        let mid = values.len() / 2;
        let (_, m, _) = values.select_nth_unstable(mid);
        median[c] = *m;
    }
    Some(median)
}

/// Euclidean RGB distance from `background`, scaled to 0..=255.
///
/// Fully transparent pixels are 0. Without a background colour the
/// distance is the pixel's alpha.
fn distance_map(img: &RgbaImage, background: Option<[u8; 3]>) -> Vec<u8> {
    const MAX_DISTANCE: f32 = 441.672_96; // sqrt(3 * 255^2)

    img.pixels()
        .map(|px| match background {
            _ if px[3] == 0 => 0,
            None => px[3],
            Some(background) => {
                let sum: f32 = (0..3)
                    .map(|c| {
                        let d = px[c] as f32 - background[c] as f32;
                        d * d
                    })
                    .sum();
                (sum.sqrt() / MAX_DISTANCE * 255.0).round() as u8
            }
        })
        .collect()
}

/// Otsu's threshold over a 0..=255 value distribution.
///
/// Values strictly above the returned threshold are foreground.
fn otsu_threshold(values: &[u8]) -> u8 {
    let mut histogram = [0u64; 256];
    for &v in values {
        histogram[v as usize] += 1;
    }

    let total = values.len() as f64;
    let sum: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &count)| i as f64 * count as f64)
        .sum();

    let mut sum_background = 0.0;
    let mut weight_background = 0.0;
    let mut best_variance = 0.0;
    let mut threshold = 0u8;

    for (t, &count) in histogram.iter().enumerate() {
        weight_background += count as f64;
        if weight_background == 0.0 {
            continue;
        }
        let weight_foreground = total - weight_background;
        if weight_foreground == 0.0 {
            break;
        }

        sum_background += t as f64 * count as f64;
        let mean_background = sum_background / weight_background;
        let mean_foreground = (sum - sum_background) / weight_foreground;
        let between =
            weight_background * weight_foreground * (mean_background - mean_foreground).powi(2);

        if between > best_variance {
            best_variance = between;
            threshold = t as u8;
        }
    }

    threshold
}

/// 4-connected components of pixels whose value exceeds `threshold`.
///
/// Each component is a list of row-major pixel indices.
fn connected_components(values: &[u8], width: u32, height: u32, threshold: u8) -> Vec<Vec<usize>> {
    let w = width as usize;
    let h = height as usize;
    let mut visited = vec![false; values.len()];
    let mut components = Vec::new();
    let mut queue = VecDeque::new();

    for start in 0..values.len() {
        if visited[start] || values[start] <= threshold {
            continue;
        }

        let mut component = Vec::new();
        visited[start] = true;
        queue.push_back(start);

        while let Some(idx) = queue.pop_front() {
            component.push(idx);
            let x = idx % w;
            let y = idx / w;

            let mut visit = |n: usize| {
                if !visited[n] && values[n] > threshold {
                    visited[n] = true;
                    queue.push_back(n);
                }
            };

            if x > 0 {
                visit(idx - 1);
            }
            if x + 1 < w {
                visit(idx + 1);
            }
            if y > 0 {
                visit(idx - w);
            }
            if y + 1 < h {
                visit(idx + w);
            }
        }

        components.push(component);
    }

    components
}

// =============================================================================
// Tests
// =============================================================================
