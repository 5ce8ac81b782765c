//! Segmentation model abstraction and the process-wide model slot.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use image::{DynamicImage, GrayImage};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::error::SegmentError;

// =============================================================================
// Masks
// =============================================================================

/// A labeled region produced by a segmentation model.
///
/// `mask` is a greyscale opacity plane: 0 is background, 255 is fully part
/// of the region. It may be smaller than the image it was computed from.
#[derive(Debug, Clone)]
pub struct SegmentMask {
    /// Class label, e.g. `"person"` or `"foreground"`
    pub label: String,

    /// Model confidence in `[0, 1]`
    pub score: f32,

    /// Per-pixel opacity
    pub mask: GrayImage,
}

impl SegmentMask {
    pub fn new(label: impl Into<String>, score: f32, mask: GrayImage) -> Self {
        Self {
            label: label.into(),
            score,
            mask,
        }
    }

    /// Bounding box of the non-zero pixels as `(x, y, width, height)`.
    ///
    /// Returns `None` for an all-zero mask.
    pub fn bounding_box(&self) -> Option<(u32, u32, u32, u32)> {
        let mut min_x = u32::MAX;
        let mut min_y = u32::MAX;
        let mut max_x = 0;
        let mut max_y = 0;
        let mut any = false;

        for (x, y, px) in self.mask.enumerate_pixels() {
            if px[0] > 0 {
                any = true;
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
            }
        }

        any.then(|| (min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
    }

    /// Area of the bounding box in mask pixels (0 for an empty mask).
    pub fn bounding_area(&self) -> u64 {
        self.bounding_box()
            .map(|(_, _, w, h)| w as u64 * h as u64)
            .unwrap_or(0)
    }
}

// =============================================================================
// Model Traits
// =============================================================================

/// A loaded segmentation model.
///
/// Inference is synchronous and CPU-bound; callers run it on the blocking pool.
pub trait SegmentationModel: Send + Sync {
    /// Short identifier for logs.
    fn name(&self) -> &str;

    /// Segment an image into zero or more labeled masks.
    fn segment(&self, image: &DynamicImage) -> Result<Vec<SegmentMask>, SegmentError>;
}

/// Constructs a [`SegmentationModel`]. Called at most once per successful load.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn SegmentationModel>, SegmentError>;
}

// =============================================================================
// LazyModel
// =============================================================================

/// Process-wide, lazily initialised model slot.
///
/// The first call to [`LazyModel::get`] runs the loader; concurrent callers
/// wait for that same load instead of starting their own. A failed load
/// leaves the slot empty so a later call can retry. Once loaded, the model
/// lives until the slot is dropped.
pub struct LazyModel {
    loader: Box<dyn ModelLoader>,
    cell: OnceCell<Arc<dyn SegmentationModel>>,
}

impl LazyModel {
    pub fn new(loader: impl ModelLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            cell: OnceCell::new(),
        }
    }

    /// Get the model, loading it on first use.
    pub async fn get(&self) -> Result<Arc<dyn SegmentationModel>, SegmentError> {
        if let Some(model) = self.cell.get() {
            return Ok(Arc::clone(model));
        }

        self.cell
            .get_or_try_init(|| async {
                debug!("Segmentation model not loaded yet, loading");
                let model = self.loader.load().await?;
                info!(model = model.name(), "Segmentation model loaded");
                Ok::<_, SegmentError>(model)
            })
            .await
            .cloned()
    }

    /// Whether a model has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }
}

impl fmt::Debug for LazyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyModel")
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
