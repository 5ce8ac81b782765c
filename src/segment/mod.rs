//! Background removal by semantic segmentation.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            MediaTransformer             │
//! └────────────────────┬────────────────────┘
//!                      │ get() (first call loads)
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │               LazyModel                 │
//! │   OnceCell<Arc<dyn SegmentationModel>>  │
//! └────────────────────┬────────────────────┘
//!                      │ segment()
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │   Vec<SegmentMask>  →  select_mask  →   │
//! │   apply_mask (mask becomes alpha)       │
//! └─────────────────────────────────────────┘
//! ```
//!
//! The model sits behind [`SegmentationModel`] and [`ModelLoader`]; the
//! built-in [`SaliencySegmenter`] is used unless another loader is supplied.

mod composite;
mod model;
mod saliency;

pub use composite::{apply_mask, select_mask};
pub use model::{LazyModel, ModelLoader, SegmentMask, SegmentationModel};
pub use saliency::{
    SaliencyConfig, SaliencyModelLoader, SaliencySegmenter, DEFAULT_MIN_AREA_FRACTION,
    DEFAULT_MIN_CONTRAST, DEFAULT_WORKING_SIZE, FOREGROUND_LABEL,
};
