//! Transform pipeline.
//!
//! This module turns one uploaded image into one encoded output. Every
//! operation shares the same skeleton; only the middle step differs:
//!
//! ```text
//! ┌──────────────┐   ┌──────────┐   ┌──────────┐   ┌─────────────┐   ┌──────────┐
//! │ UploadedFile │ → │ validate │ → │  decode  │ → │  transform  │ → │  encode  │
//! │ (mem / disk) │   │ mime+magic│  │ (codec)  │   │ (per op)    │   │ (codec)  │
//! └──────────────┘   └──────────┘   └──────────┘   └─────────────┘   └──────────┘
//! ```
//!
//! # Components
//!
//! - [`MediaTransformer`]: entry point, runs each operation on the blocking pool
//! - [`params`]: typed parameter structs built from form fields
//! - [`geometry`]: resize planning for the five fit strategies
//! - [`codec`]: decode/encode through the `image` crate
//! - [`TransformResult`]: encoded bytes plus the metadata needed for the response

pub mod codec;
pub mod geometry;
pub mod params;
mod service;

use std::fmt;

use bytes::Bytes;

use crate::format::OutputFormat;

pub use codec::{EncodeOptions, AVIF_SPEED};
pub use geometry::{apply_plan, plan_resize, ResizePlan};
pub use params::{
    CompressParams, ConvertParams, FitStrategy, FormFields, RemoveBackgroundParams, ResizeParams,
    CONVERT_QUALITY, DEFAULT_COMPRESS_QUALITY, MAX_QUALITY, MIN_QUALITY,
};
pub use service::MediaTransformer;

/// Default upper bound for requested and computed output dimensions.
pub const DEFAULT_MAX_DIMENSION: u32 = 8192;

/// Default upper bound for decoded input dimensions.
pub const DEFAULT_MAX_DECODE_DIMENSION: u32 = 16384;

// =============================================================================
// Operation
// =============================================================================

/// One of the four transforms the service performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Operation {
    Compress,
    Convert,
    Resize,
    RemoveBackground,
}

impl Operation {
    /// Name used in routes and download filenames.
    pub const fn name(&self) -> &'static str {
        match self {
            Operation::Compress => "compress",
            Operation::Convert => "convert",
            Operation::Resize => "resize",
            Operation::RemoveBackground => "remove-background",
        }
    }

    /// Generic message shown to clients when processing fails.
    pub const fn failure_message(&self) -> &'static str {
        match self {
            Operation::Compress => "Failed to compress image",
            Operation::Convert => "Failed to convert image",
            Operation::Resize => "Failed to resize image",
            Operation::RemoveBackground => "Failed to remove background",
        }
    }

    /// Multipart field names that may carry the file, in priority order.
    pub const fn file_fields(&self) -> &'static [&'static str] {
        match self {
            Operation::RemoveBackground => &["file", "image"],
            _ => &["file"],
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Limits
// =============================================================================

/// Size bounds applied while decoding and resizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformLimits {
    /// Largest width or height a resize may request or produce.
    pub max_dimension: u32,

    /// Largest width or height the decoder will accept.
    pub max_decode_dimension: u32,
}

impl Default for TransformLimits {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            max_decode_dimension: DEFAULT_MAX_DECODE_DIMENSION,
        }
    }
}

// =============================================================================
// TransformResult
// =============================================================================

/// Encoded output of a transform.
#[derive(Debug, Clone)]
pub struct TransformResult {
    /// Encoded image bytes
    pub data: Bytes,

    /// Format the bytes are encoded in
    pub format: OutputFormat,

    /// Output width in pixels
    pub width: u32,

    /// Output height in pixels
    pub height: u32,

    /// Operation that produced the output
    pub operation: Operation,
}

impl TransformResult {
    /// Value for the `Content-Type` header.
    pub fn content_type(&self) -> &'static str {
        self.format.mime_type()
    }

    /// Suggested download filename, `<operation>.<ext>`.
    pub fn filename(&self) -> String {
        format!("{}.{}", self.operation.name(), self.format.extension())
    }

    /// Value for the `Content-Disposition` header.
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.filename())
    }
}
