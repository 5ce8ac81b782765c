//! Decode and encode through the `image` codecs.
//!
//! # Design Decisions
//!
//! - **Pinned decoder**: the input format is sniffed before decoding (see
//!   [`crate::format::detect`]) and the decoder is pinned to it, so a
//!   mislabelled upload cannot select a different decoder.
//!
//! - **Metadata stripped**: only pixels survive a decode/encode round trip.
//!   EXIF, ICC profiles and text chunks are never copied to the output.
//!
//! - **Per-format quality**: JPEG, AVIF and WebP honour the quality knob. PNG
//!   has no quality, only a compression level. Lossy WebP goes through
//!   libwebp (the `webp` crate) since the `image` WebP encoder only writes
//!   lossless. Operations with no quality of their own keep lossless WebP.

use std::borrow::Cow;
use std::io::Cursor;
use std::path::Path;

use bytes::Bytes;
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageError, ImageReader, Limits};

use crate::error::TransformError;
use crate::format::{InputFormat, OutputFormat};

use super::params::{MAX_QUALITY, MIN_QUALITY};
use super::TransformLimits;

/// AVIF encoder speed (1 = slowest/best, 10 = fastest).
pub const AVIF_SPEED: u8 = 6;

// =============================================================================
// Encode Options
// =============================================================================

/// How aggressively to encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Quality for lossy encoders (1-100).
    pub quality: u8,

    /// Spend maximum effort on PNG compression.
    pub max_png_compression: bool,

    /// Write WebP losslessly, ignoring `quality`.
    pub lossless_webp: bool,
}

impl EncodeOptions {
    /// Options for the compress operation: given quality, best PNG compression.
    pub fn compress(quality: u8) -> Self {
        Self {
            quality,
            max_png_compression: true,
            lossless_webp: false,
        }
    }

    /// Options for plain re-encoding at a fixed quality.
    pub fn standard(quality: u8) -> Self {
        Self {
            quality,
            max_png_compression: false,
            lossless_webp: false,
        }
    }

    /// Options for operations without a quality setting: maximum quality,
    /// lossless WebP.
    pub fn preserve() -> Self {
        Self {
            quality: MAX_QUALITY,
            max_png_compression: false,
            lossless_webp: true,
        }
    }
}

// =============================================================================
// Decoding
// =============================================================================

fn decode_limits(limits: &TransformLimits) -> Limits {
    let mut decode_limits = Limits::default();
    decode_limits.max_image_width = Some(limits.max_decode_dimension);
    decode_limits.max_image_height = Some(limits.max_decode_dimension);
    decode_limits
}

fn map_decode_error(err: ImageError) -> TransformError {
    match err {
        ImageError::Limits(e) => TransformError::ImageTooLarge {
            message: e.to_string(),
        },
        other => TransformError::Decode {
            message: other.to_string(),
        },
    }
}

/// Decode an in-memory image of a known format.
pub fn decode(
    source: &[u8],
    format: InputFormat,
    limits: &TransformLimits,
) -> Result<DynamicImage, TransformError> {
    let mut reader = ImageReader::with_format(Cursor::new(source), format.image_format());
    reader.limits(decode_limits(limits));
    reader.decode().map_err(map_decode_error)
}

/// Decode an image buffered on disk.
pub fn decode_file(
    path: &Path,
    format: InputFormat,
    limits: &TransformLimits,
) -> Result<DynamicImage, TransformError> {
    let mut reader = ImageReader::open(path)?;
    reader.set_format(format.image_format());
    reader.limits(decode_limits(limits));
    reader.decode().map_err(map_decode_error)
}

// =============================================================================
// Encoding
// =============================================================================

/// Convert pixel layouts an encoder cannot take into ones it can.
fn normalize_for(img: &DynamicImage, format: OutputFormat) -> Cow<'_, DynamicImage> {
    match format {
        OutputFormat::Jpeg => match img {
            DynamicImage::ImageRgb8(_) | DynamicImage::ImageLuma8(_) => Cow::Borrowed(img),
            _ => Cow::Owned(DynamicImage::ImageRgb8(img.to_rgb8())),
        },
        OutputFormat::Png => match img {
            DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
                Cow::Owned(DynamicImage::ImageRgba16(img.to_rgba16()))
            }
            _ => Cow::Borrowed(img),
        },
        OutputFormat::WebP | OutputFormat::Avif => match img {
            DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => Cow::Borrowed(img),
            _ if img.color().has_alpha() => Cow::Owned(DynamicImage::ImageRgba8(img.to_rgba8())),
            _ => Cow::Owned(DynamicImage::ImageRgb8(img.to_rgb8())),
        },
    }
}

/// Encode an image to the given output format.
pub fn encode(
    img: &DynamicImage,
    format: OutputFormat,
    options: EncodeOptions,
) -> Result<Bytes, TransformError> {
    let quality = options.quality.clamp(MIN_QUALITY, MAX_QUALITY);
    let img = normalize_for(img, format);
    let mut output = Vec::new();

    let result = match format {
        OutputFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut output, quality);
            img.write_with_encoder(encoder)
        }
        OutputFormat::Png => {
            let compression = if options.max_png_compression {
                CompressionType::Best
            } else {
                CompressionType::Default
            };
            let encoder =
                PngEncoder::new_with_quality(&mut output, compression, PngFilterType::Adaptive);
            img.write_with_encoder(encoder)
        }
        OutputFormat::WebP if options.lossless_webp => {
            let encoder = WebPEncoder::new_lossless(&mut output);
            img.write_with_encoder(encoder)
        }
        OutputFormat::WebP => return encode_lossy_webp(&img, quality).map(Bytes::from),
        OutputFormat::Avif => {
            let encoder = AvifEncoder::new_with_speed_quality(&mut output, AVIF_SPEED, quality);
            img.write_with_encoder(encoder)
        }
    };

    result.map_err(|e| TransformError::Encode {
        message: format!("{} encode failed: {}", format, e),
    })?;

    Ok(Bytes::from(output))
}

/// Lossy WebP through libwebp. Expects the RGB8/RGBA8 layouts `normalize_for` produces.
fn encode_lossy_webp(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, TransformError> {
    let encoder = match img {
        DynamicImage::ImageRgb8(buf) => {
            webp::Encoder::from_rgb(buf.as_raw(), buf.width(), buf.height())
        }
        DynamicImage::ImageRgba8(buf) => {
            webp::Encoder::from_rgba(buf.as_raw(), buf.width(), buf.height())
        }
        other => {
            return Err(TransformError::Encode {
                message: format!("webp encode failed: unsupported layout {:?}", other.color()),
            })
        }
    };

    encoder
        .encode_simple(false, f32::from(quality))
        .map(|memory| memory.to_vec())
        .map_err(|e| TransformError::Encode {
            message: format!("webp encode failed: {:?}", e),
        })
}

// =============================================================================
// Tests
// =============================================================================
