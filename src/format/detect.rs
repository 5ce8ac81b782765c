//! Input validation ahead of decoding.
//!
//! Every operation runs the same two checks before any bytes reach the
//! decoder:
//!
//! 1. The declared MIME type (if the client sent a meaningful one) must be an
//!    `image/*` type.
//! 2. The leading bytes must sniff as a format the codec can decode.
//!
//! Both failures are client errors (400). A file that passes both checks but
//! is truncated or corrupt still fails later in the decoder, which is a 500.

use crate::error::TransformError;

/// Number of leading bytes inspected when sniffing the input format.
pub const SNIFF_LEN: usize = 64;

/// MIME type browsers send when they don't know the file type.
const GENERIC_MIME: &str = "application/octet-stream";

// =============================================================================
// InputFormat
// =============================================================================

/// Decodable input format, detected from magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Png,
    Jpeg,
    WebP,
    Gif,
    Bmp,
    Tiff,
}

impl InputFormat {
    /// Get a human-readable name for the format.
    pub const fn name(&self) -> &'static str {
        match self {
            InputFormat::Png => "png",
            InputFormat::Jpeg => "jpeg",
            InputFormat::WebP => "webp",
            InputFormat::Gif => "gif",
            InputFormat::Bmp => "bmp",
            InputFormat::Tiff => "tiff",
        }
    }

    /// The codec's equivalent format, used to pin the decoder.
    pub const fn image_format(&self) -> image::ImageFormat {
        match self {
            InputFormat::Png => image::ImageFormat::Png,
            InputFormat::Jpeg => image::ImageFormat::Jpeg,
            InputFormat::WebP => image::ImageFormat::WebP,
            InputFormat::Gif => image::ImageFormat::Gif,
            InputFormat::Bmp => image::ImageFormat::Bmp,
            InputFormat::Tiff => image::ImageFormat::Tiff,
        }
    }

    fn from_image_format(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Png => Some(InputFormat::Png),
            image::ImageFormat::Jpeg => Some(InputFormat::Jpeg),
            image::ImageFormat::WebP => Some(InputFormat::WebP),
            image::ImageFormat::Gif => Some(InputFormat::Gif),
            image::ImageFormat::Bmp => Some(InputFormat::Bmp),
            image::ImageFormat::Tiff => Some(InputFormat::Tiff),
            _ => None,
        }
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Check the MIME type declared on the multipart field.
///
/// Missing, empty and `application/octet-stream` declarations are accepted and
/// left to the byte sniffer. Anything else must be `image/*`.
pub fn validate_declared_type(content_type: Option<&str>) -> Result<(), TransformError> {
    let Some(declared) = content_type else {
        return Ok(());
    };

    let essence = declared
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if essence.is_empty() || essence == GENERIC_MIME || essence.starts_with("image/") {
        Ok(())
    } else {
        Err(TransformError::UnsupportedMediaType {
            detail: format!("expected an image upload, got '{}'", declared),
        })
    }
}

/// Detect the input format from the leading bytes of an upload.
///
/// Returns [`TransformError::UnsupportedMediaType`] if the bytes are not a
/// recognised image, or are an image the codec cannot decode (e.g. AVIF).
pub fn detect_input_format(header: &[u8]) -> Result<InputFormat, TransformError> {
    if header.is_empty() {
        return Err(TransformError::UnsupportedMediaType {
            detail: "file is empty".to_string(),
        });
    }

    let guessed = image::guess_format(header).map_err(|_| TransformError::UnsupportedMediaType {
        detail: "file content is not a recognised image".to_string(),
    })?;

    InputFormat::from_image_format(guessed).ok_or_else(|| TransformError::UnsupportedMediaType {
        detail: format!("{:?} input is not supported", guessed),
    })
}

// =============================================================================
// Tests
// =============================================================================
