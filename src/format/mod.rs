//! Image formats on both sides of the pipeline.
//!
//! - [`OutputFormat`]: the formats a transform can encode to, parsed from the
//!   `format` form field
//! - [`detect`]: validation of uploaded bytes before they reach the decoder
//!
//! Input and output sets differ on purpose: AVIF can be written but not read,
//! while GIF, BMP and TIFF can be read but are never written.

pub mod detect;

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub use detect::{detect_input_format, validate_declared_type, InputFormat, SNIFF_LEN};

// =============================================================================
// OutputFormat
// =============================================================================

/// Encodable output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Png,
    Jpeg,
    WebP,
    Avif,
}

impl OutputFormat {
    /// All output formats, in the order they are listed in error messages.
    pub const ALL: [OutputFormat; 4] = [
        OutputFormat::WebP,
        OutputFormat::Avif,
        OutputFormat::Jpeg,
        OutputFormat::Png,
    ];

    /// MIME type sent as `Content-Type`.
    pub const fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::WebP => "image/webp",
            OutputFormat::Avif => "image/avif",
        }
    }

    /// File extension used in the suggested download filename.
    pub const fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::WebP => "webp",
            OutputFormat::Avif => "avif",
        }
    }

    /// Comma-separated names of [`Self::ALL`].
    pub fn expected_names() -> String {
        Self::ALL
            .iter()
            .map(OutputFormat::extension)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// The codec's equivalent format.
    pub const fn image_format(&self) -> image::ImageFormat {
        match self {
            OutputFormat::Png => image::ImageFormat::Png,
            OutputFormat::Jpeg => image::ImageFormat::Jpeg,
            OutputFormat::WebP => image::ImageFormat::WebP,
            OutputFormat::Avif => image::ImageFormat::Avif,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Error returned when a format name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown format '{0}' (expected one of: {expected})", expected = OutputFormat::expected_names())]
pub struct UnknownFormat(pub String);

impl FromStr for OutputFormat {
    type Err = UnknownFormat;

    /// Parse a format name. Case-insensitive; `jpg` is accepted for JPEG and a
    /// leading `image/` prefix is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        let name = name.strip_prefix("image/").unwrap_or(&name);

        match name {
            "png" => Ok(OutputFormat::Png),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "webp" => Ok(OutputFormat::WebP),
            "avif" => Ok(OutputFormat::Avif),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
