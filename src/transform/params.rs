//! Typed, defaulted parameters for each operation.
//!
//! Form fields arrive as untyped strings. Each operation's parameter struct is
//! built from a [`FormFields`] bag at the request boundary:
//!
//! - missing or blank fields take the documented default
//! - present but malformed fields are rejected with
//!   [`TransformError::InvalidParameter`] (HTTP 400), never coerced
//! - unrecognised fields are ignored

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::TransformError;
use crate::format::OutputFormat;

use super::TransformLimits;

/// Default quality for the compress operation.
pub const DEFAULT_COMPRESS_QUALITY: u8 = 75;

/// Fixed quality used by the convert operation.
pub const CONVERT_QUALITY: u8 = 90;

/// Minimum accepted quality.
pub const MIN_QUALITY: u8 = 1;

/// Maximum accepted quality.
pub const MAX_QUALITY: u8 = 100;

/// Default output format for compress and convert.
pub const DEFAULT_COMPRESS_FORMAT: OutputFormat = OutputFormat::WebP;

/// Default output format for resize.
pub const DEFAULT_RESIZE_FORMAT: OutputFormat = OutputFormat::Png;

/// Mask label preferred by background removal.
pub const PREFERRED_SUBJECT_LABEL: &str = "person";

// =============================================================================
// FormFields
// =============================================================================

/// The text fields of a multipart upload.
#[derive(Debug, Clone, Default)]
pub struct FormFields {
    values: HashMap<String, String>,
}

impl FormFields {
    /// Create an empty field bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a field. Later values win.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Builder form of [`FormFields::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Get a trimmed field value, treating blank values as absent.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Number of fields present (including blank ones).
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no fields were sent.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn parse_u32(&self, name: &'static str) -> Result<Option<u32>, TransformError> {
        self.get(name)
            .map(|raw| {
                raw.parse::<u32>()
                    .map_err(|_| TransformError::invalid(name, format!("'{}' is not a whole number", raw)))
            })
            .transpose()
    }

    fn parse_format(
        &self,
        name: &'static str,
        default: OutputFormat,
    ) -> Result<OutputFormat, TransformError> {
        match self.get(name) {
            Some(raw) => raw
                .parse()
                .map_err(|e: crate::format::UnknownFormat| TransformError::invalid(name, e.to_string())),
            None => Ok(default),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = FormFields::new();
        for (k, v) in iter {
            fields.insert(k, v);
        }
        fields
    }
}

// =============================================================================
// FitStrategy
// =============================================================================

/// How source pixels map into a `width x height` target when aspect ratios differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FitStrategy {
    /// Scale to cover the target, then crop the overflow (centred).
    #[default]
    Cover,
    /// Scale to fit within the target, then letterbox onto a canvas.
    Contain,
    /// Stretch to exactly the target, ignoring aspect ratio.
    Fill,
    /// Scale to fit within the target; output may be smaller on one axis.
    Inside,
    /// Scale to cover the target; output may be larger on one axis.
    Outside,
}

impl FitStrategy {
    /// Name as accepted in the `fit` field.
    pub const fn name(&self) -> &'static str {
        match self {
            FitStrategy::Cover => "cover",
            FitStrategy::Contain => "contain",
            FitStrategy::Fill => "fill",
            FitStrategy::Inside => "inside",
            FitStrategy::Outside => "outside",
        }
    }
}

impl fmt::Display for FitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FitStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cover" => Ok(FitStrategy::Cover),
            "contain" => Ok(FitStrategy::Contain),
            "fill" => Ok(FitStrategy::Fill),
            "inside" => Ok(FitStrategy::Inside),
            "outside" => Ok(FitStrategy::Outside),
            _ => Err(format!(
                "unknown fit '{}' (expected one of: cover, contain, fill, inside, outside)",
                s
            )),
        }
    }
}

// =============================================================================
// Operation Parameters
// =============================================================================

/// Parameters for the compress operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressParams {
    /// Encoder quality, 1-100. Ignored for PNG.
    pub quality: u8,
    pub format: OutputFormat,
}

impl Default for CompressParams {
    fn default() -> Self {
        Self {
            quality: DEFAULT_COMPRESS_QUALITY,
            format: DEFAULT_COMPRESS_FORMAT,
        }
    }
}

impl CompressParams {
    pub fn from_fields(fields: &FormFields) -> Result<Self, TransformError> {
        let quality = match fields.parse_u32("quality")? {
            Some(q) if (MIN_QUALITY as u32..=MAX_QUALITY as u32).contains(&q) => q as u8,
            Some(q) => {
                return Err(TransformError::invalid(
                    "quality",
                    format!("{} is out of range (must be {}-{})", q, MIN_QUALITY, MAX_QUALITY),
                ))
            }
            None => DEFAULT_COMPRESS_QUALITY,
        };

        Ok(Self {
            quality,
            format: fields.parse_format("format", DEFAULT_COMPRESS_FORMAT)?,
        })
    }
}

/// Parameters for the convert operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertParams {
    pub format: OutputFormat,
}

impl Default for ConvertParams {
    fn default() -> Self {
        Self {
            format: DEFAULT_COMPRESS_FORMAT,
        }
    }
}

impl ConvertParams {
    pub fn from_fields(fields: &FormFields) -> Result<Self, TransformError> {
        Ok(Self {
            format: fields.parse_format("format", DEFAULT_COMPRESS_FORMAT)?,
        })
    }
}

/// Parameters for the resize operation.
///
/// With neither dimension set, the image passes through at its original size.
/// With one dimension set, the other follows the source aspect ratio
/// regardless of `fit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeParams {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fit: FitStrategy,
    pub format: OutputFormat,
}

impl Default for ResizeParams {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            fit: FitStrategy::Cover,
            format: DEFAULT_RESIZE_FORMAT,
        }
    }
}

impl ResizeParams {
    pub fn from_fields(fields: &FormFields, limits: &TransformLimits) -> Result<Self, TransformError> {
        let width = Self::dimension(fields, "width", limits)?;
        let height = Self::dimension(fields, "height", limits)?;

        let fit = match fields.get("fit") {
            Some(raw) => raw
                .parse()
                .map_err(|reason: String| TransformError::invalid("fit", reason))?,
            None => FitStrategy::default(),
        };

        Ok(Self {
            width,
            height,
            fit,
            format: fields.parse_format("format", DEFAULT_RESIZE_FORMAT)?,
        })
    }

    fn dimension(
        fields: &FormFields,
        name: &'static str,
        limits: &TransformLimits,
    ) -> Result<Option<u32>, TransformError> {
        match fields.parse_u32(name)? {
            Some(0) => Err(TransformError::invalid(name, "must be at least 1")),
            Some(v) if v > limits.max_dimension => Err(TransformError::invalid(
                name,
                format!("{} exceeds the maximum of {}", v, limits.max_dimension),
            )),
            other => Ok(other),
        }
    }
}

/// Parameters for background removal. The output is always PNG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveBackgroundParams {
    /// Mask label to prefer over the largest-area fallback.
    pub preferred_label: String,
}

impl Default for RemoveBackgroundParams {
    fn default() -> Self {
        Self {
            preferred_label: PREFERRED_SUBJECT_LABEL.to_string(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
