//! Multipart upload handling.
//!
//! An upload is split into one [`UploadedFile`] and a [`FormFields`] bag of
//! text fields. The file body is kept either in memory or, when disk
//! buffering is enabled, streamed into a temporary file.
//!
//! # Temp file lifetime
//!
//! A disk-buffered body is owned by a [`tempfile::NamedTempFile`] inside the
//! `UploadedFile`. The file is removed when the `UploadedFile` is dropped,
//! which covers success, validation failure, codec failure and unwinding.

use std::fmt;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::Multipart;
use bytes::Bytes;
use http::StatusCode;
use image::DynamicImage;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::TransformError;
use crate::format::{detect_input_format, validate_declared_type, InputFormat, SNIFF_LEN};
use crate::transform::codec;
use crate::transform::{FormFields, TransformLimits};

// =============================================================================
// Upload Options
// =============================================================================

/// Where uploaded file bodies are buffered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOptions {
    /// Stream file bodies to a temporary file instead of memory.
    pub buffer_to_disk: bool,

    /// Directory for temporary files (system temp dir if `None`).
    pub temp_dir: Option<PathBuf>,
}

impl UploadOptions {
    /// Keep uploads in memory.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Buffer uploads to temporary files in `temp_dir`.
    pub fn on_disk(temp_dir: Option<PathBuf>) -> Self {
        Self {
            buffer_to_disk: true,
            temp_dir,
        }
    }

    fn create_temp_file(&self) -> std::io::Result<NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("upload-");
        match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
    }
}

// =============================================================================
// UploadedFile
// =============================================================================

enum UploadBody {
    Memory(Bytes),
    Disk(NamedTempFile),
}

/// An uploaded file, owned by a single request.
pub struct UploadedFile {
    /// Original filename, if the client sent one
    pub file_name: Option<String>,

    /// Declared MIME type, if the client sent one
    pub content_type: Option<String>,

    body: UploadBody,
    len: u64,
}

impl UploadedFile {
    /// Wrap an in-memory body.
    pub fn from_bytes(
        data: impl Into<Bytes>,
        file_name: Option<String>,
        content_type: Option<String>,
    ) -> Self {
        let data = data.into();
        Self {
            file_name,
            content_type,
            len: data.len() as u64,
            body: UploadBody::Memory(data),
        }
    }

    /// Size of the body in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the body is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Path of the backing temp file, if disk-buffered.
    pub fn temp_path(&self) -> Option<&Path> {
        match &self.body {
            UploadBody::Memory(_) => None,
            UploadBody::Disk(file) => Some(file.path()),
        }
    }

    fn header(&self) -> Result<Vec<u8>, TransformError> {
        match &self.body {
            UploadBody::Memory(data) => Ok(data[..data.len().min(SNIFF_LEN)].to_vec()),
            UploadBody::Disk(file) => {
                let mut header = Vec::with_capacity(SNIFF_LEN);
                file.reopen()?
                    .take(SNIFF_LEN as u64)
                    .read_to_end(&mut header)?;
                Ok(header)
            }
        }
    }

    /// Validate the declared type and sniff the content.
    ///
    /// Runs before any decoding so that non-image uploads are rejected as
    /// client errors.
    pub fn detect_format(&self) -> Result<InputFormat, TransformError> {
        validate_declared_type(self.content_type.as_deref())?;
        detect_input_format(&self.header()?)
    }

    /// Decode the body as `format`.
    pub fn decode(
        &self,
        format: InputFormat,
        limits: &TransformLimits,
    ) -> Result<DynamicImage, TransformError> {
        match &self.body {
            UploadBody::Memory(data) => codec::decode(data, format, limits),
            UploadBody::Disk(file) => codec::decode_file(file.path(), format, limits),
        }
    }
}

impl fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.len)
            .field("temp_path", &self.temp_path())
            .finish()
    }
}

// =============================================================================
// Multipart Parsing
// =============================================================================

/// A parsed multipart upload.
#[derive(Debug, Default)]
pub struct UploadForm {
    /// The file, if one of the accepted file fields carried a non-empty body
    pub file: Option<UploadedFile>,

    /// All text fields
    pub fields: FormFields,
}

fn malformed(err: MultipartError) -> TransformError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        TransformError::ImageTooLarge {
            message: "upload exceeds the size limit".to_string(),
        }
    } else {
        TransformError::MalformedUpload {
            message: err.body_text(),
        }
    }
}

async fn read_file_field(
    mut field: Field<'_>,
    options: &UploadOptions,
) -> Result<UploadedFile, TransformError> {
    let file_name = field.file_name().map(str::to_string);
    let content_type = field.content_type().map(str::to_string);

    if !options.buffer_to_disk {
        let data = field.bytes().await.map_err(malformed)?;
        return Ok(UploadedFile::from_bytes(data, file_name, content_type));
    }

    let mut temp = options.create_temp_file()?;
    let mut len = 0u64;
    while let Some(chunk) = field.chunk().await.map_err(malformed)? {
        temp.as_file_mut().write_all(&chunk)?;
        len += chunk.len() as u64;
    }
    temp.as_file_mut().flush()?;

    debug!(path = %temp.path().display(), bytes = len, "Buffered upload to disk");

    Ok(UploadedFile {
        file_name,
        content_type,
        body: UploadBody::Disk(temp),
        len,
    })
}

/// Read a multipart body.
///
/// `file_fields` lists the field names that may carry the file, in priority
/// order. An empty file part (a form submitted with no file chosen) counts as
/// absent. Other file parts are read and discarded.
pub async fn read_multipart(
    mut multipart: Multipart,
    file_fields: &[&str],
    options: &UploadOptions,
) -> Result<UploadForm, TransformError> {
    let mut form = UploadForm::default();
    let mut file_rank = usize::MAX;

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();

        if let Some(rank) = file_fields.iter().position(|f| *f == name) {
            let file = read_file_field(field, options).await?;
            if !file.is_empty() && rank < file_rank {
                form.file = Some(file);
                file_rank = rank;
            }
        } else if field.file_name().is_some() {
            // Unrelated file part; drain it
            field.bytes().await.map_err(malformed)?;
        } else {
            let value = field.text().await.map_err(malformed)?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

// =============================================================================
// Tests
// =============================================================================
