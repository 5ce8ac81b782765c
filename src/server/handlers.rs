//! HTTP request handlers for the transform API.
//!
//! # Endpoints
//!
//! - `POST /api/compress` - Re-encode at a given quality
//! - `POST /api/convert` - Re-encode into another format
//! - `POST /api/resize` - Resize with a fit strategy
//! - `POST /api/remove-background` - Segment and cut out the subject
//! - `GET /health` - Health check endpoint
//!
//! All four POST handlers share one skeleton: read the multipart body,
//! require a file, hand it to the [`MediaTransformer`], and stream the encoded
//! bytes back.

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::TransformError;
use crate::transform::{MediaTransformer, Operation, TransformResult};
use crate::upload::{read_multipart, UploadOptions};

/// Output width header.
pub const X_IMAGE_WIDTH: HeaderName = HeaderName::from_static("x-image-width");

/// Output height header.
pub const X_IMAGE_HEIGHT: HeaderName = HeaderName::from_static("x-image-height");

// =============================================================================
// Application State
// =============================================================================

/// Shared application state.
///
/// This is passed to all handlers via Axum's State extractor.
#[derive(Clone)]
pub struct AppState {
    /// Runs the transforms and owns the segmentation model slot
    pub transformer: Arc<MediaTransformer>,

    /// Where upload bodies are buffered
    pub upload: UploadOptions,
}

impl AppState {
    pub fn new(transformer: MediaTransformer) -> Self {
        Self {
            transformer: Arc::new(transformer),
            upload: UploadOptions::default(),
        }
    }

    /// Set how uploads are buffered.
    pub fn with_upload_options(mut self, upload: UploadOptions) -> Self {
        self.upload = upload;
        self
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short, stable description of the failure
    pub error: String,

    /// Extra detail about the failure, when there is any worth showing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

// =============================================================================
// Error Handling
// =============================================================================

/// A [`TransformError`] tagged with the operation it came from.
///
/// The operation is needed to word the 500 message and to decide whether
/// processing details are exposed.
#[derive(Debug)]
pub struct HandlerError {
    pub operation: Operation,
    pub error: TransformError,
}

impl HandlerError {
    pub fn new(operation: Operation, error: TransformError) -> Self {
        Self { operation, error }
    }

    fn status(&self) -> StatusCode {
        match &self.error {
            TransformError::ImageTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match &self.error {
            TransformError::MissingFile => "missing_file",
            TransformError::UnsupportedMediaType { .. } => "invalid_file_type",
            TransformError::InvalidParameter { .. } => "invalid_parameter",
            TransformError::MalformedUpload { .. } => "malformed_upload",
            TransformError::NoSubject => "no_subject",
            TransformError::ImageTooLarge { .. } => "image_too_large",
            TransformError::Decode { .. } => "decode_error",
            TransformError::Transform { .. } => "transform_error",
            TransformError::Encode { .. } => "encode_error",
            TransformError::Model(_) => "model_error",
            TransformError::Composite { .. } => "composite_error",
            TransformError::Io { .. } => "io_error",
        }
    }

    fn body(&self) -> ErrorResponse {
        match &self.error {
            TransformError::MissingFile => ErrorResponse::new("No file provided"),
            TransformError::UnsupportedMediaType { detail } => {
                ErrorResponse::with_details("Invalid file type", detail.clone())
            }
            TransformError::InvalidParameter { name, reason } => {
                ErrorResponse::with_details(format!("Invalid parameter '{}'", name), reason.clone())
            }
            TransformError::MalformedUpload { message } => {
                ErrorResponse::with_details("Malformed upload", message.clone())
            }
            TransformError::NoSubject => ErrorResponse::new("No suitable object detected"),
            TransformError::ImageTooLarge { message } => {
                ErrorResponse::with_details("Image too large", message.clone())
            }
            other => {
                let message = self.operation.failure_message();
                match (self.operation, other) {
                    (Operation::RemoveBackground, TransformError::Model(_)) => {
                        ErrorResponse::with_details(message, "segmentation model failed")
                    }
                    (Operation::RemoveBackground, TransformError::Composite { .. }) => {
                        ErrorResponse::with_details(message, "mask compositing failed")
                    }
                    _ => ErrorResponse::new(message),
                }
            }
        }
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_type = self.error_type();
        let operation = self.operation.name();

        if status.is_server_error() {
            error!(
                operation,
                status = status.as_u16(),
                error_type,
                error = %self.error,
                "Transform failed"
            );
        } else if matches!(
            self.error,
            TransformError::MissingFile | TransformError::NoSubject
        ) {
            debug!(operation, status = status.as_u16(), error_type, "Request rejected");
        } else {
            warn!(
                operation,
                status = status.as_u16(),
                error_type,
                error = %self.error,
                "Request rejected"
            );
        }

        (status, Json(self.body())).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Build the success response for an encoded image.
fn image_response(result: TransformResult) -> Response {
    (
        [
            (header::CONTENT_TYPE, result.content_type().to_string()),
            (header::CONTENT_DISPOSITION, result.content_disposition()),
            (header::CACHE_CONTROL, "no-store".to_string()),
            (X_IMAGE_WIDTH, result.width.to_string()),
            (X_IMAGE_HEIGHT, result.height.to_string()),
        ],
        result.data,
    )
        .into_response()
}

async fn handle(
    state: AppState,
    operation: Operation,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, HandlerError> {
    let fail = |error: TransformError| HandlerError::new(operation, error);

    let multipart = multipart.map_err(|rejection| {
        fail(TransformError::MalformedUpload {
            message: rejection.body_text(),
        })
    })?;

    let form = read_multipart(multipart, operation.file_fields(), &state.upload)
        .await
        .map_err(fail)?;
    let file = form.file.ok_or_else(|| fail(TransformError::MissingFile))?;

    debug!(
        %operation,
        file_name = ?file.file_name,
        content_type = ?file.content_type,
        bytes = file.len(),
        fields = form.fields.len(),
        "Processing upload"
    );

    let result = state
        .transformer
        .run(operation, file, &form.fields)
        .await
        .map_err(fail)?;

    Ok(image_response(result))
}

/// Handle `POST /api/compress`.
///
/// Fields: `file`, `quality` (1-100, default 75), `format` (default webp).
pub async fn compress_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, HandlerError> {
    handle(state, Operation::Compress, multipart).await
}

/// Handle `POST /api/convert`.
///
/// Fields: `file`, `format` (default webp).
pub async fn convert_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, HandlerError> {
    handle(state, Operation::Convert, multipart).await
}

/// Handle `POST /api/resize`.
///
/// Fields: `file`, `width`, `height`, `fit` (default cover), `format` (default png).
pub async fn resize_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, HandlerError> {
    handle(state, Operation::Resize, multipart).await
}

/// Handle `POST /api/remove-background`.
///
/// Fields: `file` or `image`. Always responds with a PNG.
pub async fn remove_background_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, HandlerError> {
    handle(state, Operation::RemoveBackground, multipart).await
}

/// Health check endpoint.
///
/// Returns a simple JSON response indicating the service is running.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================
