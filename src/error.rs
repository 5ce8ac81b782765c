use thiserror::Error;

/// Errors raised by a segmentation model while loading or running inference.
#[derive(Debug, Clone, Error)]
pub enum SegmentError {
    /// The model could not be constructed or its configuration is invalid
    #[error("Model load failed: {0}")]
    Load(String),

    /// Inference over an image failed
    #[error("Inference failed: {0}")]
    Inference(String),
}

/// Errors that can occur anywhere in the transform pipeline.
///
/// Variants split into two classes: validation errors (the caller sent
/// something unusable, mapped to 4xx) and processing errors (the codec, model
/// or temp storage failed, mapped to 500).
#[derive(Debug, Clone, Error)]
pub enum TransformError {
    /// No file field was present in the upload
    #[error("No file provided")]
    MissingFile,

    /// The upload is not an image type the codec can decode
    #[error("Invalid file type: {detail}")]
    UnsupportedMediaType { detail: String },

    /// A form parameter was present but malformed or out of range
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// The multipart body itself could not be read
    #[error("Malformed upload: {message}")]
    MalformedUpload { message: String },

    /// Segmentation produced no mask to keep
    #[error("No suitable object detected")]
    NoSubject,

    /// The decoded image exceeds the configured decode limits
    #[error("Image too large: {message}")]
    ImageTooLarge { message: String },

    /// The codec failed to decode the input bytes
    #[error("Decode failed: {message}")]
    Decode { message: String },

    /// A geometric transform failed
    #[error("Transform failed: {message}")]
    Transform { message: String },

    /// The codec failed to encode the output
    #[error("Encode failed: {message}")]
    Encode { message: String },

    /// The segmentation model failed to load or run
    #[error("Segmentation model error: {0}")]
    Model(#[from] SegmentError),

    /// Applying the mask as an alpha layer failed
    #[error("Compositing failed: {message}")]
    Composite { message: String },

    /// Temporary file I/O failed
    #[error("I/O error: {message}")]
    Io { message: String },
}

impl TransformError {
    /// Shorthand for an [`TransformError::InvalidParameter`].
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        TransformError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    /// Whether this error was caused by the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TransformError::MissingFile
                | TransformError::UnsupportedMediaType { .. }
                | TransformError::InvalidParameter { .. }
                | TransformError::MalformedUpload { .. }
                | TransformError::NoSubject
                | TransformError::ImageTooLarge { .. }
        )
    }
}

impl From<std::io::Error> for TransformError {
    fn from(err: std::io::Error) -> Self {
        TransformError::Io {
            message: err.to_string(),
        }
    }
}
