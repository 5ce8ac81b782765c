//! # Media Transformer
//!
//! A stateless HTTP service that takes one uploaded image per request and
//! returns a transformed one.
//!
//! ## Features
//!
//! - **Compress**: re-encode at a chosen quality into PNG, JPEG, WebP or AVIF
//! - **Convert**: re-encode into another format at a fixed quality
//! - **Resize**: five fit strategies (cover, contain, fill, inside, outside)
//! - **Remove background**: segment the image and keep one subject as a
//!   transparent PNG
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`upload`] - Multipart parsing, memory or temp-file buffering
//! - [`mod@format`] - Input detection and output formats
//! - [`transform`] - Parameters, resize geometry, codec and the transformer
//! - [`segment`] - Segmentation model slot, mask selection and compositing
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use media_transformer::{create_router, MediaTransformer, RouterConfig, SaliencyConfig, TransformLimits};
//!
//! #[tokio::main]
//! async fn main() {
//!     let transformer =
//!         MediaTransformer::with_saliency(TransformLimits::default(), SaliencyConfig::default());
//!     let router = create_router(transformer, RouterConfig::new());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod segment;
pub mod server;
pub mod transform;
pub mod upload;

// Re-export commonly used types
pub use config::{Cli, Command, PipelineArgs, ProcessConfig, ServeConfig};
pub use error::{SegmentError, TransformError};
pub use format::{InputFormat, OutputFormat};
pub use segment::{
    LazyModel, ModelLoader, SaliencyConfig, SaliencyModelLoader, SegmentMask, SegmentationModel,
};
pub use server::{create_router, AppState, ErrorResponse, HealthResponse, RouterConfig};
pub use transform::{
    FitStrategy, FormFields, MediaTransformer, Operation, TransformLimits, TransformResult,
};
pub use upload::{UploadOptions, UploadedFile};
