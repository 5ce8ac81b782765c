//! Router configuration for the media transformer.
//!
//! This module defines the HTTP routes and applies middleware for body
//! limits, CORS and tracing.
//!
//! # Route Structure
//!
//! ```text
//! /health                    - Health check
//! /api/compress              - POST multipart
//! /api/convert               - POST multipart
//! /api/resize                - POST multipart
//! /api/remove-background     - POST multipart
//! ```
//!
//! # Example
//!
//! ```ignore
//! use media_transformer::server::{create_router, RouterConfig};
//! use media_transformer::transform::{MediaTransformer, TransformLimits};
//! use media_transformer::segment::SaliencyConfig;
//!
//! let transformer = MediaTransformer::with_saliency(
//!     TransformLimits::default(),
//!     SaliencyConfig::default(),
//! );
//!
//! let config = RouterConfig::new()
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//!
//! let router = create_router(transformer, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    compress_handler, convert_handler, health_handler, remove_background_handler, resize_handler,
    AppState, X_IMAGE_HEIGHT, X_IMAGE_WIDTH,
};
use crate::transform::MediaTransformer;
use crate::upload::UploadOptions;

/// Default request body limit (25 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,

    /// Maximum request body size in bytes
    pub max_upload_bytes: usize,

    /// How upload bodies are buffered
    pub upload: UploadOptions,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterConfig {
    /// Create a router configuration.
    ///
    /// By default:
    /// - CORS allows any origin
    /// - Tracing is enabled
    /// - Bodies are capped at 25 MiB and buffered in memory
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            enable_tracing: true,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            upload: UploadOptions::default(),
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }

    /// Set the request body limit.
    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    /// Set how uploads are buffered.
    pub fn with_upload_options(mut self, upload: UploadOptions) -> Self {
        self.upload = upload;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the application router.
///
/// The router carries:
/// - the four transform routes under `/api`
/// - the health check
/// - a body limit, CORS and (optionally) request tracing
pub fn create_router(transformer: MediaTransformer, config: RouterConfig) -> Router {
    let app_state = AppState::new(transformer).with_upload_options(config.upload.clone());
    let cors = build_cors_layer(&config);

    let api_routes = Router::new()
        .route("/compress", post(compress_handler))
        .route("/convert", post(convert_handler))
        .route("/resize", post(resize_handler))
        .route("/remove-background", post(remove_background_handler))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .with_state(app_state);

    let router = Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api_routes)
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::POST, Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .expose_headers([CONTENT_DISPOSITION, X_IMAGE_WIDTH, X_IMAGE_HEIGHT])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
