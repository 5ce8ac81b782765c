//! HTTP server layer for the media transformer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │          POST /api/{compress,convert,resize,remove-background}  │
//! │                                                                 │
//! │  ┌──────────────────────────────┐  ┌─────────────────────────┐  │
//! │  │          handlers            │  │        routes           │  │
//! │  │ (multipart → transform → img)│  │ (limits, CORS, tracing) │  │
//! │  └──────────────────────────────┘  └─────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    compress_handler, convert_handler, health_handler, remove_background_handler, resize_handler,
    AppState, ErrorResponse, HandlerError, HealthResponse, X_IMAGE_HEIGHT, X_IMAGE_WIDTH,
};
pub use routes::{create_router, RouterConfig, DEFAULT_MAX_UPLOAD_BYTES};
