//! Configuration management for the media transformer.
//!
//! This module provides a flexible configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables with `MEDIA_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use media_transformer::config::{Cli, Command};
//!
//! match Cli::parse().into_command() {
//!     Command::Serve(config) => println!("Listening on {}", config.bind_address()),
//!     Command::Process(config) => println!("Running {}", config.operation),
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `MEDIA_HOST` - Server bind address (default: 0.0.0.0)
//! - `MEDIA_PORT` - Server port (default: 3000)
//! - `MEDIA_MAX_UPLOAD_BYTES` - Request body limit (default: 25 MiB)
//! - `MEDIA_MAX_DIMENSION` - Largest resize dimension (default: 8192)
//! - `MEDIA_MAX_DECODE_DIMENSION` - Largest decodable dimension (default: 16384)
//! - `MEDIA_BUFFER_TO_DISK` - Buffer uploads in temp files (default: false)
//! - `MEDIA_TEMP_DIR` - Directory for temp files (default: system temp)
//! - `MEDIA_SEGMENT_WORKING_SIZE` - Segmentation working size (default: 320)
//! - `MEDIA_SEGMENT_MIN_CONTRAST` - Foreground contrast threshold (default: 24)
//! - `MEDIA_SEGMENT_MIN_AREA` - Smallest kept region fraction (default: 0.005)
//! - `MEDIA_CORS_ORIGINS` - Allowed CORS origins, comma-separated (default: any)

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::segment::{
    SaliencyConfig, DEFAULT_MIN_AREA_FRACTION, DEFAULT_MIN_CONTRAST, DEFAULT_WORKING_SIZE,
};
use crate::server::DEFAULT_MAX_UPLOAD_BYTES;
use crate::transform::{
    FitStrategy, FormFields, Operation, TransformLimits, DEFAULT_MAX_DECODE_DIMENSION,
    DEFAULT_MAX_DIMENSION,
};
use crate::upload::UploadOptions;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3000;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Media Transformer - compress, convert, resize and cut out images over HTTP.
#[derive(Parser, Debug, Clone)]
#[command(name = "media-transformer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP server.
    Serve(ServeConfig),

    /// Run one operation on a local file.
    Process(ProcessConfig),
}

/// Options shared by every command that runs the pipeline.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct PipelineArgs {
    /// Largest width or height a resize may request or produce.
    #[arg(long, default_value_t = DEFAULT_MAX_DIMENSION, env = "MEDIA_MAX_DIMENSION")]
    pub max_dimension: u32,

    /// Largest width or height the decoder will accept.
    #[arg(long, default_value_t = DEFAULT_MAX_DECODE_DIMENSION, env = "MEDIA_MAX_DECODE_DIMENSION")]
    pub max_decode_dimension: u32,

    /// Longest side of the image the segmenter works on.
    #[arg(long, default_value_t = DEFAULT_WORKING_SIZE, env = "MEDIA_SEGMENT_WORKING_SIZE")]
    pub segment_working_size: u32,

    /// Minimum colour distance from the background to count as foreground.
    #[arg(long, default_value_t = DEFAULT_MIN_CONTRAST, env = "MEDIA_SEGMENT_MIN_CONTRAST")]
    pub segment_min_contrast: u8,

    /// Smallest kept region, as a fraction of the working image.
    #[arg(long, default_value_t = DEFAULT_MIN_AREA_FRACTION, env = "MEDIA_SEGMENT_MIN_AREA")]
    pub segment_min_area: f32,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Default for PipelineArgs {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            max_decode_dimension: DEFAULT_MAX_DECODE_DIMENSION,
            segment_working_size: DEFAULT_WORKING_SIZE,
            segment_min_contrast: DEFAULT_MIN_CONTRAST,
            segment_min_area: DEFAULT_MIN_AREA_FRACTION,
            verbose: false,
        }
    }
}

impl PipelineArgs {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_dimension == 0 {
            return Err("max_dimension must be greater than 0".to_string());
        }
        if self.max_decode_dimension == 0 {
            return Err("max_decode_dimension must be greater than 0".to_string());
        }
        self.saliency().validate()
    }

    pub fn limits(&self) -> TransformLimits {
        TransformLimits {
            max_dimension: self.max_dimension,
            max_decode_dimension: self.max_decode_dimension,
        }
    }

    pub fn saliency(&self) -> SaliencyConfig {
        SaliencyConfig {
            working_size: self.segment_working_size,
            min_contrast: self.segment_min_contrast,
            min_area_fraction: self.segment_min_area,
        }
    }
}

// =============================================================================
// Serve
// =============================================================================

#[derive(Args, Debug, Clone, PartialEq)]
pub struct ServeConfig {
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "MEDIA_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "MEDIA_PORT")]
    pub port: u16,

    /// Maximum request body size in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES, env = "MEDIA_MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: usize,

    /// Stream uploaded files to temporary files instead of memory.
    #[arg(long, default_value_t = false, env = "MEDIA_BUFFER_TO_DISK")]
    pub buffer_to_disk: bool,

    /// Directory for temporary upload files.
    #[arg(long, env = "MEDIA_TEMP_DIR")]
    pub temp_dir: Option<PathBuf>,

    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "MEDIA_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.host.trim().is_empty() {
            return Err("host must not be empty".to_string());
        }
        if self.max_upload_bytes == 0 {
            return Err("max_upload_bytes must be greater than 0".to_string());
        }
        if let Some(dir) = &self.temp_dir {
            if !dir.is_dir() {
                return Err(format!("temp_dir {} is not a directory", dir.display()));
            }
        }
        self.pipeline.validate()
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn upload_options(&self) -> UploadOptions {
        UploadOptions {
            buffer_to_disk: self.buffer_to_disk,
            temp_dir: self.temp_dir.clone(),
        }
    }
}

// =============================================================================
// Process
// =============================================================================

#[derive(Args, Debug, Clone, PartialEq)]
pub struct ProcessConfig {
    /// Operation to run.
    #[arg(value_enum)]
    pub operation: Operation,

    /// Input image path.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Where to write the result.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Encoder quality for compress (1-100).
    #[arg(long)]
    pub quality: Option<u8>,

    /// Output format (png, jpeg, webp, avif).
    #[arg(long)]
    pub format: Option<String>,

    /// Target width for resize.
    #[arg(long)]
    pub width: Option<u32>,

    /// Target height for resize.
    #[arg(long)]
    pub height: Option<u32>,

    /// Fit strategy for resize.
    #[arg(long)]
    pub fit: Option<String>,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

impl ProcessConfig {
    /// Express the flags as the same form fields an HTTP upload would carry.
    ///
    /// `fit` is passed through as text so that an unknown value is reported
    /// the same way the server reports it.
    pub fn fields(&self) -> FormFields {
        let mut fields = FormFields::new();
        if let Some(quality) = self.quality {
            fields.insert("quality", quality.to_string());
        }
        if let Some(format) = &self.format {
            fields.insert("format", format.clone());
        }
        if let Some(width) = self.width {
            fields.insert("width", width.to_string());
        }
        if let Some(height) = self.height {
            fields.insert("height", height.to_string());
        }
        if let Some(fit) = &self.fit {
            fields.insert("fit", fit.clone());
        }
        fields
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.input == self.output {
            return Err("input and output must be different files".to_string());
        }
        if let Some(fit) = &self.fit {
            fit.parse::<FitStrategy>()?;
        }
        self.pipeline.validate()
    }
}

// =============================================================================
// Tests
// =============================================================================
