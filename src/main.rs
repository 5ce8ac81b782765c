//! Media Transformer - image transforms over HTTP.
//!
//! This binary starts the HTTP server, or runs a single operation on a local
//! file through the same pipeline.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use media_transformer::{
    config::{Cli, Command, ProcessConfig, ServeConfig},
    server::{create_router, RouterConfig},
    transform::MediaTransformer,
    upload::UploadedFile,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Process(config) => run_process(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.pipeline.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Media Transformer v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!(
        "  Upload limit: {} bytes ({})",
        config.max_upload_bytes,
        if config.buffer_to_disk { "buffered to disk" } else { "in memory" }
    );
    if let Some(ref dir) = config.temp_dir {
        info!("  Temp dir: {}", dir.display());
    }
    info!(
        "  Max dimension: {} (decode limit {})",
        config.pipeline.max_dimension, config.pipeline.max_decode_dimension
    );
    info!(
        "  Segmenter: working size {}, min contrast {}, min area {}",
        config.pipeline.segment_working_size,
        config.pipeline.segment_min_contrast,
        config.pipeline.segment_min_area
    );
    match config.cors_origins {
        Some(ref origins) => info!("  CORS origins: {}", origins.join(", ")),
        None => info!("  CORS origins: any"),
    }

    let transformer =
        MediaTransformer::with_saliency(config.pipeline.limits(), config.pipeline.saliency());
    let router = create_router(transformer, build_router_config(&config));

    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!(
        "    curl -F file=@photo.jpg -F format=webp http://{}/api/compress -o out.webp",
        addr
    );
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "media_transformer=debug,tower_http=debug"
    } else {
        "media_transformer=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = RouterConfig::new()
        .with_max_upload_bytes(config.max_upload_bytes)
        .with_upload_options(config.upload_options())
        .with_tracing(!config.no_tracing);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config
}

// =============================================================================
// Process Command
// =============================================================================

async fn run_process(config: ProcessConfig) -> ExitCode {
    init_logging(config.pipeline.verbose);

    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let data = match tokio::fs::read(&config.input).await {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Error: cannot read {}: {}", config.input.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let file_name = config
        .input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned());
    let file = UploadedFile::from_bytes(data, file_name, None);

    let transformer =
        MediaTransformer::with_saliency(config.pipeline.limits(), config.pipeline.saliency());

    let result = match transformer
        .run(config.operation, file, &config.fields())
        .await
    {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = tokio::fs::write(&config.output, &result.data).await {
        eprintln!("Error: cannot write {}: {}", config.output.display(), e);
        return ExitCode::FAILURE;
    }

    println!(
        "{}: wrote {} ({}, {}x{}, {} bytes)",
        config.operation,
        config.output.display(),
        result.content_type(),
        result.width,
        result.height,
        result.data.len()
    );

    ExitCode::SUCCESS
}
