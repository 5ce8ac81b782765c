//! Disk-buffered upload tests.
//!
//! Tests verify that temporary upload files are removed on every exit path:
//! success, validation failure and processing failure.

use std::path::Path;

use axum::http::StatusCode;
use axum::Router;
use tower::ServiceExt;

use media_transformer::{RouterConfig, UploadOptions};

use super::test_utils::{
    body_bytes, image_dimensions, multipart_request, router_with_config, solid_png,
    MultipartBuilder,
};

fn disk_router(dir: &Path) -> Router {
    router_with_config(
        RouterConfig::new()
            .with_tracing(false)
            .with_upload_options(UploadOptions::on_disk(Some(dir.to_path_buf()))),
    )
}

fn leftover_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

#[tokio::test]
async fn test_disk_buffered_success_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let body = MultipartBuilder::new()
        .png(&solid_png(120, 60, [0, 0, 255]))
        .text("width", "60")
        .build();

    let response = disk_router(dir.path())
        .oneshot(multipart_request("/api/resize", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(image_dimensions(&body_bytes(response).await), (60, 30));
    assert_eq!(leftover_files(dir.path()), 0);
}

#[tokio::test]
async fn test_disk_buffered_validation_failure_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let body = MultipartBuilder::new()
        .file(
            "file",
            "data.bin",
            "application/octet-stream",
            b"not an image at all",
        )
        .build();

    let response = disk_router(dir.path())
        .oneshot(multipart_request("/api/convert", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(leftover_files(dir.path()), 0);
}

#[tokio::test]
async fn test_disk_buffered_parameter_failure_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let body = MultipartBuilder::new()
        .png(&solid_png(10, 10, [0, 0, 0]))
        .text("quality", "loud")
        .build();

    let response = disk_router(dir.path())
        .oneshot(multipart_request("/api/compress", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(leftover_files(dir.path()), 0);
}

#[tokio::test]
async fn test_disk_buffered_decode_failure_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let mut png = solid_png(50, 50, [5, 5, 5]);
    png.truncate(48);
    let body = MultipartBuilder::new().png(&png).build();

    let response = disk_router(dir.path())
        .oneshot(multipart_request("/api/compress", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(leftover_files(dir.path()), 0);
}

#[tokio::test]
async fn test_disk_buffered_background_removal() {
    let dir = tempfile::tempdir().unwrap();
    let body = MultipartBuilder::new()
        .file(
            "image",
            "portrait.png",
            "image/png",
            &super::test_utils::subject_png(80, 80),
        )
        .build();

    let response = disk_router(dir.path())
        .oneshot(multipart_request("/api/remove-background", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(leftover_files(dir.path()), 0);
}
