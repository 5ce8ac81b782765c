//! Resize integration tests.
//!
//! Tests verify:
//! - Each fit strategy produces the documented output size
//! - One-dimension requests preserve aspect ratio
//! - Dimension and fit validation

use axum::http::StatusCode;
use tower::ServiceExt;

use super::test_utils::{
    body_bytes, error_body, header_str, image_dimensions, multipart_request, solid_png,
    test_router, MultipartBuilder,
};

/// Resize a 200x100 PNG with the given text fields.
async fn resize(fields: &[(&str, &str)]) -> axum::response::Response {
    let mut builder = MultipartBuilder::new().png(&solid_png(200, 100, [30, 60, 90]));
    for (name, value) in fields {
        builder = builder.text(name, value);
    }

    test_router()
        .oneshot(multipart_request("/api/resize", builder.build()))
        .await
        .unwrap()
}

async fn resized_dimensions(fields: &[(&str, &str)]) -> (u32, u32) {
    let response = resize(fields).await;
    assert_eq!(response.status(), StatusCode::OK, "fields={fields:?}");
    image_dimensions(&body_bytes(response).await)
}

#[tokio::test]
async fn test_width_only_preserves_aspect() {
    let response = resize(&[("width", "100")]).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, "content-type"), "image/png");
    assert_eq!(
        header_str(&response, "content-disposition"),
        "attachment; filename=\"resize.png\""
    );
    assert_eq!(header_str(&response, "x-image-width"), "100");
    assert_eq!(header_str(&response, "x-image-height"), "50");
    assert_eq!(image_dimensions(&body_bytes(response).await), (100, 50));
}

#[tokio::test]
async fn test_height_only_preserves_aspect() {
    assert_eq!(resized_dimensions(&[("height", "25")]).await, (50, 25));
}

#[tokio::test]
async fn test_single_dimension_ignores_fit() {
    assert_eq!(
        resized_dimensions(&[("width", "100"), ("fit", "fill")]).await,
        (100, 50)
    );
}

#[tokio::test]
async fn test_no_dimensions_passthrough() {
    assert_eq!(resized_dimensions(&[]).await, (200, 100));
}

#[tokio::test]
async fn test_fill_is_exact() {
    assert_eq!(
        resized_dimensions(&[("width", "50"), ("height", "80"), ("fit", "fill")]).await,
        (50, 80)
    );
}

#[tokio::test]
async fn test_cover_is_default_and_exact() {
    assert_eq!(
        resized_dimensions(&[("width", "50"), ("height", "50")]).await,
        (50, 50)
    );
}

#[tokio::test]
async fn test_contain_letterboxes() {
    let response = resize(&[("width", "80"), ("height", "80"), ("fit", "contain")]).await;
    assert_eq!(response.status(), StatusCode::OK);

    let img = image::load_from_memory(&body_bytes(response).await)
        .unwrap()
        .to_rgba8();
    assert_eq!(img.dimensions(), (80, 80));
    // Source content is 80x40 centred, so the top rows are padding
    assert_eq!(img.get_pixel(40, 2)[3], 0);
    assert_eq!(img.get_pixel(40, 40)[3], 255);
}

#[tokio::test]
async fn test_inside_and_outside() {
    assert_eq!(
        resized_dimensions(&[("width", "80"), ("height", "80"), ("fit", "inside")]).await,
        (80, 40)
    );
    assert_eq!(
        resized_dimensions(&[("width", "80"), ("height", "80"), ("fit", "outside")]).await,
        (160, 80)
    );
}

#[tokio::test]
async fn test_resize_output_format() {
    let response = resize(&[("width", "40"), ("format", "jpeg")]).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, "content-type"), "image/jpeg");
    assert_eq!(
        header_str(&response, "content-disposition"),
        "attachment; filename=\"resize.jpeg\""
    );
    assert_eq!(image_dimensions(&body_bytes(response).await), (40, 20));
}

#[tokio::test]
async fn test_invalid_dimensions() {
    for (name, value) in [
        ("width", "0"),
        ("width", "-10"),
        ("height", "tall"),
        ("width", "100000"),
    ] {
        let response = resize(&[(name, value)]).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{name}={value}");
        assert_eq!(
            error_body(response).await.error,
            format!("Invalid parameter '{}'", name)
        );
    }
}

#[tokio::test]
async fn test_cover_crop_from_wide_source() {
    // Wider than the output limit, but the result is a 100x100 centre crop
    let body = MultipartBuilder::new()
        .png(&solid_png(9000, 100, [30, 60, 90]))
        .text("width", "100")
        .text("height", "100")
        .text("fit", "cover")
        .build();

    let response = test_router()
        .oneshot(multipart_request("/api/resize", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let out = image::load_from_memory(&body_bytes(response).await)
        .unwrap()
        .to_rgb8();
    assert_eq!(out.dimensions(), (100, 100));
    assert_eq!(out.get_pixel(50, 50).0, [30, 60, 90]);
}

#[tokio::test]
async fn test_computed_dimension_over_limit() {
    // 200x100 at height 8000 would need a width of 16000
    let response = resize(&[("height", "8000")]).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        error_body(response).await.error,
        "Invalid parameter 'dimensions'"
    );
}

#[tokio::test]
async fn test_invalid_fit() {
    let response = resize(&[("width", "10"), ("height", "10"), ("fit", "stretch")]).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = error_body(response).await;
    assert_eq!(error.error, "Invalid parameter 'fit'");
    assert!(error.details.unwrap().contains("cover"));
}

#[tokio::test]
async fn test_blank_fields_use_defaults() {
    assert_eq!(
        resized_dimensions(&[("width", ""), ("height", " "), ("fit", "")]).await,
        (200, 100)
    );
}
