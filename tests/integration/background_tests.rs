//! Background removal integration tests.
//!
//! Tests verify:
//! - The built-in segmenter cuts a contrasting subject out of a plain backdrop
//! - Mask selection prefers "person", then the largest region
//! - Model load and inference failures map to 500 with details
//! - The model is loaded once, even under concurrent first requests

use axum::http::StatusCode;
use tower::ServiceExt;

use super::test_utils::{
    body_bytes, box_mask, error_body, header_str, multipart_request, router_with_loader,
    solid_png, subject_png, test_router, MultipartBuilder, StubLoader,
};

fn subject_upload(field: &str) -> Vec<u8> {
    MultipartBuilder::new()
        .file(field, "portrait.png", "image/png", &subject_png(100, 100))
        .build()
}

#[tokio::test]
async fn test_remove_background_smoke() {
    let response = test_router()
        .oneshot(multipart_request(
            "/api/remove-background",
            subject_upload("file"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, "content-type"), "image/png");
    assert_eq!(
        header_str(&response, "content-disposition"),
        "attachment; filename=\"remove-background.png\""
    );

    let out = image::load_from_memory(&body_bytes(response).await)
        .unwrap()
        .to_rgba8();
    assert_eq!(out.dimensions(), (100, 100));
    assert_eq!(out.get_pixel(2, 2)[3], 0, "backdrop should be transparent");
    assert_eq!(out.get_pixel(50, 50)[3], 255, "subject should be opaque");
    assert_eq!(&out.get_pixel(50, 50).0[..3], &[220, 20, 20]);
}

#[tokio::test]
async fn test_image_field_accepted() {
    let response = test_router()
        .oneshot(multipart_request(
            "/api/remove-background",
            subject_upload("image"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_image_field_only_for_background_removal() {
    let response = test_router()
        .oneshot(multipart_request("/api/compress", subject_upload("image")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_body(response).await.error, "No file provided");
}

#[tokio::test]
async fn test_plain_image_has_no_subject() {
    let body = MultipartBuilder::new()
        .png(&solid_png(64, 64, [240, 240, 240]))
        .build();

    let response = test_router()
        .oneshot(multipart_request("/api/remove-background", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        error_body(response).await.error,
        "No suitable object detected"
    );
}

#[tokio::test]
async fn test_prefers_person_mask() {
    // The "car" mask is larger, but "person" wins
    let loader = StubLoader::with_masks(vec![
        box_mask("car", 0.99, (10, 10), (0, 0, 10, 5)),
        box_mask("person", 0.7, (10, 10), (0, 5, 10, 5)),
    ]);

    let response = router_with_loader(loader)
        .oneshot(multipart_request(
            "/api/remove-background",
            subject_upload("file"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let out = image::load_from_memory(&body_bytes(response).await)
        .unwrap()
        .to_rgba8();
    assert_eq!(out.get_pixel(50, 10)[3], 0);
    assert_eq!(out.get_pixel(50, 90)[3], 255);
}

#[tokio::test]
async fn test_model_load_failure() {
    let loader = StubLoader {
        fail_load: true,
        ..StubLoader::default()
    };

    let response = router_with_loader(loader)
        .oneshot(multipart_request(
            "/api/remove-background",
            subject_upload("file"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let error = error_body(response).await;
    assert_eq!(error.error, "Failed to remove background");
    assert_eq!(error.details.as_deref(), Some("segmentation model failed"));
}

#[tokio::test]
async fn test_inference_failure() {
    let loader = StubLoader {
        fail_inference: true,
        ..StubLoader::default()
    };

    let response = router_with_loader(loader)
        .oneshot(multipart_request(
            "/api/remove-background",
            subject_upload("file"),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        error_body(response).await.details.as_deref(),
        Some("segmentation model failed")
    );
}

#[tokio::test]
async fn test_invalid_upload_does_not_load_model() {
    let loader = StubLoader::default();
    let router = router_with_loader(loader.clone());

    let body = MultipartBuilder::new()
        .file("file", "notes.txt", "text/plain", b"hello")
        .build();
    let response = router
        .oneshot(multipart_request("/api/remove-background", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(loader.load_count(), 0);
}

#[tokio::test]
async fn test_model_loaded_once_under_concurrency() {
    let loader = StubLoader::with_masks(vec![box_mask("person", 0.9, (4, 4), (1, 1, 2, 2))]);
    let router = router_with_loader(loader.clone());

    let requests = (0..6).map(|_| {
        let router = router.clone();
        tokio::spawn(async move {
            router
                .oneshot(multipart_request(
                    "/api/remove-background",
                    subject_upload("file"),
                ))
                .await
                .unwrap()
                .status()
        })
    });

    for handle in requests.collect::<Vec<_>>() {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }
    assert_eq!(loader.load_count(), 1);
}
