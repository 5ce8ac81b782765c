//! Test utilities for integration tests.
//!
//! This module provides a hand-rolled multipart body builder, image fixtures,
//! and stub segmentation models.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use bytes::Bytes;
use http_body_util::BodyExt;
use image::{DynamicImage, GrayImage, ImageFormat, Rgb, RgbImage};

use media_transformer::{
    create_router, ErrorResponse, LazyModel, MediaTransformer, ModelLoader, RouterConfig,
    SaliencyConfig, SegmentError, SegmentMask, SegmentationModel, TransformLimits,
};

// =============================================================================
// Multipart Bodies
// =============================================================================

pub const BOUNDARY: &str = "----media-transformer-test-boundary";

/// Builds a `multipart/form-data` body.
#[derive(Default)]
pub struct MultipartBuilder {
    body: Vec<u8>,
}

impl MultipartBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text field.
    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body
            .extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        self.body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        self.body.extend_from_slice(value.as_bytes());
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Add a file field.
    pub fn file(mut self, name: &str, filename: &str, content_type: &str, data: &[u8]) -> Self {
        self.body
            .extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        self.body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                name, filename
            )
            .as_bytes(),
        );
        self.body
            .extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Add a PNG under the `file` field.
    pub fn png(self, data: &[u8]) -> Self {
        self.file("file", "image.png", "image/png", data)
    }

    pub fn build(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        self.body
    }
}

/// A POST request carrying a multipart body.
pub fn multipart_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

// =============================================================================
// Image Fixtures
// =============================================================================

fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    buf
}

/// A single-colour PNG.
pub fn solid_png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    encode(
        &DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color))),
        ImageFormat::Png,
    )
}

/// A gradient JPEG, for tests that need non-PNG input.
pub fn gradient_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    encode(&DynamicImage::ImageRgb8(img), ImageFormat::Jpeg)
}

/// A PNG of pseudo-random texture, so lossy encoders have detail to discard.
pub fn noisy_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        let n = x.wrapping_mul(2_654_435_761) ^ y.wrapping_mul(40_503) ^ (x * y);
        Rgb([(n & 0xFF) as u8, ((n >> 8) & 0xFF) as u8, ((x + y) % 256) as u8])
    });
    encode(&DynamicImage::ImageRgb8(img), ImageFormat::Png)
}

/// A white PNG with a red square covering the centre 40% of each axis.
pub fn subject_png(width: u32, height: u32) -> Vec<u8> {
    let (x0, x1) = (width * 3 / 10, width * 7 / 10);
    let (y0, y1) = (height * 3 / 10, height * 7 / 10);
    let img = RgbImage::from_fn(width, height, |x, y| {
        if x >= x0 && x < x1 && y >= y0 && y < y1 {
            Rgb([220, 20, 20])
        } else {
            Rgb([255, 255, 255])
        }
    });
    encode(&DynamicImage::ImageRgb8(img), ImageFormat::Png)
}

/// Decode a response body and return its dimensions.
pub fn image_dimensions(data: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory(data).expect("response should be a decodable image");
    (img.width(), img.height())
}

// =============================================================================
// Routers
// =============================================================================

/// Router with the built-in segmenter and tracing disabled.
pub fn test_router() -> Router {
    router_with_config(RouterConfig::new().with_tracing(false))
}

pub fn router_with_config(config: RouterConfig) -> Router {
    let transformer =
        MediaTransformer::with_saliency(TransformLimits::default(), SaliencyConfig::default());
    create_router(transformer, config)
}

/// Router whose segmentation model comes from `loader`.
pub fn router_with_loader(loader: impl ModelLoader + 'static) -> Router {
    let transformer = MediaTransformer::new(TransformLimits::default(), LazyModel::new(loader));
    create_router(transformer, RouterConfig::new().with_tracing(false))
}

// =============================================================================
// Response Helpers
// =============================================================================

pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

pub async fn error_body(response: Response<Body>) -> ErrorResponse {
    let body = body_bytes(response).await;
    serde_json::from_slice(&body).expect("error body should be JSON")
}

pub fn header_str<'a>(response: &'a Response<Body>, name: &str) -> &'a str {
    response
        .headers()
        .get(name)
        .unwrap_or_else(|| panic!("missing header {name}"))
        .to_str()
        .unwrap()
}

// =============================================================================
// Stub Models
// =============================================================================

/// A model that returns fixed masks.
pub struct StubModel {
    pub masks: Vec<SegmentMask>,
}

impl SegmentationModel for StubModel {
    fn name(&self) -> &str {
        "stub"
    }

    fn segment(&self, _image: &DynamicImage) -> Result<Vec<SegmentMask>, SegmentError> {
        Ok(self.masks.clone())
    }
}

/// A loader that counts loads and can be told to fail or to return a
/// model whose inference fails.
#[derive(Clone, Default)]
pub struct StubLoader {
    pub masks: Vec<SegmentMask>,
    pub fail_load: bool,
    pub fail_inference: bool,
    pub loads: Arc<AtomicUsize>,
}

impl StubLoader {
    pub fn with_masks(masks: Vec<SegmentMask>) -> Self {
        Self {
            masks,
            ..Self::default()
        }
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

struct FailingModel;

impl SegmentationModel for FailingModel {
    fn name(&self) -> &str {
        "failing"
    }

    fn segment(&self, _image: &DynamicImage) -> Result<Vec<SegmentMask>, SegmentError> {
        Err(SegmentError::Inference("tensor shape mismatch".to_string()))
    }
}

#[async_trait]
impl ModelLoader for StubLoader {
    async fn load(&self) -> Result<Arc<dyn SegmentationModel>, SegmentError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        // Long enough for concurrent requests to pile up on the same load
        tokio::time::sleep(Duration::from_millis(50)).await;

        if self.fail_load {
            return Err(SegmentError::Load("weights not found".to_string()));
        }
        if self.fail_inference {
            return Ok(Arc::new(FailingModel));
        }
        Ok(Arc::new(StubModel {
            masks: self.masks.clone(),
        }))
    }
}

/// A full-frame mask with a filled rectangle.
pub fn box_mask(
    label: &str,
    score: f32,
    size: (u32, u32),
    rect: (u32, u32, u32, u32),
) -> SegmentMask {
    let (x0, y0, w, h) = rect;
    let mask = GrayImage::from_fn(size.0, size.1, |x, y| {
        if x >= x0 && x < x0 + w && y >= y0 && y < y0 + h {
            image::Luma([255])
        } else {
            image::Luma([0])
        }
    });
    SegmentMask::new(label, score, mask)
}
