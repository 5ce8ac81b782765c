//! The transform entry point shared by the HTTP handlers and the CLI.

use std::sync::Arc;

use image::{DynamicImage, GenericImageView};
use tracing::debug;

use crate::error::TransformError;
use crate::format::OutputFormat;
use crate::segment::{apply_mask, select_mask, LazyModel, SaliencyConfig, SaliencyModelLoader};
use crate::upload::UploadedFile;

use super::codec::{self, EncodeOptions};
use super::geometry::{apply_plan, plan_resize, ResizePlan};
use super::params::{
    CompressParams, ConvertParams, FormFields, RemoveBackgroundParams, ResizeParams,
    CONVERT_QUALITY,
};
use super::{Operation, TransformLimits, TransformResult};

/// Runs the four operations.
///
/// Holds no per-request state. The only shared resource is the lazily loaded
/// segmentation model, which is safe to use from concurrent requests.
#[derive(Debug, Clone)]
pub struct MediaTransformer {
    limits: TransformLimits,
    model: Arc<LazyModel>,
}

impl MediaTransformer {
    pub fn new(limits: TransformLimits, model: LazyModel) -> Self {
        Self {
            limits,
            model: Arc::new(model),
        }
    }

    /// Transformer backed by the built-in saliency segmenter.
    pub fn with_saliency(limits: TransformLimits, config: SaliencyConfig) -> Self {
        Self::new(limits, LazyModel::new(SaliencyModelLoader::new(config)))
    }

    pub fn limits(&self) -> &TransformLimits {
        &self.limits
    }

    pub fn model(&self) -> &LazyModel {
        &self.model
    }

    /// Parse the parameters for `operation` from `fields` and run it.
    pub async fn run(
        &self,
        operation: Operation,
        file: UploadedFile,
        fields: &FormFields,
    ) -> Result<TransformResult, TransformError> {
        match operation {
            Operation::Compress => {
                let params = CompressParams::from_fields(fields)?;
                self.compress(file, params).await
            }
            Operation::Convert => {
                let params = ConvertParams::from_fields(fields)?;
                self.convert(file, params).await
            }
            Operation::Resize => {
                let params = ResizeParams::from_fields(fields, &self.limits)?;
                self.resize(file, params).await
            }
            Operation::RemoveBackground => {
                self.remove_background(file, RemoveBackgroundParams::default())
                    .await
            }
        }
    }

    /// Re-encode at the requested quality and format, keeping dimensions.
    pub async fn compress(
        &self,
        file: UploadedFile,
        params: CompressParams,
    ) -> Result<TransformResult, TransformError> {
        let input = file.detect_format()?;
        let limits = self.limits;

        run_blocking(Operation::Compress, move || {
            let img = file.decode(input, &limits)?;
            debug!(input = input.name(), output = %params.format, quality = params.quality, "Compressing");

            let data = codec::encode(&img, params.format, EncodeOptions::compress(params.quality))?;
            Ok(finish(Operation::Compress, &img, params.format, data))
        })
        .await
    }

    /// Re-encode into another format at a fixed quality.
    pub async fn convert(
        &self,
        file: UploadedFile,
        params: ConvertParams,
    ) -> Result<TransformResult, TransformError> {
        let input = file.detect_format()?;
        let limits = self.limits;

        run_blocking(Operation::Convert, move || {
            let img = file.decode(input, &limits)?;
            debug!(input = input.name(), output = %params.format, "Converting");

            let data = codec::encode(&img, params.format, EncodeOptions::standard(CONVERT_QUALITY))?;
            Ok(finish(Operation::Convert, &img, params.format, data))
        })
        .await
    }

    /// Resize according to the requested dimensions and fit.
    pub async fn resize(
        &self,
        file: UploadedFile,
        params: ResizeParams,
    ) -> Result<TransformResult, TransformError> {
        let input = file.detect_format()?;
        let limits = self.limits;

        run_blocking(Operation::Resize, move || {
            let img = file.decode(input, &limits)?;
            let (src_width, src_height) = img.dimensions();

            let plan = plan_resize(src_width, src_height, params.width, params.height, params.fit);
            let passthrough = matches!(plan, ResizePlan::Passthrough { .. });
            if !passthrough && plan.max_extent() > limits.max_dimension {
                return Err(TransformError::invalid(
                    "dimensions",
                    format!(
                        "resizing {}x{} this way gives {} pixels on one side (max {})",
                        src_width,
                        src_height,
                        plan.max_extent(),
                        limits.max_dimension
                    ),
                ));
            }
            debug!(?plan, fit = %params.fit, "Resizing");

            let resized = apply_plan(&img, plan);
            let data = codec::encode(&resized, params.format, EncodeOptions::preserve())?;
            Ok(finish(Operation::Resize, &resized, params.format, data))
        })
        .await
    }

    /// Segment the image, keep the chosen subject, and return a transparent PNG.
    ///
    /// The upload is validated before the model is touched, so a bad request
    /// never triggers a model load.
    pub async fn remove_background(
        &self,
        file: UploadedFile,
        params: RemoveBackgroundParams,
    ) -> Result<TransformResult, TransformError> {
        let input = file.detect_format()?;
        let model = self.model.get().await?;
        let limits = self.limits;

        run_blocking(Operation::RemoveBackground, move || {
            let img = file.decode(input, &limits)?;
            drop(file);

            let masks = model.segment(&img)?;
            debug!(model = model.name(), masks = masks.len(), "Segmented");

            let chosen =
                select_mask(&masks, &params.preferred_label).ok_or(TransformError::NoSubject)?;
            debug!(label = %chosen.label, score = chosen.score, "Selected mask");

            let output = DynamicImage::ImageRgba8(apply_mask(&img, &chosen.mask)?);
            let data = codec::encode(&output, OutputFormat::Png, EncodeOptions::preserve())
                .map_err(|e| TransformError::Composite {
                    message: e.to_string(),
                })?;
            Ok(finish(Operation::RemoveBackground, &output, OutputFormat::Png, data))
        })
        .await
    }
}

fn finish(
    operation: Operation,
    img: &DynamicImage,
    format: OutputFormat,
    data: bytes::Bytes,
) -> TransformResult {
    let (width, height) = img.dimensions();
    debug!(%operation, width, height, bytes = data.len(), "Encoded output");
    TransformResult {
        data,
        format,
        width,
        height,
        operation,
    }
}

/// Run CPU-bound work on the blocking pool.
async fn run_blocking<T, F>(operation: Operation, work: F) -> Result<T, TransformError>
where
    F: FnOnce() -> Result<T, TransformError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| TransformError::Transform {
            message: format!("{} worker failed: {}", operation, e),
        })?
}

// =============================================================================
// Tests
// =============================================================================
