#![cfg(feature = "backend-tract")]

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use tract_onnx::prelude::*;

use crate::detect::backend::{DetectionSource, SourceRole};
use crate::detect::catalog::ModelSpec;
use crate::detect::result::RawDetection;
use crate::detect::yolo::{self, YoloSettings};
use crate::error::{HectorError, Result};

/// Tract-based YOLOv8 source for ONNX inference.
///
/// Loads a local model file once and runs it on RGB images resized to the
/// model's square input. Performs no network I/O.
pub struct TractSource {
    model: TypedRunnableModel<TypedModel>,
    name: String,
    role: SourceRole,
    labels: Vec<String>,
    settings: YoloSettings,
}

impl TractSource {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn load(spec: &ModelSpec, settings: YoloSettings) -> Result<Self> {
        let path = &spec.weights_path;
        let size = settings.input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| {
                model.with_input_fact(
                    0,
                    InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, size, size)),
                )
            })
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| HectorError::model_load(&spec.name, path, e))?;

        log::info!("loaded model {} from {}", spec.name, path.display());
        Ok(Self {
            model,
            name: spec.name.clone(),
            role: spec.role,
            labels: spec.labels.clone(),
            settings,
        })
    }

    fn build_input(&self, image: &DynamicImage) -> Tensor {
        let size = self.settings.input_size;
        let rgb = image
            .resize_exact(size, size, FilterType::Triangle)
            .to_rgb8();
        let size = size as usize;
        tract_ndarray::Array4::from_shape_fn((1, 3, size, size), |(_, channel, y, x)| {
            rgb.get_pixel(x as u32, y as u32)[channel] as f32 / 255.0
        })
        .into_tensor()
    }

    fn extract_detections(
        &self,
        outputs: TVec<TValue>,
        width: u32,
        height: u32,
    ) -> Result<Vec<RawDetection>> {
        let output = outputs
            .first()
            .ok_or_else(|| HectorError::inference(&self.name, "model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| HectorError::inference(&self.name, e))?;
        let shape = view.shape();
        if shape.len() != 3 || shape[0] != 1 {
            return Err(HectorError::inference(
                &self.name,
                format!("unexpected output shape {:?}", shape),
            ));
        }
        let (features, candidates) = (shape[1], shape[2]);
        let flat: Vec<f32> = view.iter().copied().collect();

        let input = self.settings.input_size as f32;
        let scale = (width as f32 / input, height as f32 / input);
        Ok(yolo::decode(
            &flat,
            features,
            candidates,
            &self.labels,
            &self.settings,
            scale,
        ))
    }
}

impl DetectionSource for TractSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> SourceRole {
        self.role
    }

    fn infer(&mut self, image: &DynamicImage) -> Result<Vec<RawDetection>> {
        let (width, height) = image.dimensions();
        let input = self.build_input(image);
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| HectorError::inference(&self.name, e))?;
        let detections = self.extract_detections(outputs, width, height)?;
        log::debug!("{}: {} detections", self.name, detections.len());
        Ok(detections)
    }

    fn warm_up(&mut self) -> Result<()> {
        let size = self.settings.input_size;
        self.infer(&DynamicImage::new_rgb8(size, size)).map(|_| ())
    }
}
