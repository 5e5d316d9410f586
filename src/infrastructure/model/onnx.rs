use super::{Classification, Classifier, INPUT_SIZE, preprocess, top_class};
use crate::core::errors::GeoLensError;
use image::DynamicImage;
use std::path::Path;
use tract_onnx::prelude::*;
use tracing::{error, info};

type Plan = TypedRunnableModel<TypedModel>;

/// ResNet50 land-use model exported to ONNX, run with tract.
///
/// A model that failed to load is kept as `None`; every classification then
/// reports `ModelUnavailable` instead of taking the process down.
pub struct OnnxClassifier {
    plan: Option<Plan>,
}

impl OnnxClassifier {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GeoLensError> {
        let side = INPUT_SIZE as usize;
        let plan = tract_onnx::onnx()
            .model_for_path(path.as_ref())
            .and_then(|model| model.with_input_fact(0, f32::fact([1, side, side, 3]).into()))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| GeoLensError::ModelLoad(format!("{}: {}", path.as_ref().display(), e)))?;
        Ok(OnnxClassifier { plan: Some(plan) })
    }

    pub fn load_or_unavailable(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(classifier) => {
                info!("Model loaded from {}", path.display());
                classifier
            }
            Err(e) => {
                error!("Failed to load model from {}: {}", path.display(), e);
                OnnxClassifier { plan: None }
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.plan.is_some()
    }
}

impl Classifier for OnnxClassifier {
    fn classify(&self, image: &DynamicImage) -> Result<Classification, GeoLensError> {
        let plan = self.plan.as_ref().ok_or(GeoLensError::ModelUnavailable)?;
        let side = INPUT_SIZE as usize;
        let input = Tensor::from_shape(&[1, side, side, 3], &preprocess(image))
            .map_err(|e| GeoLensError::InferenceFailed(e.to_string()))?;
        let outputs = plan
            .run(tvec!(input.into()))
            .map_err(|e| GeoLensError::InferenceFailed(e.to_string()))?;
        let scores: Vec<f32> = outputs
            .first()
            .ok_or_else(|| GeoLensError::InferenceFailed("model produced no output".to_string()))?
            .to_array_view::<f32>()
            .map_err(|e| GeoLensError::InferenceFailed(e.to_string()))?
            .iter()
            .copied()
            .collect();
        top_class(&scores)
    }
}
