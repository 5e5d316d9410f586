//! Model adapter: turns a decoded image into a land-use classification.
//!
//! The network itself is opaque; this module owns the fixed preprocessing
//! (128x128 RGB, ResNet50 "caffe" normalisation) and the interpretation of its
//! output vector.

pub mod onnx;

use crate::core::errors::GeoLensError;
use crate::core::models::land_use::LandUseClass;
use image::DynamicImage;
use image::imageops::{self, FilterType};

pub const INPUT_SIZE: u32 = 128;

/// ImageNet channel means in BGR order, as subtracted by Keras' ResNet50 `preprocess_input`.
const BGR_MEANS: [f32; 3] = [103.939, 116.779, 123.68];

#[derive(Clone, Debug, PartialEq)]
pub struct Classification {
    pub class: LandUseClass,
    pub confidence: f32,
    /// One probability per `LandUseClass::ALL` entry.
    pub probabilities: Vec<f32>,
}

pub trait Classifier: Send + Sync {
    fn classify(&self, image: &DynamicImage) -> Result<Classification, GeoLensError>;
}

/// NHWC `[1, 128, 128, 3]` input tensor data, flattened.
pub fn preprocess(image: &DynamicImage) -> Vec<f32> {
    let rgb = image.to_rgb8();
    let resized = imageops::resize(&rgb, INPUT_SIZE, INPUT_SIZE, FilterType::Nearest);
    let mut data = Vec::with_capacity((INPUT_SIZE * INPUT_SIZE * 3) as usize);
    for pixel in resized.pixels() {
        let [r, g, b] = pixel.0;
        data.push(b as f32 - BGR_MEANS[0]);
        data.push(g as f32 - BGR_MEANS[1]);
        data.push(r as f32 - BGR_MEANS[2]);
    }
    data
}

/// Softmax, unless the scores already form a probability distribution.
pub fn normalize_scores(scores: &[f32]) -> Option<Vec<f32>> {
    if scores.is_empty() || scores.iter().any(|s| !s.is_finite()) {
        return None;
    }
    let sum: f32 = scores.iter().sum();
    if scores.iter().all(|s| (0.0..=1.0).contains(s)) && (sum - 1.0).abs() < 1e-3 {
        return Some(scores.to_vec());
    }
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    Some(exps.into_iter().map(|e| e / total).collect())
}

/// Arg-max over the model output, mapped onto the fixed label set.
pub fn top_class(scores: &[f32]) -> Result<Classification, GeoLensError> {
    if scores.len() != LandUseClass::ALL.len() {
        return Err(GeoLensError::InferenceFailed(format!(
            "expected {} scores, model produced {}",
            LandUseClass::ALL.len(),
            scores.len()
        )));
    }
    let probabilities =
        normalize_scores(scores).ok_or_else(|| GeoLensError::InferenceFailed("non-finite model output".to_string()))?;

    let (index, confidence) = probabilities
        .iter()
        .copied()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |best, (i, p)| if p > best.1 { (i, p) } else { best });
    let class = LandUseClass::from_index(index)
        .ok_or_else(|| GeoLensError::InferenceFailed(format!("class index {} out of range", index)))?;

    Ok(Classification {
        class,
        confidence: confidence.clamp(0.0, 1.0),
        probabilities,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn probabilities_are_kept_as_is() {
        let mut scores = vec![0.0; 10];
        scores[3] = 0.9;
        scores[5] = 0.1;
        let result = top_class(&scores).unwrap();
        assert_eq!(result.class, LandUseClass::Highway);
        assert!((result.confidence - 0.9).abs() < 1e-6);
        assert_eq!(result.probabilities, scores);
    }

    #[test]
    fn logits_go_through_softmax() {
        let scores = vec![-1.0, 4.0, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 7.5];
        let result = top_class(&scores).unwrap();
        assert_eq!(result.class, LandUseClass::SeaLake);
        assert!(result.confidence > 0.0 && result.confidence <= 1.0);
        let total: f32 = result.probabilities.iter().sum();
        assert!((total - 1.0).abs() < 1e-4);
    }

    #[test]
    fn wrong_length_or_nan_is_an_inference_failure() {
        assert!(matches!(top_class(&[0.5, 0.5]), Err(GeoLensError::InferenceFailed(_))));
        let mut scores = vec![0.1; 10];
        scores[2] = f32::NAN;
        assert!(matches!(top_class(&scores), Err(GeoLensError::InferenceFailed(_))));
    }

    #[test]
    fn preprocess_resizes_and_centres_bgr() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(300, 200, Rgb([10, 20, 30])));
        let data = preprocess(&image);
        assert_eq!(data.len(), (INPUT_SIZE * INPUT_SIZE * 3) as usize);
        assert!((data[0] - (30.0 - 103.939)).abs() < 1e-4);
        assert!((data[1] - (20.0 - 116.779)).abs() < 1e-4);
        assert!((data[2] - (10.0 - 123.68)).abs() < 1e-4);
    }
}
