//! # Embedder Module
//!
//! Turns decoded images into unit-length vectors through an injected
//! [`InferenceModel`]. The model is constructed once by the caller and
//! shared by reference (`Arc`); nothing here looks it up globally.
//!
//! Cosine similarity between two embeddings is their dot product.

mod model;
mod thumbnail;

pub use model::{InferenceModel, ModelDescriptor};
pub use thumbnail::ThumbnailModel;

use crate::error::InferenceError;
use image::DynamicImage;
use std::sync::Arc;

/// Norms below this are treated as a degenerate model output
const MIN_NORM: f32 = 1e-6;

/// Normalizing wrapper around an inference model
#[derive(Clone)]
pub struct Embedder {
    model: Arc<dyn InferenceModel>,
}

impl Embedder {
    pub fn new(model: Arc<dyn InferenceModel>) -> Self {
        Self { model }
    }

    pub fn descriptor(&self) -> &ModelDescriptor {
        self.model.descriptor()
    }

    /// Model id recorded against every embedding
    pub fn model_id(&self) -> &str {
        &self.model.descriptor().id
    }

    /// Fixed output dimension
    pub fn dimension(&self) -> usize {
        self.model.descriptor().dimension
    }

    /// Embed one image
    pub fn embed(&self, image: &DynamicImage) -> Result<Vec<f32>, InferenceError> {
        let raw = self.model.infer(image)?;
        normalize(raw, self.dimension())
    }

    /// Embed a small ordered batch.
    ///
    /// The result has one entry per input, in order; a failure on one image
    /// does not affect the others.
    pub fn embed_batch(&self, images: &[&DynamicImage]) -> Vec<Result<Vec<f32>, InferenceError>> {
        if images.is_empty() {
            return Vec::new();
        }

        let outputs = self.model.infer_batch(images);
        if outputs.len() != images.len() {
            let found = outputs.len();
            return images
                .iter()
                .map(|_| {
                    Err(InferenceError::BatchSizeMismatch {
                        expected: images.len(),
                        found,
                    })
                })
                .collect();
        }

        let dimension = self.dimension();
        outputs
            .into_iter()
            .map(|output| output.and_then(|raw| normalize(raw, dimension)))
            .collect()
    }
}

impl std::fmt::Debug for Embedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Embedder")
            .field("model", self.model.descriptor())
            .finish()
    }
}

/// Check the dimension and scale to unit L2 norm
fn normalize(mut vector: Vec<f32>, dimension: usize) -> Result<Vec<f32>, InferenceError> {
    if vector.len() != dimension {
        return Err(InferenceError::DimensionMismatch {
            expected: dimension,
            found: vector.len(),
        });
    }

    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if !norm.is_finite() || norm < MIN_NORM {
        return Err(InferenceError::Degenerate);
    }

    for value in &mut vector {
        *value /= norm;
    }
    Ok(vector)
}

/// Dot product of two equal-length vectors
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    /// Returns a fixed vector regardless of input
    struct ConstantModel {
        descriptor: ModelDescriptor,
        output: Vec<f32>,
    }

    impl ConstantModel {
        fn new(dimension: usize, output: Vec<f32>) -> Self {
            Self {
                descriptor: ModelDescriptor::new("constant", dimension, 8),
                output,
            }
        }
    }

    impl InferenceModel for ConstantModel {
        fn descriptor(&self) -> &ModelDescriptor {
            &self.descriptor
        }

        fn infer(&self, _image: &DynamicImage) -> Result<Vec<f32>, InferenceError> {
            Ok(self.output.clone())
        }
    }

    fn image() -> DynamicImage {
        DynamicImage::ImageRgb8(ImageBuffer::from_pixel(4, 4, Rgb([1, 2, 3])))
    }

    #[test]
    fn output_is_unit_length() {
        let embedder = Embedder::new(Arc::new(ConstantModel::new(2, vec![3.0, 4.0])));
        let vector = embedder.embed(&image()).unwrap();

        assert!((vector[0] - 0.6).abs() < 1e-6);
        assert!((vector[1] - 0.8).abs() < 1e-6);
        assert!((dot(&vector, &vector) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn wrong_dimension_is_rejected() {
        let embedder = Embedder::new(Arc::new(ConstantModel::new(3, vec![1.0, 0.0])));
        assert!(matches!(
            embedder.embed(&image()),
            Err(InferenceError::DimensionMismatch {
                expected: 3,
                found: 2
            })
        ));
    }

    #[test]
    fn zero_and_nan_vectors_are_degenerate() {
        let zero = Embedder::new(Arc::new(ConstantModel::new(2, vec![0.0, 0.0])));
        assert!(matches!(zero.embed(&image()), Err(InferenceError::Degenerate)));

        let nan = Embedder::new(Arc::new(ConstantModel::new(2, vec![f32::NAN, 1.0])));
        assert!(matches!(nan.embed(&image()), Err(InferenceError::Degenerate)));
    }

    #[test]
    fn batch_preserves_order_and_length() {
        let embedder = Embedder::new(Arc::new(ConstantModel::new(2, vec![0.0, 2.0])));
        let a = image();
        let b = image();

        let results = embedder.embed_batch(&[&a, &b]);
        assert_eq!(results.len(), 2);
        for result in results {
            assert_eq!(result.unwrap(), vec![0.0, 1.0]);
        }
        assert!(embedder.embed_batch(&[]).is_empty());
    }
}
