//! The model inference collaborator.

use crate::error::InferenceError;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// What the loaded model declares about itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Versioned model identity, stored with every embedding
    pub id: String,
    /// Length of every output vector
    pub dimension: usize,
    /// Square input side the model resizes to
    pub input_size: u32,
}

impl ModelDescriptor {
    pub fn new(id: impl Into<String>, dimension: usize, input_size: u32) -> Self {
        Self {
            id: id.into(),
            dimension,
            input_size,
        }
    }
}

/// A feature extractor producing fixed-width vectors.
///
/// Outputs need not be normalized; [`super::Embedder`] does that.
pub trait InferenceModel: Send + Sync {
    fn descriptor(&self) -> &ModelDescriptor;

    /// Run the model on one image
    fn infer(&self, image: &DynamicImage) -> Result<Vec<f32>, InferenceError>;

    /// Run the model on a batch, one result per input in order.
    ///
    /// Models with a native batched entry point should override this.
    fn infer_batch(&self, images: &[&DynamicImage]) -> Vec<Result<Vec<f32>, InferenceError>> {
        images.iter().map(|image| self.infer(image)).collect()
    }
}
