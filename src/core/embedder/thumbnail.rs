//! Built-in model-free feature extractor.
//!
//! A 16x16 RGB thumbnail, mean-centred and flattened to 768 floats. It is
//! deterministic and needs no weights, which makes it the fallback when no
//! learned model is configured. Similar thumbnails give high cosine
//! similarity, so resized and re-encoded copies match while unrelated
//! photos mostly do not.

use super::model::{InferenceModel, ModelDescriptor};
use crate::core::resize::resize_to_rgb;
use crate::error::InferenceError;
use image::DynamicImage;

const SIDE: u32 = 16;

pub struct ThumbnailModel {
    descriptor: ModelDescriptor,
}

impl ThumbnailModel {
    pub const ID: &'static str = "thumbnail-rgb-v1";

    pub fn new() -> Self {
        Self {
            descriptor: ModelDescriptor::new(Self::ID, (SIDE * SIDE * 3) as usize, SIDE),
        }
    }
}

impl Default for ThumbnailModel {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceModel for ThumbnailModel {
    fn descriptor(&self) -> &ModelDescriptor {
        &self.descriptor
    }

    fn infer(&self, image: &DynamicImage) -> Result<Vec<f32>, InferenceError> {
        let thumbnail = resize_to_rgb(image, SIDE, SIDE)
            .map_err(|e| InferenceError::Failed(e.to_string()))?;

        let mut values: Vec<f32> = thumbnail
            .into_raw()
            .into_iter()
            .map(|v| v as f32 / 255.0)
            .collect();

        let mean = (values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64) as f32;
        for value in &mut values {
            *value -= mean;
        }

        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::embedder::{dot, Embedder};
    use image::{imageops::FilterType, ImageBuffer, Rgb};
    use std::sync::Arc;

    fn scene(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(ImageBuffer::from_fn(width, height, |x, y| {
            let u = x as f32 / width as f32;
            let v = y as f32 / height as f32;
            Rgb([(u * 255.0) as u8, (v * 255.0) as u8, ((1.0 - u) * 200.0) as u8])
        }))
    }

    #[test]
    fn output_has_declared_dimension() {
        let model = ThumbnailModel::new();
        let vector = model.infer(&scene(40, 30)).unwrap();

        assert_eq!(vector.len(), 768);
        assert_eq!(model.descriptor().dimension, 768);
        assert_eq!(model.descriptor().id, "thumbnail-rgb-v1");
    }

    #[test]
    fn resized_copy_is_nearly_parallel() {
        let embedder = Embedder::new(Arc::new(ThumbnailModel::new()));
        let original = scene(320, 240);
        let smaller = original.resize_exact(160, 120, FilterType::Triangle);

        let a = embedder.embed(&original).unwrap();
        let b = embedder.embed(&smaller).unwrap();

        assert!(dot(&a, &b) > 0.98);
    }

    #[test]
    fn flat_frame_centres_to_nothing() {
        let model = ThumbnailModel::new();
        let grey = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(20, 20, Rgb([90, 90, 90])));

        let vector = model.infer(&grey).unwrap();
        assert!(vector.iter().all(|v| v.abs() < 0.01));
    }
}
