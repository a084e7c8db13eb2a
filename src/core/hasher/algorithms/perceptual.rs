//! Perceptual Hash (pHash).
//!
//! The image is reduced to grayscale, transformed with a DCT and the
//! `hash_size x hash_size` lowest frequencies are thresholded against their
//! mean. Low frequencies survive rescaling and recompression, so a resized
//! or re-encoded copy lands within a few bits of the original.

use crate::core::hasher::traits::{HashAlgorithm, HashAlgorithmKind, ImageHashValue};
use crate::error::HashError;
use image::DynamicImage;
use image_hasher::{HashAlg, Hasher, HasherConfig as ImageHasherConfig};

pub struct PerceptualHasher {
    hash_size: u32,
    hasher: Hasher,
}

impl PerceptualHasher {
    pub fn new(hash_size: u32) -> Self {
        let hasher = ImageHasherConfig::new()
            .hash_size(hash_size, hash_size)
            .hash_alg(HashAlg::Mean)
            .preproc_dct()
            .to_hasher();

        Self { hash_size, hasher }
    }
}

impl HashAlgorithm for PerceptualHasher {
    fn hash_image(&self, image: &DynamicImage) -> Result<ImageHashValue, HashError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(HashError::EmptyImage);
        }

        let hash = self.hasher.hash_image(image);
        let bytes = hash.as_bytes().to_vec();

        let expected = (self.bit_count() as usize).div_ceil(8);
        if bytes.len() != expected {
            return Err(HashError::ComputationFailed(format!(
                "pHash produced {} bytes, expected {}",
                bytes.len(),
                expected
            )));
        }

        Ok(ImageHashValue::new(bytes, HashAlgorithmKind::Perceptual))
    }

    fn kind(&self) -> HashAlgorithmKind {
        HashAlgorithmKind::Perceptual
    }

    fn bit_count(&self) -> u32 {
        self.hash_size * self.hash_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hasher::traits::PerceptualHash;
    use image::{imageops::FilterType, ImageBuffer, Rgb};

    fn scene(width: u32, height: u32, phase: f32) -> DynamicImage {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            let u = x as f32 / width as f32;
            let v = y as f32 / height as f32;
            let value = (u * 6.0 + phase).sin() * (v * 4.0 + phase * 0.5).cos();
            let level = (127.5 + 120.0 * value) as u8;
            Rgb([level, level.wrapping_add(20), 255 - level])
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn hashing_is_deterministic() {
        let hasher = PerceptualHasher::new(8);
        let image = scene(120, 90, 0.0);

        assert_eq!(
            hasher.hash_image(&image).unwrap(),
            hasher.hash_image(&image).unwrap()
        );
    }

    #[test]
    fn resized_copy_is_near_identical() {
        let hasher = PerceptualHasher::new(8);
        let original = scene(256, 192, 0.0);
        let resized = original.resize_exact(128, 96, FilterType::Triangle);

        let distance = hasher
            .hash_image(&original)
            .unwrap()
            .distance(&hasher.hash_image(&resized).unwrap());
        assert!(distance <= 6, "resized copy drifted {} bits", distance);
    }

    #[test]
    fn stripe_orientation_changes_the_hash() {
        let stripes = |vertical: bool| {
            DynamicImage::ImageRgb8(ImageBuffer::from_fn(96, 96, |x, y| {
                let t = if vertical { x } else { y };
                let level = if (t / 12) % 2 == 0 { 30 } else { 220 };
                Rgb([level, level, level])
            }))
        };

        let hasher = PerceptualHasher::new(8);
        let a = hasher.hash_image(&stripes(true)).unwrap();
        let b = hasher.hash_image(&stripes(false)).unwrap();

        assert!(a.distance(&b) > 0);
    }

    #[test]
    fn hash_is_fixed_width() {
        let hash = PerceptualHasher::new(8).hash_image(&scene(64, 64, 0.0)).unwrap();
        assert_eq!(hash.bit_count(), 64);
        assert_eq!(hash.algorithm(), HashAlgorithmKind::Perceptual);
    }
}
