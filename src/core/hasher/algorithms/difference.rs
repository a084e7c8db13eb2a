//! Difference Hash (dHash).
//!
//! The image is reduced to `(hash_size + 1) x hash_size` grayscale and each
//! bit records whether a pixel is brighter than its right-hand neighbour.

use crate::core::hasher::traits::{HashAlgorithm, HashAlgorithmKind, ImageHashValue};
use crate::core::resize::resize_to_grayscale;
use crate::error::HashError;
use image::DynamicImage;

pub struct DifferenceHasher {
    hash_size: u32,
}

impl DifferenceHasher {
    pub fn new(hash_size: u32) -> Self {
        Self { hash_size }
    }
}

impl HashAlgorithm for DifferenceHasher {
    fn hash_image(&self, image: &DynamicImage) -> Result<ImageHashValue, HashError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(HashError::EmptyImage);
        }

        // One extra column so every cell has a right-hand neighbour
        let gray = resize_to_grayscale(image, self.hash_size + 1, self.hash_size)?;

        let bits = (self.hash_size * self.hash_size) as usize;
        let mut bytes = vec![0u8; bits.div_ceil(8)];
        for y in 0..self.hash_size {
            for x in 0..self.hash_size {
                if gray.get_pixel(x, y)[0] > gray.get_pixel(x + 1, y)[0] {
                    let bit = (y * self.hash_size + x) as usize;
                    bytes[bit / 8] |= 1 << (7 - bit % 8);
                }
            }
        }

        Ok(ImageHashValue::new(bytes, HashAlgorithmKind::Difference))
    }

    fn kind(&self) -> HashAlgorithmKind {
        HashAlgorithmKind::Difference
    }

    fn bit_count(&self) -> u32 {
        self.hash_size * self.hash_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hasher::traits::PerceptualHash;
    use image::{ImageBuffer, Rgb};

    fn horizontal_gradient(reversed: bool) -> DynamicImage {
        let img = ImageBuffer::from_fn(100, 100, |x, _| {
            let x = if reversed { 99 - x } else { x };
            let brightness = (x * 255 / 99) as u8;
            Rgb([brightness, brightness, brightness])
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn identical_images_produce_identical_hash() {
        let hasher = DifferenceHasher::new(8);
        let image = horizontal_gradient(false);

        let hash1 = hasher.hash_image(&image).unwrap();
        let hash2 = hasher.hash_image(&image).unwrap();

        assert_eq!(hash1, hash2);
    }

    #[test]
    fn opposite_gradients_are_far_apart() {
        let hasher = DifferenceHasher::new(8);

        // Brightening left to right sets no bits; darkening sets them all
        let hash1 = hasher.hash_image(&horizontal_gradient(false)).unwrap();
        let hash2 = hasher.hash_image(&horizontal_gradient(true)).unwrap();

        assert!(hash1.distance(&hash2) > 48);
    }

    #[test]
    fn hash_size_affects_output_length() {
        let image = horizontal_gradient(false);

        let hash_8 = DifferenceHasher::new(8).hash_image(&image).unwrap();
        let hash_16 = DifferenceHasher::new(16).hash_image(&image).unwrap();

        assert_eq!(hash_8.as_bytes().len(), 8);
        assert_eq!(hash_16.as_bytes().len(), 32);
    }

    #[test]
    fn empty_image_is_an_error() {
        let hasher = DifferenceHasher::new(8);
        assert!(matches!(
            hasher.hash_image(&DynamicImage::new_rgb8(0, 10)),
            Err(HashError::EmptyImage)
        ));
    }
}
