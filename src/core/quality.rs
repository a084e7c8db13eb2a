//! # Quality Module
//!
//! Sharpness scoring for decoded images.
//!
//! Sharpness is the variance of the Laplacian over the luminance channel:
//! crisp edges give large second derivatives, blur flattens them. Scores are
//! only comparable between images of the same scene.

use crate::core::resize::{resize_to_grayscale, ResizeError};
use image::{DynamicImage, GrayImage};

/// Computes Laplacian-variance sharpness
#[derive(Debug, Clone)]
pub struct QualityAnalyzer {
    /// Longest side analysed; larger images are downscaled first
    analysis_size: u32,
}

impl Default for QualityAnalyzer {
    fn default() -> Self {
        Self { analysis_size: 512 }
    }
}

impl QualityAnalyzer {
    pub fn new(analysis_size: u32) -> Self {
        Self {
            analysis_size: analysis_size.max(3),
        }
    }

    /// Sharpness of `image` (higher = sharper, 0 for flat images).
    ///
    /// Images are never upscaled, so a small copy is not rewarded with
    /// interpolation edges.
    pub fn sharpness(&self, image: &DynamicImage) -> Result<f64, ResizeError> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(ResizeError::EmptySource);
        }

        let longest = width.max(height);
        let gray = if longest > self.analysis_size {
            let scale = self.analysis_size as f64 / longest as f64;
            let target_w = ((width as f64 * scale).round() as u32).max(1);
            let target_h = ((height as f64 * scale).round() as u32).max(1);
            resize_to_grayscale(image, target_w, target_h)?
        } else {
            image.to_luma8()
        };

        Ok(laplacian_variance(&gray))
    }
}

/// Variance of the 4-neighbour Laplacian `[0 1 0; 1 -4 1; 0 1 0]`
fn laplacian_variance(gray: &GrayImage) -> f64 {
    let (width, height) = gray.dimensions();
    if width < 3 || height < 3 {
        return 0.0;
    }

    let at = |x: u32, y: u32| gray.get_pixel(x, y)[0] as f64;
    let mut count = 0.0;
    let mut sum = 0.0;
    let mut sum_sq = 0.0;

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let laplacian = at(x, y - 1) + at(x, y + 1) + at(x - 1, y) + at(x + 1, y) - 4.0 * at(x, y);
            count += 1.0;
            sum += laplacian;
            sum_sq += laplacian * laplacian;
        }
    }

    let mean = sum / count;
    (sum_sq / count - mean * mean).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{imageops::FilterType, ImageBuffer, Luma};

    fn uniform(value: u8, size: u32) -> DynamicImage {
        DynamicImage::ImageLuma8(ImageBuffer::from_fn(size, size, |_, _| Luma([value])))
    }

    fn checkerboard(size: u32, block: u32) -> DynamicImage {
        DynamicImage::ImageLuma8(ImageBuffer::from_fn(size, size, |x, y| {
            if (x / block + y / block) % 2 == 0 {
                Luma([0])
            } else {
                Luma([255])
            }
        }))
    }

    #[test]
    fn uniform_image_has_zero_sharpness() {
        let score = QualityAnalyzer::default().sharpness(&uniform(128, 64)).unwrap();
        assert!(score < 1e-9, "uniform image scored {}", score);
    }

    #[test]
    fn blurring_lowers_sharpness() {
        let analyzer = QualityAnalyzer::default();
        let crisp = checkerboard(128, 4);
        let blurred = crisp.blur(2.0);

        let crisp_score = analyzer.sharpness(&crisp).unwrap();
        let blurred_score = analyzer.sharpness(&blurred).unwrap();

        assert!(crisp_score > 1000.0, "checkerboard scored {}", crisp_score);
        assert!(
            blurred_score < crisp_score / 2.0,
            "blur {} vs crisp {}",
            blurred_score,
            crisp_score
        );
    }

    #[test]
    fn large_images_are_downscaled_before_scoring() {
        let analyzer = QualityAnalyzer::new(64);
        let large = checkerboard(256, 32).resize_exact(256, 128, FilterType::Nearest);

        let score = analyzer.sharpness(&large).unwrap();
        assert!(score > 0.0);
    }

    #[test]
    fn tiny_images_score_zero() {
        let score = QualityAnalyzer::default().sharpness(&uniform(10, 2)).unwrap();
        assert_eq!(score, 0.0);
    }
}
