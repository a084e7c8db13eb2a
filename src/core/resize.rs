//! SIMD-accelerated downsampling shared by the hasher and the built-in model.
//!
//! Uses `fast_image_resize`, which picks AVX2/NEON kernels when available.

use fast_image_resize::{images::Image, FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{DynamicImage, GrayImage, ImageBuffer, RgbImage};
use thiserror::Error;

/// Failure to produce a thumbnail
#[derive(Error, Debug)]
pub enum ResizeError {
    #[error("Source image has zero width or height")]
    EmptySource,

    #[error("Target size {width}x{height} is invalid")]
    InvalidTarget { width: u32, height: u32 },

    #[error("Resize failed: {0}")]
    Failed(String),
}

/// Reusable resizer; holds scratch buffers between calls
pub struct FastResizer {
    resizer: Resizer,
    options: ResizeOptions,
}

impl FastResizer {
    pub fn new() -> Self {
        Self {
            resizer: Resizer::new(),
            // Bilinear is plenty for thumbnails this small
            options: ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear)),
        }
    }

    /// Resize to `width` x `height` single-channel luminance
    pub fn resize_to_grayscale(
        &mut self,
        image: &DynamicImage,
        width: u32,
        height: u32,
    ) -> Result<GrayImage, ResizeError> {
        // Converting before resizing moves a third of the bytes through the kernel
        let gray = image.to_luma8();
        let (src_width, src_height) = gray.dimensions();
        let pixels = self.resize_raw(gray.into_raw(), src_width, src_height, width, height, PixelType::U8)?;

        ImageBuffer::from_raw(width, height, pixels)
            .ok_or_else(|| ResizeError::Failed("output buffer has the wrong length".to_string()))
    }

    /// Resize to `width` x `height` RGB
    pub fn resize_to_rgb(
        &mut self,
        image: &DynamicImage,
        width: u32,
        height: u32,
    ) -> Result<RgbImage, ResizeError> {
        let rgb = image.to_rgb8();
        let (src_width, src_height) = rgb.dimensions();
        let pixels = self.resize_raw(rgb.into_raw(), src_width, src_height, width, height, PixelType::U8x3)?;

        ImageBuffer::from_raw(width, height, pixels)
            .ok_or_else(|| ResizeError::Failed("output buffer has the wrong length".to_string()))
    }

    fn resize_raw(
        &mut self,
        pixels: Vec<u8>,
        src_width: u32,
        src_height: u32,
        width: u32,
        height: u32,
        pixel_type: PixelType,
    ) -> Result<Vec<u8>, ResizeError> {
        if src_width == 0 || src_height == 0 {
            return Err(ResizeError::EmptySource);
        }
        if width == 0 || height == 0 {
            return Err(ResizeError::InvalidTarget { width, height });
        }

        let src_image = Image::from_vec_u8(src_width, src_height, pixels, pixel_type)
            .map_err(|e| ResizeError::Failed(e.to_string()))?;
        let mut dst_image = Image::new(width, height, pixel_type);

        self.resizer
            .resize(&src_image, &mut dst_image, &self.options)
            .map_err(|e| ResizeError::Failed(e.to_string()))?;

        Ok(dst_image.into_vec())
    }
}

impl Default for FastResizer {
    fn default() -> Self {
        Self::new()
    }
}

/// One-off grayscale resize
pub fn resize_to_grayscale(
    image: &DynamicImage,
    width: u32,
    height: u32,
) -> Result<GrayImage, ResizeError> {
    FastResizer::new().resize_to_grayscale(image, width, height)
}

/// One-off RGB resize
pub fn resize_to_rgb(image: &DynamicImage, width: u32, height: u32) -> Result<RgbImage, ResizeError> {
    FastResizer::new().resize_to_rgb(image, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn create_test_image(width: u32, height: u32) -> DynamicImage {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            let r = (x * 255 / width.max(1)) as u8;
            let g = (y * 255 / height.max(1)) as u8;
            let b = ((x + y) * 128 / (width + height).max(1)) as u8;
            Rgb([r, g, b])
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn grayscale_resize_produces_requested_dimensions() {
        let image = create_test_image(200, 100);
        let resized = resize_to_grayscale(&image, 9, 8).unwrap();

        assert_eq!(resized.dimensions(), (9, 8));
    }

    #[test]
    fn rgb_resize_keeps_three_channels() {
        let image = create_test_image(64, 48);
        let resized = resize_to_rgb(&image, 16, 16).unwrap();

        assert_eq!(resized.dimensions(), (16, 16));
        assert_eq!(resized.as_raw().len(), 16 * 16 * 3);
    }

    #[test]
    fn solid_colour_survives_downsampling() {
        let image = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(50, 50, Rgb([200, 10, 90])));
        let resized = resize_to_rgb(&image, 4, 4).unwrap();

        for pixel in resized.pixels() {
            assert!((pixel[0] as i32 - 200).abs() <= 1);
            assert!((pixel[1] as i32 - 10).abs() <= 1);
            assert!((pixel[2] as i32 - 90).abs() <= 1);
        }
    }

    #[test]
    fn empty_source_is_rejected() {
        let image = DynamicImage::new_rgb8(0, 0);
        assert!(matches!(
            resize_to_grayscale(&image, 8, 8),
            Err(ResizeError::EmptySource)
        ));
    }

    #[test]
    fn resizer_can_be_reused() {
        let mut resizer = FastResizer::new();
        let image = create_test_image(100, 100);

        let first = resizer.resize_to_grayscale(&image, 8, 8).unwrap();
        let second = resizer.resize_to_grayscale(&image, 8, 8).unwrap();

        assert_eq!(first, second);
    }
}
