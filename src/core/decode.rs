//! Image decode collaborator.
//!
//! The engine only sees the [`ImageDecoder`] trait. [`FastDecoder`] is the
//! default: `zune-jpeg` for JPEG (falling back to `image` when it refuses a
//! file), `image` for everything else.

use crate::error::DecodeError;
use image::{DynamicImage, ImageBuffer, Luma, Rgb, Rgba};
use std::fs;
use std::path::Path;
use zune_core::colorspace::ColorSpace;
use zune_core::options::DecoderOptions;
use zune_jpeg::JpegDecoder;

/// Turns a file into pixels
pub trait ImageDecoder: Send + Sync {
    /// Decode the image at `path`. Every failure carries the path.
    fn decode(&self, path: &Path) -> Result<DynamicImage, DecodeError>;
}

/// Container formats with a dedicated decode path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Other,
}

impl ImageFormat {
    /// Detect format from file extension
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref()
        {
            Some("jpg" | "jpeg") => Self::Jpeg,
            _ => Self::Other,
        }
    }
}

/// Default decoder
#[derive(Debug, Clone, Copy, Default)]
pub struct FastDecoder;

impl FastDecoder {
    pub fn new() -> Self {
        Self
    }

    fn decode_jpeg(path: &Path, bytes: &[u8]) -> Result<DynamicImage, DecodeError> {
        let corrupt = |reason: String| DecodeError::Corrupt {
            path: path.to_path_buf(),
            reason,
        };

        let options = DecoderOptions::new_fast().jpeg_set_out_colorspace(ColorSpace::RGB);
        let mut decoder = JpegDecoder::new_with_options(bytes, options);

        let pixels = decoder
            .decode()
            .map_err(|e| corrupt(format!("zune-jpeg: {:?}", e)))?;
        let info = decoder
            .info()
            .ok_or_else(|| corrupt("missing JPEG header info".to_string()))?;
        let (width, height) = (info.width as u32, info.height as u32);

        let buffer_error = || corrupt("decoded buffer does not match dimensions".to_string());
        let image = match decoder.get_output_colorspace().unwrap_or(ColorSpace::RGB) {
            ColorSpace::RGB => DynamicImage::ImageRgb8(
                ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, pixels).ok_or_else(buffer_error)?,
            ),
            ColorSpace::RGBA => DynamicImage::ImageRgba8(
                ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, pixels).ok_or_else(buffer_error)?,
            ),
            ColorSpace::Luma => DynamicImage::ImageLuma8(
                ImageBuffer::<Luma<u8>, _>::from_raw(width, height, pixels).ok_or_else(buffer_error)?,
            ),
            other => return Err(corrupt(format!("unsupported colorspace {:?}", other))),
        };

        Ok(image)
    }

    fn decode_generic(path: &Path, bytes: &[u8]) -> Result<DynamicImage, DecodeError> {
        image::load_from_memory(bytes).map_err(|e| DecodeError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

impl ImageDecoder for FastDecoder {
    fn decode(&self, path: &Path) -> Result<DynamicImage, DecodeError> {
        let bytes = fs::read(path).map_err(|source| DecodeError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let image = match ImageFormat::from_path(path) {
            ImageFormat::Jpeg => Self::decode_jpeg(path, &bytes)
                .or_else(|_| Self::decode_generic(path, &bytes))?,
            ImageFormat::Other => Self::decode_generic(path, &bytes)?,
        };

        if image.width() == 0 || image.height() == 0 {
            return Err(DecodeError::EmptyImage {
                path: path.to_path_buf(),
            });
        }

        Ok(image)
    }
}
