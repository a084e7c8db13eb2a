//! Shared helpers for integration tests: synthetic images and configs.

#![allow(dead_code)]

use image::{imageops::FilterType, DynamicImage, ImageBuffer, Rgb};
use spectramatch::core::config::EngineConfig;
use std::path::{Path, PathBuf};

/// A diagonal ramp with a bright disc in the upper left
pub fn scene(side: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(ImageBuffer::from_fn(side, side, |x, y| {
        let (u, v) = (x as f32 / side as f32, y as f32 / side as f32);
        let ramp = ((u + v) * 0.5 * 200.0) as u8;
        let in_disc = (u - 0.3).powi(2) + (v - 0.3).powi(2) < 0.02;
        if in_disc {
            Rgb([250, 240, 200])
        } else {
            Rgb([ramp, ramp, ramp.saturating_add(20)])
        }
    }))
}

/// A 4x4 checkerboard, unrelated to [`scene`]
pub fn checkerboard(side: u32) -> DynamicImage {
    let block = (side / 4).max(1);
    DynamicImage::ImageRgb8(ImageBuffer::from_fn(side, side, |x, y| {
        if (x / block + y / block) % 2 == 0 {
            Rgb([30, 30, 30])
        } else {
            Rgb([220, 220, 220])
        }
    }))
}

/// A small image whose pixels encode `seed`
pub fn tiny(seed: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(ImageBuffer::from_fn(8, 8, move |x, y| {
        Rgb([(seed % 251) as u8, ((seed / 251) % 251) as u8, ((x * 8 + y) * 4) as u8])
    }))
}

pub fn save(image: &DynamicImage, dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    image.save(&path).unwrap();
    path
}

pub fn save_resized(image: &DynamicImage, side: u32, dir: &Path, name: &str) -> PathBuf {
    let resized = image.resize_exact(side, side, FilterType::Lanczos3);
    save(&resized, dir, name)
}

/// Config scanning `root` with the store next to it
pub fn config_for(root: &Path, store_dir: &Path) -> EngineConfig {
    EngineConfig {
        roots: vec![root.to_path_buf()],
        workers: 2,
        store_path: store_dir.join("library.db"),
        ..EngineConfig::default()
    }
}

pub fn file_names(paths: &[PathBuf]) -> Vec<String> {
    let mut names: Vec<String> = paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
