//! Shared test utilities for the resizable test suite.
//!
//! Synthetic image writers and an upload-ready config rooted in a temp
//! directory.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let source = tmp.path().join("cat.jpg");
//! create_test_jpeg(&source, 800, 600);
//!
//! let config = upload_config(tmp.path());
//! ```

use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage, Rgba, RgbaImage};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::config::UploadConfig;

// =========================================================================
// Synthetic images
// =========================================================================

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ])
    })
}

/// Write a gradient JPEG of the given size.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = gradient(width, height);
    let file = BufWriter::new(File::create(path).unwrap());
    JpegEncoder::new_with_quality(file, 90)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
}

/// Write a gradient PNG of the given size.
pub fn create_test_png(path: &Path, width: u32, height: u32) {
    gradient(width, height).save(path).unwrap();
}

/// Write a single-frame GIF of the given size.
pub fn create_test_gif(path: &Path, width: u32, height: u32) {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 8 % 256) as u8, (y * 8 % 256) as u8, 0, 255])
    });
    let file = BufWriter::new(File::create(path).unwrap());
    GifEncoder::new(file)
        .encode(img.as_raw(), width, height, ExtendedColorType::Rgba8)
        .unwrap();
}

// =========================================================================
// Config
// =========================================================================

/// Stock config with `base_dir` pointing into `root` and directory
/// creation enabled.
pub fn upload_config(root: &Path) -> UploadConfig {
    UploadConfig {
        base_dir: root.join("uploads"),
        create_dir: true,
        ..UploadConfig::default()
    }
}
