//! Encoding rendered derivatives back to their source format.
//!
//! | Format | Setting passed to the codec |
//! |---|---|
//! | JPEG | quality as-is (floor 1) |
//! | PNG | zlib level `9 - round(quality / 100 * 9)` |
//! | GIF | none, always lossless |
//!
//! All writes go through [`write_atomic`]: bytes land in a temporary file
//! next to the destination, which is renamed into place only after the
//! encoder finished. Readers never see a half-written file, and a failed
//! encode leaves nothing behind.

use super::backend::ImagingError;
use super::calculations::{jpeg_quality, png_compression_level};
use super::params::Quality;
use super::source::SourceFormat;
use super::transform::OutputImage;
use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{DynamicImage, ExtendedColorType, ImageEncoder};
use std::borrow::Cow;
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Write a file through a sibling temp file and an atomic rename.
///
/// `write` receives a buffered writer; anything it returns as an error
/// aborts the write and removes the temp file.
pub fn write_atomic<F>(dest: &Path, write: F) -> Result<(), ImagingError>
where
    F: FnOnce(&mut dyn Write) -> std::io::Result<()>,
{
    let write_error = |source: std::io::Error| ImagingError::WriteError {
        path: dest.to_path_buf(),
        source,
    };

    let dir = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir).map_err(write_error)?;

    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        write(&mut writer).map_err(write_error)?;
        writer.flush().map_err(write_error)?;
    }
    tmp.as_file().sync_all().map_err(write_error)?;

    tmp.persist(dest).map_err(|e| write_error(e.error))?;
    Ok(())
}

/// Refuse to write a raster under an extension that names another format.
///
/// Paths without an extension are accepted; the format then comes from the
/// raster alone.
fn check_target(format: SourceFormat, dest: &Path) -> Result<(), ImagingError> {
    match dest.extension().and_then(|e| e.to_str()) {
        Some(ext) if !format.matches_extension(ext) => Err(ImagingError::UnsupportedFormat {
            path: dest.to_path_buf(),
            detail: format!("cannot write {format} data to a .{ext} file"),
        }),
        _ => Ok(()),
    }
}

/// JPEG has no alpha channel; flatten anything that is not already L8/RGB8.
fn jpeg_compatible(raster: &DynamicImage) -> Cow<'_, DynamicImage> {
    match raster {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => Cow::Borrowed(raster),
        other => Cow::Owned(DynamicImage::ImageRgb8(other.to_rgb8())),
    }
}

fn png_compression(quality: Quality) -> CompressionType {
    match png_compression_level(quality) {
        0 => CompressionType::Uncompressed,
        level => CompressionType::Level(level),
    }
}

fn encode_into(image: &OutputImage, quality: Quality, w: &mut dyn Write) -> std::io::Result<()> {
    let raster = image.raster();
    match image.format() {
        SourceFormat::Jpeg => {
            let flat = jpeg_compatible(raster);
            let encoder = JpegEncoder::new_with_quality(w, jpeg_quality(quality));
            encoder
                .write_image(flat.as_bytes(), flat.width(), flat.height(), flat.color().into())
                .map_err(std::io::Error::other)
        }
        SourceFormat::Png => {
            let encoder =
                PngEncoder::new_with_quality(w, png_compression(quality), FilterType::Adaptive);
            encoder
                .write_image(
                    raster.as_bytes(),
                    raster.width(),
                    raster.height(),
                    raster.color().into(),
                )
                .map_err(std::io::Error::other)
        }
        SourceFormat::Gif => {
            let rgba = raster.to_rgba8();
            let mut encoder = GifEncoder::new(w);
            encoder
                .encode(
                    rgba.as_raw(),
                    rgba.width(),
                    rgba.height(),
                    ExtendedColorType::Rgba8,
                )
                .map_err(std::io::Error::other)
        }
    }
}

/// Encode `image` in its own format and write it atomically to `dest`.
pub fn encode(image: &OutputImage, dest: &Path, quality: Quality) -> Result<(), ImagingError> {
    check_target(image.format(), dest)?;
    write_atomic(dest, |w| encode_into(image, quality, w))
}

/// Encode to an in-memory buffer instead of a file.
pub fn encode_to_vec(image: &OutputImage, quality: Quality) -> Result<Vec<u8>, ImagingError> {
    let mut buf = Vec::new();
    encode_into(image, quality, &mut buf).map_err(|source| ImagingError::WriteError {
        path: "<memory>".into(),
        source,
    })?;
    Ok(buf)
}
