//! Source images: format detection and decoding.
//!
//! The format is always taken from the file signature, never from the
//! extension. Only PNG, JPEG and GIF are accepted; anything else the
//! `image` crate may recognise is rejected as unsupported.

use super::backend::{ImageInfo, ImagingError};
use super::params::Dimensions;
use image::{DynamicImage, ImageFormat, ImageReader};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;
use std::path::Path;

/// The closed set of formats the engine reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Png,
    Jpeg,
    Gif,
}

impl SourceFormat {
    /// Map a detected `image` format onto the supported set.
    pub fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Png => Some(Self::Png),
            ImageFormat::Jpeg => Some(Self::Jpeg),
            ImageFormat::Gif => Some(Self::Gif),
            _ => None,
        }
    }

    pub fn image_format(self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Gif => ImageFormat::Gif,
        }
    }

    /// Detect the format from leading bytes.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        image::guess_format(bytes)
            .ok()
            .and_then(Self::from_image_format)
    }

    /// File extensions that name this format (lowercase, no dot).
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::Png => &["png"],
            Self::Jpeg => &["jpg", "jpeg", "jpe"],
            Self::Gif => &["gif"],
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
        }
    }

    pub fn matches_extension(self, ext: &str) -> bool {
        self.extensions()
            .iter()
            .any(|e| e.eq_ignore_ascii_case(ext))
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Png => "PNG",
            Self::Jpeg => "JPEG",
            Self::Gif => "GIF",
        })
    }
}

/// A decoded source image. Immutable once built.
pub struct SourceImage {
    raster: DynamicImage,
    format: SourceFormat,
}

impl SourceImage {
    pub fn new(raster: DynamicImage, format: SourceFormat) -> Self {
        Self { raster, format }
    }

    pub fn raster(&self) -> &DynamicImage {
        &self.raster
    }

    pub fn format(&self) -> SourceFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.raster.width()
    }

    pub fn height(&self) -> u32 {
        self.raster.height()
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width(), self.height())
    }

    pub fn info(&self) -> ImageInfo {
        ImageInfo {
            width: self.width(),
            height: self.height(),
            format: self.format,
        }
    }
}

fn unsupported(path: &Path, detail: impl Into<String>) -> ImagingError {
    ImagingError::UnsupportedFormat {
        path: path.to_path_buf(),
        detail: detail.into(),
    }
}

fn describe_unknown(bytes: &[u8]) -> String {
    match image::guess_format(bytes) {
        Ok(other) => format!("{other:?} images are not accepted"),
        Err(_) => "not a recognised image signature".to_string(),
    }
}

/// Read and decode the image at `path`.
///
/// The whole file is read once; the signature picks the decoder.
pub fn open(path: &Path) -> Result<SourceImage, ImagingError> {
    let bytes = std::fs::read(path).map_err(|source| ImagingError::FileNotReadable {
        path: path.to_path_buf(),
        source,
    })?;
    decode(&bytes, path)
}

/// Read format and dimensions from the header only.
pub fn identify(path: &Path) -> Result<ImageInfo, ImagingError> {
    let reader = ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|source| ImagingError::FileNotReadable {
            path: path.to_path_buf(),
            source,
        })?;

    let format = match reader.format() {
        Some(detected) => SourceFormat::from_image_format(detected)
            .ok_or_else(|| unsupported(path, format!("{detected:?} images are not accepted")))?,
        None => return Err(unsupported(path, "not a recognised image signature")),
    };

    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| unsupported(path, format!("unreadable {format} header: {e}")))?;

    Ok(ImageInfo {
        width,
        height,
        format,
    })
}

/// Decode an in-memory image. Used where bytes are already at hand.
pub fn decode(bytes: &[u8], origin: &Path) -> Result<SourceImage, ImagingError> {
    let format =
        SourceFormat::detect(bytes).ok_or_else(|| unsupported(origin, describe_unknown(bytes)))?;
    let raster = ImageReader::with_format(Cursor::new(bytes), format.image_format())
        .decode()
        .map_err(|e| unsupported(origin, format!("failed to decode {format}: {e}")))?;
    Ok(SourceImage::new(raster, format))
}
