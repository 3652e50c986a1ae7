//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `image::ImageReader::into_dimensions` (header only) |
//! | Decode (JPEG, PNG, GIF) | `image` crate, format from signature |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Crop | `DynamicImage::crop_imm` |
//! | Encode | `image::codecs::{jpeg, png, gif}` via a temp file + rename |

use super::backend::{ImageBackend, ImageInfo, ImagingError};
use super::calculations::resolve;
use super::params::{DerivativeParams, Dimensions};
use super::source::{self, SourceImage};
use super::{encoder, transform};
use std::path::Path;
use tracing::debug;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBackend for RustBackend {
    type Source = SourceImage;

    fn identify(&self, path: &Path) -> Result<ImageInfo, ImagingError> {
        source::identify(path)
    }

    fn open(&self, path: &Path) -> Result<SourceImage, ImagingError> {
        let image = source::open(path)?;
        debug!(
            path = %path.display(),
            format = %image.format(),
            width = image.width(),
            height = image.height(),
            "decoded source"
        );
        Ok(image)
    }

    fn info(&self, source: &SourceImage) -> ImageInfo {
        source.info()
    }

    fn render(
        &self,
        source: &SourceImage,
        params: &DerivativeParams,
    ) -> Result<Dimensions, ImagingError> {
        let geometry = resolve(
            (source.width(), source.height()),
            params.fit.target(),
            params.fit.mode,
        )?;
        debug!(
            output = %params.output.display(),
            mode = %params.fit.mode,
            render_width = geometry.width,
            render_height = geometry.height,
            cropped = geometry.crop.is_some(),
            "resolved geometry"
        );

        let output = transform::transform(source, &geometry);
        encoder::encode(&output, &params.output, params.quality)?;
        Ok(output.dimensions())
    }
}
