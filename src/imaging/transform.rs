//! Resampling and cropping of decoded rasters.

use super::calculations::ResolvedGeometry;
use super::params::Dimensions;
use super::source::{SourceFormat, SourceImage};
use image::DynamicImage;
use image::imageops::FilterType;

/// Resampling filter for every derivative. Lanczos3 keeps edges crisp on
/// downscales; nearest-neighbour is never used.
pub const RESAMPLE_FILTER: FilterType = FilterType::Lanczos3;

/// A rendered derivative, ready for encoding.
pub struct OutputImage {
    raster: DynamicImage,
    format: SourceFormat,
}

impl OutputImage {
    pub fn new(raster: DynamicImage, format: SourceFormat) -> Self {
        Self { raster, format }
    }

    pub fn raster(&self) -> &DynamicImage {
        &self.raster
    }

    pub fn format(&self) -> SourceFormat {
        self.format
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.raster.width(), self.raster.height())
    }
}

/// Resample `source` to the resolved size, then crop if the geometry asks.
///
/// The source is only borrowed; every call allocates its own output, so
/// several derivatives can be rendered from one source concurrently.
pub fn transform(source: &SourceImage, geometry: &ResolvedGeometry) -> OutputImage {
    let raster = source.raster();

    let resampled = if raster.width() == geometry.width && raster.height() == geometry.height {
        raster.clone()
    } else {
        raster.resize_exact(geometry.width, geometry.height, RESAMPLE_FILTER)
    };

    let cropped = match geometry.crop {
        Some(crop) => resampled.crop_imm(crop.x, crop.y, crop.width, crop.height),
        None => resampled,
    };

    OutputImage::new(cropped, source.format())
}
