//! Pure calculation functions for image geometry and encoder settings.
//!
//! All functions here are pure and testable without any I/O or images.
//!
//! Rounding happens exactly once, when a fractional size becomes a pixel
//! count in [`to_pixels`]. Crop offsets are derived from the already
//! rounded render size, so no drift compounds between stages.

use super::backend::ImagingError;
use super::params::{Dimensions, FitMode, Quality};

/// Sub-rectangle to keep after resampling, in render-space pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Where to render a source before (optionally) cropping it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedGeometry {
    /// Resample target width.
    pub width: u32,
    /// Resample target height.
    pub height: u32,
    /// Present only in crop mode.
    pub crop: Option<CropBox>,
}

impl ResolvedGeometry {
    fn uncropped(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            crop: None,
        }
    }

    /// Dimensions of the final image, after the crop if there is one.
    pub fn output_dimensions(&self) -> Dimensions {
        match self.crop {
            Some(crop) => Dimensions::new(crop.width, crop.height),
            None => Dimensions::new(self.width, self.height),
        }
    }
}

/// Round a fractional size to whole pixels, never below one.
fn to_pixels(value: f64) -> u32 {
    (value.round() as u32).max(1)
}

/// Width that keeps the source aspect at a fixed height.
fn width_for_height(source: (u32, u32), height: u32) -> u32 {
    let (src_w, src_h) = source;
    to_pixels(height as f64 * (src_w as f64 / src_h as f64))
}

/// Height that keeps the source aspect at a fixed width.
fn height_for_width(source: (u32, u32), width: u32) -> u32 {
    let (src_w, src_h) = source;
    to_pixels(width as f64 * (src_h as f64 / src_w as f64))
}

/// Resolve the render geometry for a source fitted into a target box.
///
/// # Arguments
/// * `source` - Source image dimensions (width, height)
/// * `target` - Target box (width, height)
/// * `mode` - Fit policy
///
/// # Errors
/// * [`ImagingError::InvalidTargetDimensions`] if either target side is zero
/// * [`ImagingError::InvalidSourceDimensions`] if either source side is zero
///
/// # Examples
/// ```
/// # use resizable::imaging::{FitMode, resolve};
/// // 800x600 covering a 400x320 box: render 427x320, keep the centre 400x320
/// let geometry = resolve((800, 600), (400, 320), FitMode::Crop).unwrap();
/// assert_eq!((geometry.width, geometry.height), (427, 320));
/// let crop = geometry.crop.unwrap();
/// assert_eq!((crop.x, crop.y), (13, 0));
/// ```
pub fn resolve(
    source: (u32, u32),
    target: (u32, u32),
    mode: FitMode,
) -> Result<ResolvedGeometry, ImagingError> {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    if tgt_w == 0 || tgt_h == 0 {
        return Err(ImagingError::InvalidTargetDimensions {
            width: tgt_w,
            height: tgt_h,
        });
    }
    if src_w == 0 || src_h == 0 {
        return Err(ImagingError::InvalidSourceDimensions {
            width: src_w,
            height: src_h,
        });
    }

    let geometry = match mode {
        FitMode::Exact => ResolvedGeometry::uncropped(tgt_w, tgt_h),
        FitMode::Portrait => ResolvedGeometry::uncropped(width_for_height(source, tgt_h), tgt_h),
        FitMode::Landscape => ResolvedGeometry::uncropped(tgt_w, height_for_width(source, tgt_w)),
        FitMode::Auto => resolve_auto(source, target),
        FitMode::Crop => resolve_crop(source, target),
    };
    Ok(geometry)
}

/// Bind one axis of the box, chosen from the source orientation.
///
/// Square sources fall back to the target's orientation; a square source
/// into a square box renders at exactly the box.
fn resolve_auto(source: (u32, u32), target: (u32, u32)) -> ResolvedGeometry {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    let bind_width = || ResolvedGeometry::uncropped(tgt_w, height_for_width(source, tgt_w));
    let bind_height = || ResolvedGeometry::uncropped(width_for_height(source, tgt_h), tgt_h);

    if src_h < src_w {
        // Landscape source
        bind_width()
    } else if src_h > src_w {
        // Portrait source
        bind_height()
    } else if tgt_h < tgt_w {
        bind_width()
    } else if tgt_h > tgt_w {
        bind_height()
    } else {
        ResolvedGeometry::uncropped(tgt_w, tgt_h)
    }
}

/// Scale so the box is fully covered, then centre a box-sized crop.
///
/// The smaller of the two source/target ratios wins: that axis lands
/// exactly on the target, the other overshoots (or matches).
fn resolve_crop(source: (u32, u32), target: (u32, u32)) -> ResolvedGeometry {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    let height_ratio = src_h as f64 / tgt_h as f64;
    let width_ratio = src_w as f64 / tgt_w as f64;
    let optimal_ratio = height_ratio.min(width_ratio);

    // max() absorbs float error on the bound axis (399.999... -> 400)
    let width = to_pixels(src_w as f64 / optimal_ratio).max(tgt_w);
    let height = to_pixels(src_h as f64 / optimal_ratio).max(tgt_h);

    ResolvedGeometry {
        width,
        height,
        crop: Some(CropBox {
            x: (width - tgt_w) / 2,
            y: (height - tgt_h) / 2,
            width: tgt_w,
            height: tgt_h,
        }),
    }
}

/// PNG zlib level for a user-facing quality.
///
/// The scale is inverted: quality 100 means no compression (level 0),
/// quality 0 means maximum compression (level 9). Rounds half away from
/// zero, so quality 50 (4.5) scales to 5 and maps to level 4.
pub fn png_compression_level(quality: Quality) -> u8 {
    let scaled = (quality.value() as f64 / 100.0 * 9.0).round() as u8;
    9 - scaled.min(9)
}

/// JPEG quality for a user-facing quality. The codec's scale starts at 1.
pub fn jpeg_quality(quality: Quality) -> u8 {
    quality.value().clamp(1, 100) as u8
}
