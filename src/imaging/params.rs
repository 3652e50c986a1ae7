//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! (which decides which derivatives to create) and the
//! [`backend`](super::backend) (which does the actual pixel work).
//!
//! ## Types
//!
//! - [`Quality`] — User-facing encoding quality (0–100, default 100). Clamped on construction.
//! - [`FitMode`] — How a source is fitted into a target box (exact, portrait, landscape, auto, crop).
//! - [`Dimensions`] — A `width × height` pair, parseable from `"200x160"`.
//! - [`FitSpec`] — Target box + fit mode for one derivative.
//! - [`DerivativeParams`] — Full specification for one derivative: output path, fit, quality.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Encoding quality on the user-facing 0–100 scale.
///
/// Each format maps it differently: JPEG uses it directly, PNG inverts it
/// into a 0–9 compression level, GIF ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.min(100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(100)
    }
}

/// Policy mapping source dimensions onto a target box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Render at exactly the target box, ignoring source aspect.
    Exact,
    /// Bind the target height, derive the width from source aspect.
    Portrait,
    /// Bind the target width, derive the height from source aspect.
    Landscape,
    /// Bind whichever axis the source orientation picks.
    Auto,
    /// Cover the box, then crop the centre to exactly the box.
    Crop,
}

impl FitMode {
    pub const ALL: [FitMode; 5] = [
        FitMode::Exact,
        FitMode::Portrait,
        FitMode::Landscape,
        FitMode::Auto,
        FitMode::Crop,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FitMode::Exact => "exact",
            FitMode::Portrait => "portrait",
            FitMode::Landscape => "landscape",
            FitMode::Auto => "auto",
            FitMode::Crop => "crop",
        }
    }
}

impl fmt::Display for FitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FitMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        FitMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == wanted)
            .ok_or_else(|| {
                format!("unknown fit mode '{s}' (expected exact, portrait, landscape, auto or crop)")
            })
    }
}

/// A `width × height` pair in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn as_tuple(self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Parses the `"WxH"` notation used in config files (`"200x160"`, `"400X320"`).
///
/// Zero is accepted here; rejecting it is the geometry resolver's job.
impl FromStr for Dimensions {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("dimension '{s}' must look like WIDTHxHEIGHT"))?;
        let width = w
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("dimension '{s}': bad width: {e}"))?;
        let height = h
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("dimension '{s}': bad height: {e}"))?;
        Ok(Self { width, height })
    }
}

/// Target box and fit mode for one derivative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitSpec {
    pub width: u32,
    pub height: u32,
    pub mode: FitMode,
}

impl FitSpec {
    pub fn new(target: Dimensions, mode: FitMode) -> Self {
        Self {
            width: target.width,
            height: target.height,
            mode,
        }
    }

    pub fn target(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Parameters for rendering a single derivative from an opened source.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivativeParams {
    pub output: PathBuf,
    pub fit: FitSpec,
    pub quality: Quality,
}
