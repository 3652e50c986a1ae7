//! Image processing: pure Rust, no system codecs.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader` header read |
//! | **Decode** | `image` (PNG, JPEG, GIF; format from signature) |
//! | **Resolve** | [`resolve`], pure geometry |
//! | **Transform** | Lanczos3 `resize_exact` + `crop_imm` |
//! | **Encode** | source format, quality mapped per codec, atomic write |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for geometry and encoder settings (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Source / Transform / Encoder**: the decode → resample → write stages
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining planning + backend

pub mod backend;
pub mod calculations;
pub mod encoder;
pub mod operations;
mod params;
pub mod rust_backend;
pub mod source;
pub mod transform;

pub use backend::{ImageBackend, ImageInfo, ImagingError};
pub use calculations::{CropBox, ResolvedGeometry, png_compression_level, resolve};
pub use operations::{
    DerivativeConfig, GeneratedDerivative, create_derivative, create_derivatives, get_info,
    resize_file,
};
pub use params::{DerivativeParams, Dimensions, FitMode, FitSpec, Quality};
pub use rust_backend::RustBackend;
pub use source::{SourceFormat, SourceImage};
pub use transform::OutputImage;
