//! High-level image operations.
//!
//! These functions combine planning with backend execution. They take
//! derivative configuration, compute output paths and parameters, and call
//! the backend.

use super::backend::{ImageBackend, ImageInfo, ImagingError};
use super::params::{DerivativeParams, Dimensions, FitSpec, Quality};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, ImagingError>;

/// Get format and dimensions using the backend.
pub fn get_info(backend: &impl ImageBackend, path: &Path) -> Result<ImageInfo> {
    backend.identify(path)
}

/// Configuration for one derivative (e.g. `thumbnail`, `gallery`).
#[derive(Debug, Clone, PartialEq)]
pub struct DerivativeConfig {
    pub name: String,
    pub fit: FitSpec,
    /// Directory (relative to the upload root) the derivative is written to.
    pub sub_dir: String,
    pub quality: Quality,
}

/// A derivative that was written to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedDerivative {
    pub name: String,
    pub path: PathBuf,
    pub dimensions: Dimensions,
}

/// Plan a derivative without executing it.
///
/// The output lands at `<root>/<sub_dir>/<file_name>`; the file name (and
/// with it the extension) is the same for every derivative of a source.
pub fn plan_derivative(
    root: &Path,
    file_name: &str,
    config: &DerivativeConfig,
) -> DerivativeParams {
    DerivativeParams {
        output: root.join(&config.sub_dir).join(file_name),
        fit: config.fit,
        quality: config.quality,
    }
}

/// Render one derivative from an opened source.
pub fn create_derivative<B: ImageBackend>(
    backend: &B,
    source: &B::Source,
    root: &Path,
    file_name: &str,
    config: &DerivativeConfig,
) -> Result<GeneratedDerivative> {
    let params = plan_derivative(root, file_name, config);
    let dimensions = backend.render(source, &params)?;
    debug!(
        derivative = %config.name,
        path = %params.output.display(),
        %dimensions,
        "derivative written"
    );
    Ok(GeneratedDerivative {
        name: config.name.clone(),
        path: params.output,
        dimensions,
    })
}

/// Render every configured derivative in parallel.
///
/// Each derivative is independent: a failure is returned in its own slot
/// and never stops the others. Results keep the order of `configs`.
pub fn create_derivatives<B: ImageBackend>(
    backend: &B,
    source: &B::Source,
    root: &Path,
    file_name: &str,
    configs: &[DerivativeConfig],
) -> Vec<(String, Result<GeneratedDerivative>)> {
    configs
        .par_iter()
        .map(|config| {
            let result = create_derivative(backend, source, root, file_name, config);
            if let Err(e) = &result {
                warn!(derivative = %config.name, error = %e, "derivative failed");
            }
            (config.name.clone(), result)
        })
        .collect()
}

/// Decode `source_path` and write a single derivative to `output`.
///
/// The one-off path used by the `resize` command: open, resolve, transform,
/// encode, with nothing shared.
pub fn resize_file(
    backend: &impl ImageBackend,
    source_path: &Path,
    output: &Path,
    fit: FitSpec,
    quality: Quality,
) -> Result<Dimensions> {
    let source = backend.open(source_path)?;
    backend.render(
        &source,
        &DerivativeParams {
            output: output.to_path_buf(),
            fit,
            quality,
        },
    )
}
