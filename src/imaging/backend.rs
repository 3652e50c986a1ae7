//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the operations every backend must
//! support: identify (header only), open (full decode) and render (one
//! derivative from an already-opened source).
//!
//! Splitting open from render lets the pipeline decode a source once and
//! render every derivative from the same read-only raster, in parallel.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate.

use super::params::{DerivativeParams, Dimensions};
use super::source::SourceFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImagingError {
    /// Source path missing or unreadable.
    #[error("cannot read {}: {source}", path.display())]
    FileNotReadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Unrecognised or corrupt image data, or an encode target the raster
    /// cannot be written as.
    #[error("unsupported image format for {}: {detail}", path.display())]
    UnsupportedFormat { path: PathBuf, detail: String },
    /// Zero-sized target box.
    #[error("invalid target dimensions {width}x{height}: both must be greater than zero")]
    InvalidTargetDimensions { width: u32, height: u32 },
    /// Zero-sized source raster; nothing to scale from.
    #[error("invalid source dimensions {width}x{height}: image is empty")]
    InvalidSourceDimensions { width: u32, height: u32 },
    /// Destination not writable, disk full, or the final rename failed.
    #[error("cannot write {}: {source}", path.display())]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result of an identify operation: header-level facts about an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub format: SourceFormat,
}

impl ImageInfo {
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }
}

/// Trait for image processing backends.
///
/// `Source` is whatever the backend needs to keep between decode and
/// render. It must be `Sync`: derivatives borrow it from several rayon
/// workers at once.
pub trait ImageBackend: Sync {
    type Source: Sync;

    /// Read format and dimensions without decoding pixel data.
    fn identify(&self, path: &Path) -> Result<ImageInfo, ImagingError>;

    /// Decode the image at `path`.
    fn open(&self, path: &Path) -> Result<Self::Source, ImagingError>;

    /// Describe an opened source.
    fn info(&self, source: &Self::Source) -> ImageInfo;

    /// Render one derivative and write it to `params.output`.
    ///
    /// Returns the dimensions of the written image.
    fn render(
        &self,
        source: &Self::Source,
        params: &DerivativeParams,
    ) -> Result<Dimensions, ImagingError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::calculations::resolve;
    use crate::imaging::params::{FitMode, FitSpec, Quality};
    use std::sync::Mutex;

    /// Mock backend that records operations without touching pixels.
    /// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
    #[derive(Default)]
    pub struct MockBackend {
        pub info: Option<ImageInfo>,
        /// File or parent-directory names whose render should fail with a write error.
        pub failing_outputs: Vec<String>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Identify(String),
        Open(String),
        Render {
            output: String,
            width: u32,
            height: u32,
            mode: FitMode,
            quality: u32,
        },
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_info(width: u32, height: u32, format: SourceFormat) -> Self {
            Self {
                info: Some(ImageInfo {
                    width,
                    height,
                    format,
                }),
                ..Self::default()
            }
        }

        pub fn failing_on(mut self, file_name: &str) -> Self {
            self.failing_outputs.push(file_name.to_string());
            self
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        fn lookup(&self, path: &Path) -> Result<ImageInfo, ImagingError> {
            self.info.ok_or_else(|| ImagingError::UnsupportedFormat {
                path: path.to_path_buf(),
                detail: "no mock image info".to_string(),
            })
        }
    }

    impl ImageBackend for MockBackend {
        type Source = ImageInfo;

        fn identify(&self, path: &Path) -> Result<ImageInfo, ImagingError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Identify(path.to_string_lossy().to_string()));
            self.lookup(path)
        }

        fn open(&self, path: &Path) -> Result<ImageInfo, ImagingError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Open(path.to_string_lossy().to_string()));
            self.lookup(path)
        }

        fn info(&self, source: &ImageInfo) -> ImageInfo {
            *source
        }

        fn render(
            &self,
            source: &ImageInfo,
            params: &DerivativeParams,
        ) -> Result<Dimensions, ImagingError> {
            self.operations.lock().unwrap().push(RecordedOp::Render {
                output: params.output.to_string_lossy().to_string(),
                width: params.fit.width,
                height: params.fit.height,
                mode: params.fit.mode,
                quality: params.quality.value(),
            });

            let file_name = params
                .output
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let parent = params
                .output
                .parent()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if self.failing_outputs.contains(&file_name)
                || self.failing_outputs.contains(&parent)
            {
                return Err(ImagingError::WriteError {
                    path: params.output.clone(),
                    source: std::io::Error::other("mock write failure"),
                });
            }

            let geometry = resolve(
                (source.width, source.height),
                params.fit.target(),
                params.fit.mode,
            )?;
            Ok(geometry.output_dimensions())
        }
    }

    #[test]
    fn mock_records_identify() {
        let backend = MockBackend::with_info(800, 600, SourceFormat::Jpeg);

        let result = backend.identify(Path::new("/test/image.jpg")).unwrap();
        assert_eq!(result.width, 800);
        assert_eq!(result.height, 600);

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], RecordedOp::Identify(p) if p == "/test/image.jpg"));
    }

    #[test]
    fn mock_without_info_reports_unsupported() {
        let backend = MockBackend::new();
        let result = backend.open(Path::new("/test/blob.bin"));
        assert!(matches!(result, Err(ImagingError::UnsupportedFormat { .. })));
    }

    #[test]
    fn mock_records_render_and_resolves_geometry() {
        let backend = MockBackend::with_info(800, 600, SourceFormat::Png);
        let source = backend.open(Path::new("/source.png")).unwrap();

        let dims = backend
            .render(
                &source,
                &DerivativeParams {
                    output: "/out/gallery/1-a.png".into(),
                    fit: FitSpec::new(Dimensions::new(400, 320), FitMode::Crop),
                    quality: Quality::new(80),
                },
            )
            .unwrap();
        assert_eq!(dims, Dimensions::new(400, 320));

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 2);
        assert!(matches!(
            &ops[1],
            RecordedOp::Render {
                width: 400,
                height: 320,
                mode: FitMode::Crop,
                quality: 80,
                ..
            }
        ));
    }

    #[test]
    fn error_messages_name_the_path() {
        let err = ImagingError::UnsupportedFormat {
            path: "/tmp/a.bmp".into(),
            detail: "BMP is not accepted".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/tmp/a.bmp"));
        assert!(msg.contains("BMP is not accepted"));

        let err = ImagingError::InvalidTargetDimensions {
            width: 0,
            height: 100,
        };
        assert!(err.to_string().contains("0x100"));
    }
}
