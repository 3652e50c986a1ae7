//! Upload pipeline: validate, store the original, then render derivatives.
//!
//! ## Phases
//!
//! 1. **Accept** (all-or-nothing)
//!    - validate size, MIME type, extension and image signature
//!    - make sure every target directory exists and is writable
//!    - copy the upload to `<base_dir>/<dir>/<sub_dir>/<physical name>`
//! 2. **Derive** (best effort): decode the stored original once, then write
//!    each derivative to `<base_dir>/<dir>/<derivative sub_dir>/<physical name>`
//!    in parallel. A failed derivative is recorded in the report; it never
//!    fails the upload or its siblings.
//!
//! Nothing is written before phase 1 validation passes. [`rollback`]
//! removes everything an upload stored.

use crate::config::{ConfigError, UploadConfig};
use crate::imaging::{
    DerivativeConfig, Dimensions, ImageBackend, ImageInfo, ImagingError, RustBackend,
    SourceFormat, create_derivatives, encoder,
};
use crate::naming;
use crate::types::{DerivativeOutcome, DerivativeReport, UploadReport};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Fallback MIME type when neither the caller nor the signature names one.
const UNKNOWN_MIME: &str = "application/octet-stream";

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("no file was uploaded at {}", path.display())]
    FileNotUploaded { path: PathBuf },
    #[error("file is {size} bytes, limit is {max}")]
    InvalidFileSize { size: u64, max: u64 },
    #[error("MIME type {mime} is not accepted")]
    InvalidFileType { mime: String },
    #[error("extension \"{extension}\" is not accepted")]
    InvalidFileExtension { extension: String },
    #[error("extension \"{extension}\" does not match the {format} content")]
    ExtensionMismatch {
        extension: String,
        format: SourceFormat,
    },
    #[error("not a supported image: {0}")]
    InvalidFile(#[source] ImagingError),
    #[error("directory does not exist: {}", path.display())]
    DirectoryDoesNotExist { path: PathBuf },
    #[error("directory is not writable: {}", path.display())]
    DirectoryNotWritable { path: PathBuf },
    #[error("cannot create {} under {}", path.display(), parent.display())]
    ParentDirectoryNotWritable { path: PathBuf, parent: PathBuf },
    #[error("failed to store upload: {0}")]
    ErrorUploadingFile(#[source] ImagingError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl UploadError {
    /// Stable code used for message lookup and machine-readable output.
    pub fn code(&self) -> &'static str {
        match self {
            UploadError::FileNotUploaded { .. } => "FILE_NOT_UPLOADED",
            UploadError::InvalidFileSize { .. } => "INVALID_FILE_SIZE",
            UploadError::InvalidFileType { .. } => "INVALID_FILE_TYPE",
            UploadError::InvalidFileExtension { .. } | UploadError::ExtensionMismatch { .. } => {
                "INVALID_FILE_EXTENSION"
            }
            UploadError::InvalidFile(_) => "INVALID_FILE",
            UploadError::DirectoryDoesNotExist { .. } => "DIRECTORY_DOES_NOT_EXIST",
            UploadError::DirectoryNotWritable { .. } => "DIRECTORY_NOT_WRITABLE",
            UploadError::ParentDirectoryNotWritable { .. } => "PARENT_DIRECTORY_NOT_WRITABLE",
            UploadError::ErrorUploadingFile(_) => "ERROR_UPLOADING_FILE",
            UploadError::Config(_) => "INVALID_CONFIG",
        }
    }
}

/// One file handed to the pipeline.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Identifier of the owning record, used by the `{ID}` token.
    pub record_id: String,
    /// Where the uploaded bytes currently live.
    pub source: PathBuf,
    /// Client-side file name, used for the extension check and naming.
    pub original_name: String,
    /// Client-declared MIME type. Defaults to the one implied by the signature.
    pub mime_type: Option<String>,
    /// Client-declared size. Defaults to the file's length.
    pub size: Option<u64>,
}

impl UploadRequest {
    /// A request for a local file, named after its own file name.
    pub fn from_path(record_id: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        let source = source.into();
        let original_name = source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            record_id: record_id.into(),
            source,
            original_name,
            mime_type: None,
            size: None,
        }
    }
}

/// Run an upload with the production backend.
pub fn upload(config: &UploadConfig, request: &UploadRequest) -> Result<UploadReport, UploadError> {
    upload_with_backend(&RustBackend::new(), config, request)
}

/// Run an upload through any [`ImageBackend`].
pub fn upload_with_backend<B: ImageBackend>(
    backend: &B,
    config: &UploadConfig,
    request: &UploadRequest,
) -> Result<UploadReport, UploadError> {
    config.validate()?;
    let derivatives = config.derivative_configs()?;

    // Phase 1: accept
    let info = validate(backend, config, request)?;
    let root = config.upload_root();
    ensure_directory(&config.original_dir(), config.create_dir)?;
    for derivative in &derivatives {
        ensure_directory(&root.join(&derivative.sub_dir), config.create_dir)?;
    }

    let physical_name =
        naming::physical_name(&config.physical_name, &request.record_id, &request.original_name);
    let original = config.original_dir().join(&physical_name);
    store_original(&request.source, &original)?;
    info!(
        record = %request.record_id,
        path = %original.display(),
        format = %info.format,
        width = info.width,
        height = info.height,
        "stored original"
    );

    // Phase 2: derive
    let outcomes = derive(backend, &original, &root, &physical_name, &derivatives);
    let reports = derivatives
        .iter()
        .zip(outcomes)
        .map(|(config, outcome)| DerivativeReport {
            name: config.name.clone(),
            sub_dir: config.sub_dir.clone(),
            mode: config.fit.mode,
            target: Dimensions::new(config.fit.width, config.fit.height),
            outcome,
        })
        .collect();

    Ok(UploadReport {
        record_id: request.record_id.clone(),
        original,
        physical_name,
        format: info.format,
        dimensions: info.dimensions(),
        derivatives: reports,
    })
}

/// Phase 1a. Checks run in a fixed order; the first failure wins.
fn validate<B: ImageBackend>(
    backend: &B,
    config: &UploadConfig,
    request: &UploadRequest,
) -> Result<ImageInfo, UploadError> {
    let not_uploaded = || UploadError::FileNotUploaded {
        path: request.source.clone(),
    };
    let metadata = fs::metadata(&request.source).map_err(|_| not_uploaded())?;
    if !metadata.is_file() || metadata.len() == 0 {
        return Err(not_uploaded());
    }

    let size = request.size.unwrap_or(metadata.len());
    if config.max_size > 0 && size > config.max_size {
        return Err(UploadError::InvalidFileSize {
            size,
            max: config.max_size,
        });
    }

    let identified = backend.identify(&request.source);

    let mime = match (&request.mime_type, &identified) {
        (Some(declared), _) => declared.clone(),
        (None, Ok(info)) => info.format.mime_type().to_string(),
        (None, Err(_)) => UNKNOWN_MIME.to_string(),
    };
    if !config.types.allows(&mime) {
        return Err(UploadError::InvalidFileType { mime });
    }

    let (_, extension) = naming::split_extension(&request.original_name);
    if !config.extensions.allows(&extension) {
        return Err(UploadError::InvalidFileExtension { extension });
    }

    let info = identified.map_err(UploadError::InvalidFile)?;
    // Derivatives reuse the stored name, and the encoder will not write one
    // format under another's extension.
    if !extension.is_empty() && !info.format.matches_extension(&extension) {
        return Err(UploadError::ExtensionMismatch {
            extension,
            format: info.format,
        });
    }
    debug!(
        record = %request.record_id,
        size,
        %mime,
        %extension,
        format = %info.format,
        "upload validated"
    );
    Ok(info)
}

/// Phase 1b. Make sure `dir` exists and accepts new files.
pub fn ensure_directory(dir: &Path, create: bool) -> Result<(), UploadError> {
    if dir.exists() {
        if !dir.is_dir() || !is_writable(dir) {
            return Err(UploadError::DirectoryNotWritable {
                path: dir.to_path_buf(),
            });
        }
        return Ok(());
    }

    if !create {
        return Err(UploadError::DirectoryDoesNotExist {
            path: dir.to_path_buf(),
        });
    }

    let parent = nearest_existing_ancestor(dir);
    let parent_error = || UploadError::ParentDirectoryNotWritable {
        path: dir.to_path_buf(),
        parent: parent.clone(),
    };
    if !parent.is_dir() || !is_writable(&parent) {
        return Err(parent_error());
    }
    fs::create_dir_all(dir).map_err(|_| parent_error())?;
    debug!(path = %dir.display(), "created directory");
    Ok(())
}

fn nearest_existing_ancestor(dir: &Path) -> PathBuf {
    dir.ancestors()
        .skip(1)
        .map(|p| {
            if p.as_os_str().is_empty() {
                Path::new(".")
            } else {
                p
            }
        })
        .find(|p| p.exists())
        .unwrap_or(Path::new("."))
        .to_path_buf()
}

/// Probe by creating (and immediately dropping) an anonymous temp file.
fn is_writable(dir: &Path) -> bool {
    tempfile::tempfile_in(dir).is_ok()
}

/// Phase 1c.
fn store_original(source: &Path, dest: &Path) -> Result<(), UploadError> {
    encoder::write_atomic(dest, |w| {
        let mut input = File::open(source)?;
        io::copy(&mut input, w).map(|_| ())
    })
    .map_err(UploadError::ErrorUploadingFile)
}

/// Phase 2. One outcome per derivative, in config order.
fn derive<B: ImageBackend>(
    backend: &B,
    original: &Path,
    root: &Path,
    physical_name: &str,
    derivatives: &[DerivativeConfig],
) -> Vec<DerivativeOutcome> {
    if derivatives.is_empty() {
        return Vec::new();
    }

    let source = match backend.open(original) {
        Ok(source) => source,
        Err(e) => {
            warn!(path = %original.display(), error = %e, "cannot decode stored original");
            let error = e.to_string();
            return derivatives
                .iter()
                .map(|_| DerivativeOutcome::Failed {
                    error: error.clone(),
                })
                .collect();
        }
    };

    create_derivatives(backend, &source, root, physical_name, derivatives)
        .into_iter()
        .map(|(_, result)| match result {
            Ok(generated) => DerivativeOutcome::Generated {
                path: generated.path,
                width: generated.dimensions.width,
                height: generated.dimensions.height,
            },
            Err(e) => DerivativeOutcome::Failed {
                error: e.to_string(),
            },
        })
        .collect()
}

/// Remove every file an upload stored. Returns how many were removed.
///
/// Missing files are skipped silently; other removal errors are logged and
/// otherwise ignored.
pub fn rollback(report: &UploadReport) -> usize {
    let mut removed = 0;
    for path in report.stored_files() {
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "removed");
                removed += 1;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "rollback could not remove file"),
        }
    }
    info!(record = %report.record_id, removed, "rolled back upload");
    removed
}
