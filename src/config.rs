//! Upload configuration module.
//!
//! Handles loading, validating, and merging `resizable.toml`. Stock
//! defaults are overridden by the user's file; only the keys that differ
//! need to be written down.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! base_dir = "uploads"               # Root of all stored files
//! dir = "files"                      # Folder under base_dir for this attachment
//! sub_dir = "original"               # Where the untouched upload is kept
//! types = "*"                        # "*" or a list of MIME types
//! extensions = "*"                   # "*" or a list of extensions (no dot)
//! max_size = 5242880                 # Bytes; 0 disables the check
//! physical_name = "{ID}-{FILENAME}"  # Stored file name template
//! create_dir = false                 # Create missing directories
//! quality = 100                      # Default derivative quality (0-100)
//!
//! [derivatives.thumbnail]
//! dimension = "200x160"
//! dimension_type = "exact"           # exact | portrait | landscape | auto | crop
//! sub_dir = "thumbnails"
//!
//! [derivatives.gallery]
//! dimension = "400x320"
//! dimension_type = "exact"
//! sub_dir = "gallery"
//!
//! [error_messages]
//! INVALID_FILE_SIZE = "The file is too large to upload."
//!
//! [processing]
//! max_processes = 4                  # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! ## Derivatives Replace, Everything Else Merges
//!
//! Tables merge key by key, except `[derivatives]`: a user file that
//! declares any derivative replaces the stock pair entirely, so dropping
//! the gallery size does not require a way to "delete" it.
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{DerivativeConfig, Dimensions, FitMode, FitSpec, Quality};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Name of the config file looked up by default.
pub const CONFIG_FILENAME: &str = "resizable.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Either `"*"` (anything goes) or an explicit list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AllowlistRepr", into = "AllowlistRepr")]
pub enum Allowlist {
    Any,
    Only(Vec<String>),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum AllowlistRepr {
    Wildcard(String),
    List(Vec<String>),
}

impl TryFrom<AllowlistRepr> for Allowlist {
    type Error = String;

    fn try_from(repr: AllowlistRepr) -> Result<Self, Self::Error> {
        match repr {
            AllowlistRepr::Wildcard(s) if s == "*" => Ok(Allowlist::Any),
            AllowlistRepr::Wildcard(s) => Err(format!(
                "expected \"*\" or a list of values, got \"{s}\""
            )),
            AllowlistRepr::List(items) => Ok(Allowlist::Only(items)),
        }
    }
}

impl From<Allowlist> for AllowlistRepr {
    fn from(list: Allowlist) -> Self {
        match list {
            Allowlist::Any => AllowlistRepr::Wildcard("*".to_string()),
            Allowlist::Only(items) => AllowlistRepr::List(items),
        }
    }
}

impl Allowlist {
    /// Case-insensitive membership; `Any` allows everything.
    pub fn allows(&self, value: &str) -> bool {
        match self {
            Allowlist::Any => true,
            Allowlist::Only(items) => items.iter().any(|i| i.eq_ignore_ascii_case(value)),
        }
    }
}

/// Upload configuration loaded from `resizable.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadConfig {
    /// Root directory for everything this attachment stores.
    pub base_dir: PathBuf,
    /// Attachment folder under `base_dir`.
    pub dir: String,
    /// Folder (under `dir`) for the stored original.
    pub sub_dir: String,
    /// Accepted MIME types.
    pub types: Allowlist,
    /// Accepted file extensions, without the dot.
    pub extensions: Allowlist,
    /// Maximum upload size in bytes. Zero disables the check.
    pub max_size: u64,
    /// Stored file name template, see [`crate::naming`].
    pub physical_name: String,
    /// Create missing target directories instead of failing.
    pub create_dir: bool,
    /// Default encoding quality for derivatives (0-100).
    pub quality: u32,
    /// Resized variants, keyed by name.
    pub derivatives: BTreeMap<String, DerivativeSpec>,
    /// Per-code overrides for user-facing error messages.
    pub error_messages: BTreeMap<String, String>,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Default for UploadConfig {
    fn default() -> Self {
        let mut derivatives = BTreeMap::new();
        derivatives.insert(
            "thumbnail".to_string(),
            DerivativeSpec {
                dimension: "200x160".to_string(),
                dimension_type: FitMode::Exact,
                sub_dir: "thumbnails".to_string(),
                quality: None,
            },
        );
        derivatives.insert(
            "gallery".to_string(),
            DerivativeSpec {
                dimension: "400x320".to_string(),
                dimension_type: FitMode::Exact,
                sub_dir: "gallery".to_string(),
                quality: None,
            },
        );
        Self {
            base_dir: PathBuf::from("uploads"),
            dir: "files".to_string(),
            sub_dir: "original".to_string(),
            types: Allowlist::Any,
            extensions: Allowlist::Any,
            max_size: 5_242_880,
            physical_name: "{ID}-{FILENAME}".to_string(),
            create_dir: false,
            quality: 100,
            derivatives,
            error_messages: BTreeMap::new(),
            processing: ProcessingConfig::default(),
        }
    }
}

/// One resized variant as written in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DerivativeSpec {
    /// Target box as `"WIDTHxHEIGHT"`.
    pub dimension: String,
    /// How the source is fitted into the box.
    #[serde(default = "default_dimension_type")]
    pub dimension_type: FitMode,
    /// Folder (under `dir`) this variant is written to.
    pub sub_dir: String,
    /// Overrides the top-level `quality` for this variant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<u32>,
}

fn default_dimension_type() -> FitMode {
    FitMode::Exact
}

impl UploadConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quality > 100 {
            return Err(ConfigError::Validation("quality must be 0-100".into()));
        }
        if self.dir.trim().is_empty() {
            return Err(ConfigError::Validation("dir must not be empty".into()));
        }
        if self.sub_dir.trim().is_empty() {
            return Err(ConfigError::Validation("sub_dir must not be empty".into()));
        }
        if !self.physical_name.ends_with("{FILENAME}") && !self.physical_name.ends_with(".{EXT}")
        {
            return Err(ConfigError::Validation(format!(
                "physical_name \"{}\" must end with {{FILENAME}} or .{{EXT}} to keep the source extension",
                self.physical_name
            )));
        }
        let original_dir = normalize_sub_dir(&self.sub_dir).ok_or_else(|| {
            ConfigError::Validation(format!(
                "sub_dir \"{}\" must be a relative directory below dir",
                self.sub_dir
            ))
        })?;
        let mut seen: BTreeMap<PathBuf, &str> = BTreeMap::new();
        for (name, spec) in &self.derivatives {
            let dims = parse_dimension(name, &spec.dimension)?;
            if dims.width == 0 || dims.height == 0 {
                return Err(ConfigError::Validation(format!(
                    "derivatives.{name}.dimension must be non-zero, got {}",
                    spec.dimension
                )));
            }
            if spec.quality.is_some_and(|q| q > 100) {
                return Err(ConfigError::Validation(format!(
                    "derivatives.{name}.quality must be 0-100"
                )));
            }
            if spec.sub_dir.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "derivatives.{name}.sub_dir must not be empty"
                )));
            }
            let dir = normalize_sub_dir(&spec.sub_dir).ok_or_else(|| {
                ConfigError::Validation(format!(
                    "derivatives.{name}.sub_dir \"{}\" must be a relative directory below dir",
                    spec.sub_dir
                ))
            })?;
            if dir == original_dir {
                return Err(ConfigError::Validation(format!(
                    "derivatives.{name}.sub_dir would overwrite the originals in \"{}\"",
                    self.sub_dir
                )));
            }
            if let Some(other) = seen.insert(dir, name) {
                return Err(ConfigError::Validation(format!(
                    "derivatives.{other} and derivatives.{name} write to the same sub_dir \"{}\"",
                    spec.sub_dir
                )));
            }
        }
        Ok(())
    }

    /// Directory holding everything for this attachment: `<base_dir>/<dir>`.
    pub fn upload_root(&self) -> PathBuf {
        self.base_dir.join(&self.dir)
    }

    /// Directory for stored originals.
    pub fn original_dir(&self) -> PathBuf {
        self.upload_root().join(&self.sub_dir)
    }

    /// Derivatives ready for the imaging layer.
    pub fn derivative_configs(&self) -> Result<Vec<DerivativeConfig>, ConfigError> {
        self.derivatives
            .iter()
            .map(|(name, spec)| {
                let dims = parse_dimension(name, &spec.dimension)?;
                Ok(DerivativeConfig {
                    name: name.clone(),
                    fit: FitSpec::new(dims, spec.dimension_type),
                    sub_dir: spec.sub_dir.clone(),
                    quality: Quality::new(spec.quality.unwrap_or(self.quality)),
                })
            })
            .collect()
    }
}

/// Lexically normalise a directory given relative to the upload root.
///
/// `.` segments and trailing slashes disappear and `..` pops a segment, so
/// `"./original"`, `"original/"` and `"x/../original"` all become `original`.
/// Returns `None` for absolute paths and for anything resolving to the root
/// itself or above it.
pub fn normalize_sub_dir(sub_dir: &str) -> Option<PathBuf> {
    let mut parts: Vec<&OsStr> = Vec::new();
    for component in Path::new(sub_dir).components() {
        match component {
            Component::CurDir => {}
            Component::Normal(part) => parts.push(part),
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.into_iter().collect())
}

fn parse_dimension(name: &str, raw: &str) -> Result<Dimensions, ConfigError> {
    raw.parse::<Dimensions>()
        .map_err(|e| ConfigError::Validation(format!("derivatives.{name}.dimension: {e}")))
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel derivative workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(UploadConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
///
/// A `derivatives` table in the overlay replaces the base one wholesale.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<UploadConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => {
            let mut base = base;
            if let (Some(base_table), Some(ov_table)) = (base.as_table_mut(), ov.as_table())
                && ov_table.contains_key("derivatives")
            {
                base_table.remove("derivatives");
            }
            merge_toml(base, ov)
        }
        None => base,
    };
    let config: UploadConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the given file.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result. A missing file yields the stock defaults.
pub fn load_config(path: &Path) -> Result<UploadConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Default user-facing message for an upload error code.
pub fn default_error_message(code: &str) -> &'static str {
    match code {
        "DIRECTORY_NOT_WRITABLE" => "Directory not writable.",
        "DIRECTORY_DOES_NOT_EXIST" => "The target directory doesn't exist.",
        "INVALID_FILE_TYPE" => "This file type is not supported.",
        "INVALID_FILE_EXTENSION" => "This file type is not supported.",
        "INVALID_FILE_SIZE" => "The file is too large to upload.",
        "INVALID_FILE" => "The file is not a supported image.",
        "ERROR_UPLOADING_FILE" => "There was an error uploading the file.",
        "FILE_NOT_UPLOADED" => "The file was not properly uploaded.",
        "PARENT_DIRECTORY_NOT_WRITABLE" => "The parent directory is not writable.",
        _ => "The upload failed.",
    }
}

impl UploadConfig {
    /// User-facing message for an error code, honouring `[error_messages]`.
    pub fn message_for(&self, code: &str) -> String {
        self.error_messages
            .get(code)
            .cloned()
            .unwrap_or_else(|| default_error_message(code).to_string())
    }
}

/// Returns a fully-commented stock `resizable.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Resizable Configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Unknown keys will cause an error.

# Root of all stored files.
base_dir = "uploads"

# Folder under base_dir for this attachment.
dir = "files"

# Folder under dir where the untouched upload is kept.
sub_dir = "original"

# Accepted MIME types: "*" or a list, e.g. ["image/jpeg", "image/png"].
types = "*"

# Accepted extensions: "*" or a list without dots, e.g. ["jpg", "png"].
extensions = "*"

# Maximum upload size in bytes (0 disables the check).
max_size = 5242880

# Stored file name. Tokens: {ID}, {FILENAME}, {BASENAME}, {EXT}.
# Must end with {FILENAME} or .{EXT} so every copy keeps the source extension.
physical_name = "{ID}-{FILENAME}"

# Create missing directories instead of rejecting the upload.
create_dir = false

# Default encoding quality for derivatives (0 = smallest, 100 = best).
# JPEG uses it as-is, PNG maps it to a 0-9 compression level, GIF ignores it.
quality = 100

# ---------------------------------------------------------------------------
# Derivatives
# ---------------------------------------------------------------------------
# Each [derivatives.NAME] table produces one resized copy per upload, written
# to dir/SUB_DIR with the same file name and format as the original.
# Declaring any derivative replaces this default pair.
#
# dimension_type:
#   exact     - exactly WxH, aspect ignored
#   portrait  - height H, width follows the aspect ratio
#   landscape - width W, height follows the aspect ratio
#   auto      - fit by the source orientation
#   crop      - cover WxH, then crop the centre to exactly WxH
[derivatives.thumbnail]
dimension = "200x160"
dimension_type = "exact"
sub_dir = "thumbnails"

[derivatives.gallery]
dimension = "400x320"
dimension_type = "exact"
sub_dir = "gallery"

# ---------------------------------------------------------------------------
# Error messages
# ---------------------------------------------------------------------------
# Override the text shown for any error code, e.g.
# INVALID_FILE_SIZE = "Please keep uploads under 5 MB."
[error_messages]

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel derivative workers. Omit for auto (= number of CPU cores).
# Values above the core count are clamped down.
# max_processes = 4
"##
}
