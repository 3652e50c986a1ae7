//! Shared types returned by the upload pipeline.
//!
//! These are what callers (and `--json` output) see after an upload; they
//! serialize to JSON as-is.

use crate::imaging::{Dimensions, FitMode, SourceFormat};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything stored for one upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadReport {
    pub record_id: String,
    /// Path of the stored original.
    pub original: PathBuf,
    /// File name shared by the original and all derivatives.
    pub physical_name: String,
    pub format: SourceFormat,
    pub dimensions: Dimensions,
    /// One entry per configured derivative, in config order.
    pub derivatives: Vec<DerivativeReport>,
}

impl UploadReport {
    /// Paths of every file this upload wrote, original first.
    pub fn stored_files(&self) -> Vec<PathBuf> {
        let mut files = vec![self.original.clone()];
        files.extend(self.derivatives.iter().filter_map(|d| match &d.outcome {
            DerivativeOutcome::Generated { path, .. } => Some(path.clone()),
            DerivativeOutcome::Failed { .. } => None,
        }));
        files
    }

    pub fn failed_count(&self) -> usize {
        self.derivatives
            .iter()
            .filter(|d| matches!(d.outcome, DerivativeOutcome::Failed { .. }))
            .count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivativeReport {
    pub name: String,
    pub sub_dir: String,
    pub mode: FitMode,
    /// Requested box.
    pub target: Dimensions,
    pub outcome: DerivativeOutcome,
}

/// Result of one derivative. Failures are reported, never propagated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DerivativeOutcome {
    Generated {
        path: PathBuf,
        width: u32,
        height: u32,
    },
    Failed {
        error: String,
    },
}
