//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Upload
//!
//! ```text
//! 7-cat.jpg (JPEG 800x600)
//!     Original: uploads/files/original/7-cat.jpg
//!     gallery 400x320 crop: 400x320 → uploads/files/gallery/7-cat.jpg
//!     thumbnail 200x160 exact: failed (cannot write ...)
//! Stored 1 of 2 derivatives
//! ```
//!
//! ## Resize / Identify
//!
//! ```text
//! in.png → out.png (400x300)
//! in.png: PNG 800x600
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::imaging::{Dimensions, ImageInfo};
use crate::types::{DerivativeOutcome, DerivativeReport, UploadReport};
use std::path::Path;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// One derivative line: requested box and mode, then what happened.
///
/// ```text
/// gallery 400x320 crop: 400x320 → uploads/files/gallery/7-cat.jpg
/// thumbnail 200x160 exact: failed (disk full)
/// ```
fn derivative_line(report: &DerivativeReport) -> String {
    let head = format!("{} {} {}", report.name, report.target, report.mode);
    match &report.outcome {
        DerivativeOutcome::Generated {
            path,
            width,
            height,
        } => format!("{head}: {width}x{height} → {}", path.display()),
        DerivativeOutcome::Failed { error } => format!("{head}: failed ({error})"),
    }
}

// ============================================================================
// Upload
// ============================================================================

pub fn format_upload_report(report: &UploadReport) -> Vec<String> {
    let mut lines = vec![format!(
        "{} ({} {})",
        report.physical_name, report.format, report.dimensions
    )];
    lines.push(format!(
        "{}Original: {}",
        indent(1),
        report.original.display()
    ));
    for derivative in &report.derivatives {
        lines.push(format!("{}{}", indent(1), derivative_line(derivative)));
    }

    let total = report.derivatives.len();
    lines.push(format!(
        "Stored {} of {} derivatives",
        total - report.failed_count(),
        total
    ));
    lines
}

pub fn print_upload_report(report: &UploadReport) {
    for line in format_upload_report(report) {
        println!("{}", line);
    }
}

/// Rejected upload: user-facing message plus the code and technical detail.
pub fn format_upload_error(code: &str, message: &str, detail: &str) -> Vec<String> {
    vec![
        format!("{message} [{code}]"),
        format!("{}{detail}", indent(1)),
    ]
}

// ============================================================================
// Resize / Identify
// ============================================================================

pub fn format_resize(source: &Path, output: &Path, dimensions: Dimensions) -> Vec<String> {
    vec![format!(
        "{} → {} ({})",
        source.display(),
        output.display(),
        dimensions
    )]
}

pub fn print_resize(source: &Path, output: &Path, dimensions: Dimensions) {
    for line in format_resize(source, output, dimensions) {
        println!("{}", line);
    }
}

pub fn format_identify(path: &Path, info: &ImageInfo) -> Vec<String> {
    vec![format!(
        "{}: {} {}",
        path.display(),
        info.format,
        info.dimensions()
    )]
}

pub fn print_identify(path: &Path, info: &ImageInfo) {
    for line in format_identify(path, info) {
        println!("{}", line);
    }
}
