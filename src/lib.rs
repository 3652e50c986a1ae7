//! # Resizable
//!
//! Image upload handling with automatic resized derivatives. An upload is
//! validated, stored under a templated name, and then rendered into any
//! number of configured sizes (thumbnails, gallery images, ...) in the same
//! format as the original.
//!
//! # Architecture: Two-Phase Upload
//!
//! ```text
//! 1. Accept   file  →  <base_dir>/<dir>/<sub_dir>/<name>       (all-or-nothing)
//! 2. Derive   original  →  <base_dir>/<dir>/<derivative>/<name> (best effort)
//! ```
//!
//! Phase 1 either stores the original or rejects the upload with a coded
//! error. Phase 2 decodes the stored original once and renders every
//! derivative in parallel; a failed derivative is recorded in the
//! [`types::UploadReport`] and never takes the others down with it.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`upload`] | The two-phase pipeline, directory policy, and rollback |
//! | [`imaging`] | Decode, geometry, resample, and encode: the resize engine |
//! | [`config`] | `resizable.toml` loading, validation, and merging |
//! | [`naming`] | Physical file name templating and sanitizing |
//! | [`types`] | Upload reports returned to callers |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Same Format In, Same Format Out
//!
//! A derivative is always written in the format of its source, under the
//! same file name. JPEG, PNG, and GIF are supported; anything else is
//! rejected at upload time so phase 2 never meets a file it cannot decode.
//!
//! ## One Quality Knob
//!
//! `quality` (0-100) means "bigger but better" for every codec: JPEG takes
//! it directly, PNG maps it onto a zlib compression level (PNG stays
//! lossless), and GIF ignores it.
//!
//! ## Atomic Writes
//!
//! Originals and derivatives are written to a temp file in the target
//! directory and renamed into place. A reader either sees the previous file
//! or the complete new one, never a partial write.
//!
//! ## Pure-Rust Imaging
//!
//! The [`imaging`] module uses the `image` crate (Lanczos3 resampling) for
//! every codec. No system libraries, no ImageMagick.

pub mod config;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod types;
pub mod upload;

#[cfg(test)]
pub(crate) mod test_helpers;
