//! Core traits and error types for the inspection stages.
//!
//! This module defines the seams of the extraction-and-scan pipeline:
//! - Stage abstractions ([`Extractor`], [`Collector`], [`Scanner`],
//!   [`MetadataInspector`])
//! - Standardized per-stage error handling
//!
//! Concrete implementations live in the sibling modules; the coordinator in
//! [`pipeline`](crate::inspect::pipeline) is generic over these traits so
//! stages can be swapped out in tests.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::model::{ApkMetadata, ScanReport};

// ============================================================================
// Stage Traits
// ============================================================================

/// Unpacks an archive to a destination directory.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the pipeline runs them on blocking
/// worker threads.
pub trait Extractor: Send + Sync {
    /// Extracts the full entry tree of `source` under `dest`, creating
    /// intermediate directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError`] if:
    /// - `source` is not an existing regular file
    /// - the archive cannot be parsed as a ZIP container
    /// - an entry name would escape `dest` (path traversal)
    fn extract(&self, source: &Path, dest: &Path) -> Result<(), ExtractionError>;

    /// Returns a human-readable name for this stage.
    fn stage_name(&self) -> &'static str;
}

/// Isolates payload files from an extracted tree into a flat staging
/// directory.
pub trait Collector: Send + Sync {
    /// Moves every payload file found under `extracted_root` into the staging
    /// directory and returns its path.
    ///
    /// The staging directory is valid (and returned) even when zero payloads
    /// were found.
    fn collect(&self, extracted_root: &Path) -> Result<PathBuf, CollectError>;

    /// Returns a human-readable name for this stage.
    fn stage_name(&self) -> &'static str;
}

/// Scans staged payloads for embedded link literals.
///
/// # Failure model
///
/// Per-payload tool failures are recorded inside the returned [`ScanReport`]
/// and never abort the batch. The only hard failure is an unreadable staging
/// directory listing.
pub trait Scanner: Send + Sync {
    /// Scans every payload in `staging_dir`, in sorted filename order.
    fn scan_all(&self, staging_dir: &Path) -> std::io::Result<ScanReport>;

    /// Returns a human-readable name for this stage.
    fn stage_name(&self) -> &'static str;
}

/// Probes an APK for structural metadata via an external inspection tool.
pub trait MetadataInspector: Send + Sync {
    /// Reads the file size and runs the badging tool over `apk_path`.
    ///
    /// # Errors
    ///
    /// Returns [`BadgingError`] if the path does not reference an existing
    /// regular file or the tool cannot be run. Absent version patterns in the
    /// tool output are not errors; they yield the "unknown" sentinel.
    fn inspect(&self, apk_path: &Path) -> Result<ApkMetadata, BadgingError>;

    /// Returns a human-readable name for this stage.
    fn stage_name(&self) -> &'static str;
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during archive extraction.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// Archive path does not reference an existing regular file
    #[error("archive not found: '{0}'")]
    NotFound(PathBuf),

    /// File cannot be parsed as a ZIP container
    #[error("corrupt archive: {0}")]
    CorruptArchive(String),

    /// An entry name would escape the destination directory
    #[error("path traversal attempt rejected: '{entry}'")]
    PathTraversal { entry: String },

    /// Generic I/O error while writing extracted entries
    #[error("I/O error during extraction: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur during payload collection.
#[derive(Error, Debug)]
pub enum CollectError {
    /// The extracted root has no parent to host the staging directory
    #[error("extracted root '{0}' has no parent directory")]
    NoParent(PathBuf),

    /// Generic I/O error while walking or moving files
    #[error("I/O error during collection: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while scanning a single payload.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The strings tool is not installed / not on PATH
    #[error("strings tool '{0}' not found on PATH")]
    ToolMissing(String),

    /// The strings tool ran but exited with a nonzero status
    #[error("strings tool exited with {status} for '{payload}'")]
    ToolFailed { payload: String, status: String },

    /// Failed to spawn or read the tool process
    #[error("I/O error invoking strings tool: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur during metadata inspection.
#[derive(Error, Debug)]
pub enum BadgingError {
    /// APK path does not reference an existing regular file
    #[error("APK file '{0}' not found")]
    InputNotFound(PathBuf),

    /// The badging tool is not installed / not on PATH
    #[error("badging tool '{0}' not found on PATH")]
    ToolMissing(String),

    /// The badging tool ran but exited with a nonzero status
    #[error("badging tool failed ({status}): {stderr}")]
    ToolFailed { status: String, stderr: String },

    /// Failed to stat the APK or spawn the tool
    #[error("I/O error during badging inspection: {0}")]
    Io(#[from] std::io::Error),
}
