//! ZIP archive extraction.
//!
//! APK packages are ordinary ZIP containers. Entry names are untrusted input:
//! any name that would resolve outside the destination directory (parent-dir
//! components, absolute paths) rejects the whole extraction rather than being
//! silently rewritten.

use std::fs::{self, File};
use std::io;
use std::path::Path;

use tracing::debug;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::inspect::traits::{ExtractionError, Extractor};

/// Extractor for ZIP-format packages.
#[derive(Debug, Default)]
pub struct ZipExtractor;

impl ZipExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Extractor for ZipExtractor {
    fn extract(&self, source: &Path, dest: &Path) -> Result<(), ExtractionError> {
        if !source.is_file() {
            return Err(ExtractionError::NotFound(source.to_path_buf()));
        }

        let file = File::open(source)?;
        let mut archive = ZipArchive::new(file).map_err(zip_to_extraction)?;

        fs::create_dir_all(dest)?;

        for index in 0..archive.len() {
            let mut entry = archive.by_index(index).map_err(zip_to_extraction)?;

            // enclosed_name resolves the raw entry name and refuses anything
            // that would escape the extraction root.
            let relative = entry.enclosed_name().ok_or_else(|| {
                ExtractionError::PathTraversal {
                    entry: entry.name().to_string(),
                }
            })?;
            let out_path = dest.join(relative);

            if entry.is_dir() {
                fs::create_dir_all(&out_path)?;
                continue;
            }

            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)?;
            }

            let mut out_file = File::create(&out_path)?;
            io::copy(&mut entry, &mut out_file)?;
            debug!(entry = entry.name(), "extracted archive entry");
        }

        Ok(())
    }

    fn stage_name(&self) -> &'static str {
        "extraction"
    }
}

fn zip_to_extraction(err: ZipError) -> ExtractionError {
    match err {
        ZipError::Io(io_err) => ExtractionError::Io(io_err),
        other => ExtractionError::CorruptArchive(other.to_string()),
    }
}
