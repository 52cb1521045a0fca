//! Payload collection and staging.
//!
//! Walks an extracted tree and relocates every bytecode container (`.dex`)
//! into a flat staging directory next to the extracted root. Files are moved,
//! not copied; staged filename collisions are resolved last-write-wins, which
//! is deterministic because the walk order is sorted.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::inspect::traits::{CollectError, Collector};

/// Conventional extension of bytecode containers inside an APK.
pub const PAYLOAD_EXTENSION: &str = ".dex";

/// Name of the flat staging directory, created next to the extracted root.
pub const STAGING_DIR_NAME: &str = "dex";

/// Collector that stages payload files by extension match.
#[derive(Debug)]
pub struct PayloadCollector {
    extension: String,
}

impl Default for PayloadCollector {
    fn default() -> Self {
        Self::new(PAYLOAD_EXTENSION)
    }
}

impl PayloadCollector {
    /// Creates a collector matching files whose name ends with `extension`
    /// (case-sensitive).
    pub fn new(extension: &str) -> Self {
        Self {
            extension: extension.to_string(),
        }
    }
}

impl Collector for PayloadCollector {
    fn collect(&self, extracted_root: &Path) -> Result<PathBuf, CollectError> {
        let parent = extracted_root
            .parent()
            .ok_or_else(|| CollectError::NoParent(extracted_root.to_path_buf()))?;
        let staging_dir = parent.join(STAGING_DIR_NAME);

        // Idempotent: an existing staging directory is reused as-is.
        fs::create_dir_all(&staging_dir)?;

        let walker = WalkDir::new(extracted_root).sort_by_file_name();
        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!(error = %e, "cannot access path during collection");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let file_name = entry.file_name().to_string_lossy();
            if !file_name.ends_with(&self.extension) {
                continue;
            }

            let staged = staging_dir.join(file_name.as_ref());
            if staged.exists() {
                warn!(
                    payload = %file_name,
                    "staged filename collision, keeping the later payload"
                );
            }
            fs::rename(entry.path(), &staged)?;
            debug!(payload = %file_name, "staged payload");
        }

        Ok(staging_dir)
    }

    fn stage_name(&self) -> &'static str {
        "collection"
    }
}
