//! Link scanning over staged payloads.
//!
//! Each payload is fed to an external printable-strings tool (`strings`,
//! minimum run length 4) and its output lines are filtered by a coarse
//! substring match on `http://` / `https://`. The match is intentionally
//! imprecise: a retained line may carry leading/trailing bytes around the
//! URL, and no trimming, deduplication, or sorting is applied.
//!
//! A failing tool invocation marks that payload as errored in the report and
//! the batch continues; a single bad payload never aborts the run.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, warn};

use crate::inspect::traits::{ScanError, Scanner};
use crate::model::{LinkRecord, ScanOutcome, ScanReport};

/// Default printable-strings extraction tool, resolved on PATH.
pub const STRINGS_TOOL: &str = "strings";

/// Retains the lines of `output` that contain an HTTP or HTTPS URL literal
/// anywhere in them, preserving output order.
pub fn filter_link_lines(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| line.contains("http://") || line.contains("https://"))
        .map(str::to_string)
        .collect()
}

/// Scanner backed by an external strings binary.
#[derive(Debug)]
pub struct StringScanner {
    program: PathBuf,
    extension: String,
}

impl StringScanner {
    /// Resolves the conventional `strings` tool on PATH.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::ToolMissing`] when the tool is not installed —
    /// reported distinctly from a tool that ran and failed.
    pub fn new() -> Result<Self, ScanError> {
        let program = which::which(STRINGS_TOOL)
            .map_err(|_| ScanError::ToolMissing(STRINGS_TOOL.to_string()))?;
        Ok(Self::with_program(program))
    }

    /// Uses an explicit extraction binary instead of resolving PATH.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            extension: crate::inspect::collect::PAYLOAD_EXTENSION.to_string(),
        }
    }

    /// Scans a single payload, returning URL-bearing lines in output order.
    pub fn scan_one(&self, payload: &Path) -> Result<Vec<String>, ScanError> {
        let output = Command::new(&self.program)
            .arg(payload)
            .output()
            .map_err(|e| {
                if e.kind() == io::ErrorKind::NotFound {
                    ScanError::ToolMissing(self.program.display().to_string())
                } else {
                    ScanError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(ScanError::ToolFailed {
                payload: payload.display().to_string(),
                status: output.status.to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(filter_link_lines(&stdout))
    }
}

impl Scanner for StringScanner {
    fn scan_all(&self, staging_dir: &Path) -> io::Result<ScanReport> {
        let mut payloads: Vec<PathBuf> = std::fs::read_dir(staging_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .file_name()
                        .map(|n| n.to_string_lossy().ends_with(&self.extension))
                        .unwrap_or(false)
            })
            .collect();
        // Directory listing order is filesystem-dependent; sort for
        // reproducible reports.
        payloads.sort();

        let mut records = Vec::with_capacity(payloads.len());
        for payload in payloads {
            let name = payload
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| payload.display().to_string());

            let outcome = match self.scan_one(&payload) {
                Ok(urls) => {
                    debug!(payload = %name, links = urls.len(), "scanned payload");
                    ScanOutcome::Links { urls }
                }
                Err(e) => {
                    warn!(payload = %name, error = %e, "payload scan failed");
                    ScanOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            };

            records.push(LinkRecord {
                payload: name,
                outcome,
            });
        }

        Ok(ScanReport { records })
    }

    fn stage_name(&self) -> &'static str {
        "scan"
    }
}
