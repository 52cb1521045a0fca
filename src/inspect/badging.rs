//! APK metadata inspection via `aapt dump badging`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::inspect::traits::{BadgingError, MetadataInspector};
use crate::model::{ApkMetadata, UNKNOWN_VERSION};

/// Default Android package inspection tool, resolved on PATH.
pub const BADGING_TOOL: &str = "aapt";

static VERSION_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"versionCode='(\d+)'").expect("valid versionCode pattern"));
static VERSION_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"versionName='([\w.]+)'").expect("valid versionName pattern"));

/// Pulls versionCode / versionName out of raw badging output, falling back to
/// the "unknown" sentinel when a pattern is absent.
fn parse_versions(badging_output: &str) -> (String, String) {
    let version_code = VERSION_CODE_RE
        .captures(badging_output)
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| UNKNOWN_VERSION.to_string());
    let version_name = VERSION_NAME_RE
        .captures(badging_output)
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| UNKNOWN_VERSION.to_string());
    (version_code, version_name)
}

/// Metadata probe backed by the external `aapt` binary.
#[derive(Debug)]
pub struct BadgingInspector {
    program: PathBuf,
}

impl BadgingInspector {
    /// Resolves `aapt` on PATH.
    ///
    /// # Errors
    ///
    /// Returns [`BadgingError::ToolMissing`] when the tool is not installed.
    pub fn new() -> Result<Self, BadgingError> {
        let program = which::which(BADGING_TOOL)
            .map_err(|_| BadgingError::ToolMissing(BADGING_TOOL.to_string()))?;
        Ok(Self::with_program(program))
    }

    /// Uses an explicit badging binary instead of resolving PATH.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl MetadataInspector for BadgingInspector {
    fn inspect(&self, apk_path: &Path) -> Result<ApkMetadata, BadgingError> {
        if !apk_path.is_file() {
            return Err(BadgingError::InputNotFound(apk_path.to_path_buf()));
        }

        let apk_size = fs::metadata(apk_path)?.len();

        let output = Command::new(&self.program)
            .args(["dump", "badging"])
            .arg(apk_path)
            .output()
            .map_err(|e| {
                if e.kind() == io::ErrorKind::NotFound {
                    BadgingError::ToolMissing(self.program.display().to_string())
                } else {
                    BadgingError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(BadgingError::ToolFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let badging_output = String::from_utf8_lossy(&output.stdout).into_owned();
        let (version_code, version_name) = parse_versions(&badging_output);
        debug!(%version_code, %version_name, apk_size, "badging inspection done");

        Ok(ApkMetadata {
            apk_size,
            version_code,
            version_name,
            badging_output,
        })
    }

    fn stage_name(&self) -> &'static str {
        "badging"
    }
}
