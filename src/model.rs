use serde::{Deserialize, Serialize};

/// Sentinel used when a version field cannot be parsed from badging output.
pub const UNKNOWN_VERSION: &str = "unknown";

/// Structural metadata of an inspected APK.
///
/// Immutable once constructed. `version_code` and `version_name` fall back to
/// [`UNKNOWN_VERSION`] when `aapt` output lacks the matching patterns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApkMetadata {
    /// Size of the APK file in bytes
    pub apk_size: u64,

    /// Declared versionCode, or [`UNKNOWN_VERSION`]
    pub version_code: String,

    /// Declared versionName, or [`UNKNOWN_VERSION`]
    pub version_name: String,

    /// Full raw output of `aapt dump badging`
    pub badging_output: String,
}

/// Result of scanning one staged payload for embedded links.
///
/// Produced once per payload by the scanner, never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkRecord {
    /// Staged filename of the payload (e.g., "classes.dex")
    pub payload: String,

    /// Links found, or the failure that prevented scanning
    pub outcome: ScanOutcome,
}

/// Per-payload scan outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScanOutcome {
    /// URL-bearing lines in extraction-output order (possibly empty)
    Links { urls: Vec<String> },

    /// The external strings tool failed for this payload
    Failed { reason: String },
}

/// Ordered scan results for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanReport {
    pub records: Vec<LinkRecord>,
}

impl ScanReport {
    /// Number of payloads that produced at least one link.
    pub fn payloads_with_links(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(&r.outcome, ScanOutcome::Links { urls } if !urls.is_empty()))
            .count()
    }
}
