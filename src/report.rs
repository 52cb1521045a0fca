//! Report assembly.
//!
//! Writes the two plain-text artifacts next to the inspected APK, keeping the
//! decorative banner format of the original reports, plus an optional
//! machine-readable JSON export.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::json;
use tracing::info;

use crate::model::{ApkMetadata, ScanOutcome, ScanReport};

/// Filename of the metadata report.
pub const METADATA_REPORT: &str = "apk_info.txt";

/// Filename of the link report.
pub const LINK_REPORT: &str = "links_info.txt";

/// Filename of the optional JSON export.
pub const JSON_REPORT: &str = "inspection.json";

const RULE: &str = "░▒▓█►───────────────────────────◄█▓▒░";

fn banner(text: &str) -> String {
    format!("░▒▓█►─╡ {text} ╞─◄█▓▒░")
}

/// Writes report artifacts into a fixed output directory.
#[derive(Debug)]
pub struct ReportAssembler {
    out_dir: PathBuf,
}

impl ReportAssembler {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    /// Writes the banner-wrapped metadata report and returns its path.
    pub fn write_metadata_report(&self, metadata: &ApkMetadata) -> io::Result<PathBuf> {
        let mut contents = String::new();
        contents.push_str(&banner("APK information"));
        contents.push('\n');
        contents.push_str(&format!("APK size: {} bytes\n", metadata.apk_size));
        contents.push_str(&format!("versionCode: {}\n", metadata.version_code));
        contents.push_str(&format!("versionName: {}\n", metadata.version_name));
        contents.push_str(RULE);
        contents.push_str("\n\nBadging output:\n");
        contents.push_str(&metadata.badging_output);
        if !metadata.badging_output.ends_with('\n') {
            contents.push('\n');
        }
        contents.push_str(RULE);
        contents.push('\n');

        let path = self.out_dir.join(METADATA_REPORT);
        fs::write(&path, contents)?;
        info!(path = %path.display(), "metadata report written");
        Ok(path)
    }

    /// Writes the per-payload link report and returns its path.
    pub fn write_link_report(&self, report: &ScanReport) -> io::Result<PathBuf> {
        let mut contents = String::new();
        contents.push_str(&banner("Links found in .dex payloads"));
        contents.push('\n');

        for record in &report.records {
            match &record.outcome {
                ScanOutcome::Links { urls } if urls.is_empty() => {
                    contents.push_str(&banner(&format!("No links found in {}", record.payload)));
                    contents.push('\n');
                }
                ScanOutcome::Links { urls } => {
                    contents.push_str(&banner(&format!("Links found in {}", record.payload)));
                    contents.push('\n');
                    for url in urls {
                        contents.push_str(url);
                        contents.push('\n');
                    }
                    contents.push_str(RULE);
                    contents.push('\n');
                }
                ScanOutcome::Failed { reason } => {
                    contents.push_str(&banner(&format!(
                        "Error scanning {}: {}",
                        record.payload, reason
                    )));
                    contents.push('\n');
                }
            }
        }

        contents.push_str(RULE);
        contents.push('\n');

        let path = self.out_dir.join(LINK_REPORT);
        fs::write(&path, contents)?;
        info!(path = %path.display(), "link report written");
        Ok(path)
    }

    /// Writes the combined JSON export and returns its path.
    pub fn write_json_report(
        &self,
        metadata: &ApkMetadata,
        report: &ScanReport,
    ) -> io::Result<PathBuf> {
        let value = json!({
            "metadata": metadata,
            "scan": report,
        });
        let path = self.out_dir.join(JSON_REPORT);
        fs::write(&path, serde_json::to_string_pretty(&value)?)?;
        info!(path = %path.display(), "JSON report written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LinkRecord, UNKNOWN_VERSION};
    use tempfile::tempdir;

    fn sample_metadata() -> ApkMetadata {
        ApkMetadata {
            apk_size: 10240,
            version_code: UNKNOWN_VERSION.to_string(),
            version_name: UNKNOWN_VERSION.to_string(),
            badging_output: "package: name='com.example.sample'\n".to_string(),
        }
    }

    fn sample_report() -> ScanReport {
        ScanReport {
            records: vec![
                LinkRecord {
                    payload: "classes.dex".to_string(),
                    outcome: ScanOutcome::Links {
                        urls: vec![
                            "http://example.com/a".to_string(),
                            "https://example.org/b?x=1".to_string(),
                        ],
                    },
                },
                LinkRecord {
                    payload: "classes2.dex".to_string(),
                    outcome: ScanOutcome::Links { urls: vec![] },
                },
                LinkRecord {
                    payload: "classes3.dex".to_string(),
                    outcome: ScanOutcome::Failed {
                        reason: "strings exited with exit status: 1".to_string(),
                    },
                },
            ],
        }
    }

    #[test]
    fn test_metadata_report_contents() {
        let dir = tempdir().unwrap();
        let assembler = ReportAssembler::new(dir.path());

        let path = assembler.write_metadata_report(&sample_metadata()).unwrap();

        let contents = fs::read_to_string(path).unwrap();
        assert!(contents.contains("APK size: 10240 bytes"));
        assert!(contents.contains("versionCode: unknown"));
        assert!(contents.contains("versionName: unknown"));
        assert!(contents.contains("package: name='com.example.sample'"));
    }

    #[test]
    fn test_link_report_lists_urls_in_order() {
        let dir = tempdir().unwrap();
        let assembler = ReportAssembler::new(dir.path());

        let path = assembler.write_link_report(&sample_report()).unwrap();

        let contents = fs::read_to_string(path).unwrap();
        let first = contents.find("http://example.com/a").unwrap();
        let second = contents.find("https://example.org/b?x=1").unwrap();
        assert!(first < second);
        assert!(contents.contains("Links found in classes.dex"));
        assert!(contents.contains("No links found in classes2.dex"));
        assert!(contents.contains("Error scanning classes3.dex"));
    }

    #[test]
    fn test_json_report_round_trips() {
        let dir = tempdir().unwrap();
        let assembler = ReportAssembler::new(dir.path());

        let path = assembler
            .write_json_report(&sample_metadata(), &sample_report())
            .unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(value["metadata"]["apk_size"], 10240);
        assert_eq!(value["scan"]["records"][0]["payload"], "classes.dex");
        assert_eq!(value["scan"]["records"][2]["outcome"]["status"], "failed");
    }
}
