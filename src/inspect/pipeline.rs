//! Inspection pipeline coordinator.
//!
//! This module provides the [`InspectPipeline`] coordinator that executes the
//! sequential inspection stages (Badging → Extraction → Collection → Scan)
//! with:
//! - Async execution via `tokio` (blocking stages on worker threads)
//! - Configurable timeouts per stage
//! - Structured logging via `tracing`
//! - Automatic cleanup of temporary directories via RAII (`Drop` on
//!   [`TempExtraction`])
//!
//! The progress indicator brackets the scan stage: it starts strictly before
//! the scan and is stopped (and joined) strictly after it, on success and
//! error paths alike, before any further terminal output.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{info, warn};

use crate::inspect::progress::ProgressIndicator;
use crate::inspect::traits::{Collector, Extractor, MetadataInspector, Scanner};
use crate::model::{ApkMetadata, ScanReport};

/// Name of the extraction directory, created next to the inspected APK.
pub const EXTRACTED_DIR_NAME: &str = "extracted";

const SCAN_WAIT_MESSAGE: &str = "Waiting for the link scan to finish...";

// ============================================================================
// Pipeline Types
// ============================================================================

/// Temporary working directories of one inspection run.
///
/// # RAII Cleanup
///
/// `TempExtraction` implements [`Drop`] to ensure the extracted tree and the
/// staging directory are removed — even on early return from an error path.
/// Because of this, it intentionally does **not** implement `Clone`.
#[derive(Debug)]
pub struct TempExtraction {
    /// Root of the unpacked archive tree
    pub extracted_path: PathBuf,

    /// Flat staging directory, set once collection has run
    pub staging_path: Option<PathBuf>,

    /// Whether to delete the directories on drop (mirrors pipeline
    /// `auto_cleanup`).
    pub(crate) cleanup_on_drop: bool,
}

impl Drop for TempExtraction {
    fn drop(&mut self) {
        if !self.cleanup_on_drop {
            return;
        }
        if let Some(staging) = &self.staging_path {
            if staging.exists() {
                if let Err(e) = std::fs::remove_dir_all(staging) {
                    warn!(path = %staging.display(), error = %e, "failed to remove staging dir");
                }
            }
        }
        if self.extracted_path.exists() {
            if let Err(e) = std::fs::remove_dir_all(&self.extracted_path) {
                warn!(path = %self.extracted_path.display(), error = %e, "failed to remove extracted dir");
            }
        }
    }
}

/// Complete inspection result with metadata, scan report and statistics.
#[derive(Debug)]
pub struct InspectionResult {
    /// Structural metadata from the badging stage
    pub metadata: ApkMetadata,

    /// Ordered per-payload link records from the scan stage
    pub report: ScanReport,

    /// Performance and processing statistics
    pub stats: InspectStats,
}

/// Statistics about the inspection run.
#[derive(Debug, Default, Clone)]
pub struct InspectStats {
    /// Total time spent on the entire run (milliseconds)
    pub total_duration_ms: u64,

    /// Time spent on the badging stage (milliseconds)
    pub badging_duration_ms: u64,

    /// Time spent on the extraction stage (milliseconds)
    pub extraction_duration_ms: u64,

    /// Time spent on the collection stage (milliseconds)
    pub collection_duration_ms: u64,

    /// Time spent on the scan stage (milliseconds)
    pub scan_duration_ms: u64,

    /// Number of payloads scanned
    pub payloads_scanned: usize,
}

// ============================================================================
// Pipeline Errors
// ============================================================================

/// Errors that can occur during pipeline execution.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// Stage execution exceeded timeout
    #[error("stage '{stage}' timed out after {timeout_secs}s")]
    StageTimeout { stage: String, timeout_secs: u64 },

    /// Stage task could not be joined
    #[error("stage '{stage}' failed: {message}")]
    StageFailed { stage: String, message: String },

    /// Badging stage failed (aborts the run)
    #[error(transparent)]
    Badging(#[from] crate::inspect::traits::BadgingError),

    /// Extraction stage failed (aborts the run)
    #[error(transparent)]
    Extraction(#[from] crate::inspect::traits::ExtractionError),

    /// Collection stage failed (aborts the run)
    #[error(transparent)]
    Collection(#[from] crate::inspect::traits::CollectError),

    /// Generic I/O error (e.g., unreadable staging directory listing)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Pipeline Coordinator
// ============================================================================

/// Inspection pipeline with async execution and timeout support.
///
/// The pipeline coordinates sequential execution of the inspection stages:
/// 1. **Badging**: Probe APK size and version metadata
/// 2. **Extraction**: Unpack the APK next to its source file
/// 3. **Collection**: Stage bytecode payloads into a flat directory
/// 4. **Scan**: Extract URL literals from each payload (with the progress
///    indicator racing alongside)
///
/// Per-payload scan failures surface inside the [`ScanReport`]; the errors
/// carried by [`PipelineError`] all abort the run.
///
/// # Example
///
/// ```ignore
/// let pipeline = InspectPipeline::new(
///     ZipExtractor::new(),
///     PayloadCollector::default(),
///     StringScanner::new()?,
///     BadgingInspector::new()?,
/// )
/// .with_timeout(Duration::from_secs(300));
///
/// let result = pipeline.execute(PathBuf::from("sample.apk")).await?;
/// println!("{} payloads scanned", result.stats.payloads_scanned);
/// ```
pub struct InspectPipeline<E, C, S, M>
where
    E: Extractor + 'static,
    C: Collector + 'static,
    S: Scanner + 'static,
    M: MetadataInspector + 'static,
{
    extractor: Arc<E>,
    collector: Arc<C>,
    scanner: Arc<S>,
    inspector: Arc<M>,

    /// Timeout for each stage (default: 5 minutes)
    stage_timeout: Duration,

    /// Whether to remove the extracted tree and staging directory afterwards
    auto_cleanup: bool,

    /// Whether to render the spinner during the scan stage
    show_progress: bool,
}

impl<E, C, S, M> InspectPipeline<E, C, S, M>
where
    E: Extractor + 'static,
    C: Collector + 'static,
    S: Scanner + 'static,
    M: MetadataInspector + 'static,
{
    /// Creates a new pipeline from the four stage implementations.
    ///
    /// Default configuration:
    /// - Timeout: 5 minutes per stage
    /// - Auto-cleanup: enabled
    /// - Progress indicator: enabled
    pub fn new(extractor: E, collector: C, scanner: S, inspector: M) -> Self {
        Self {
            extractor: Arc::new(extractor),
            collector: Arc::new(collector),
            scanner: Arc::new(scanner),
            inspector: Arc::new(inspector),
            stage_timeout: Duration::from_secs(300),
            auto_cleanup: true,
            show_progress: true,
        }
    }

    /// Sets the timeout for each pipeline stage.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self
    }

    /// Configures automatic cleanup of temporary directories.
    pub fn with_cleanup(mut self, cleanup: bool) -> Self {
        self.auto_cleanup = cleanup;
        self
    }

    /// Enables or disables the scan-phase progress indicator.
    ///
    /// The indicator is purely cosmetic; disabling it never changes computed
    /// results.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.show_progress = progress;
        self
    }

    /// Runs one blocking stage on a worker thread under the stage timeout.
    async fn run_stage<T, F>(&self, stage: &'static str, work: F) -> Result<T, PipelineError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, PipelineError> + Send + 'static,
    {
        timeout(self.stage_timeout, tokio::task::spawn_blocking(work))
            .await
            .map_err(|_| PipelineError::StageTimeout {
                stage: stage.to_string(),
                timeout_secs: self.stage_timeout.as_secs(),
            })?
            .map_err(|e| PipelineError::StageFailed {
                stage: stage.to_string(),
                message: e.to_string(),
            })?
    }

    /// Executes the complete inspection pipeline for one APK.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if:
    /// - Any stage times out
    /// - Badging fails (missing input file, missing/failing tool)
    /// - Extraction fails (corrupt archive, path traversal, I/O error)
    /// - Collection fails or the staging directory cannot be listed
    pub async fn execute(&self, apk_path: PathBuf) -> Result<InspectionResult, PipelineError> {
        let start = Instant::now();
        let mut stats = InspectStats::default();

        // ====================================================================
        // Stage 1: Badging
        // ====================================================================

        info!("starting badging stage");
        let stage_start = Instant::now();

        let inspector = Arc::clone(&self.inspector);
        let apk = apk_path.clone();
        let metadata = self
            .run_stage("badging", move || Ok(inspector.inspect(&apk)?))
            .await?;

        stats.badging_duration_ms = stage_start.elapsed().as_millis() as u64;
        info!(
            duration_ms = stats.badging_duration_ms,
            version_code = %metadata.version_code,
            version_name = %metadata.version_name,
            apk_size = metadata.apk_size,
            "badging completed"
        );

        // ====================================================================
        // Stage 2: Extraction
        // ====================================================================
        //
        // The extracted tree lands next to the APK, like the reports. The
        // TempExtraction guard below cleans it (and later the staging dir) on
        // every exit path once auto_cleanup is on.

        let work_root = apk_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let extracted_dir = work_root.join(EXTRACTED_DIR_NAME);
        let mut workspace = TempExtraction {
            extracted_path: extracted_dir.clone(),
            staging_path: None,
            cleanup_on_drop: self.auto_cleanup,
        };

        info!("starting extraction stage");
        let stage_start = Instant::now();

        let extractor = Arc::clone(&self.extractor);
        let apk = apk_path.clone();
        let dest = extracted_dir.clone();
        self.run_stage("extraction", move || Ok(extractor.extract(&apk, &dest)?))
            .await?;

        stats.extraction_duration_ms = stage_start.elapsed().as_millis() as u64;
        info!(
            duration_ms = stats.extraction_duration_ms,
            path = %extracted_dir.display(),
            "extraction completed"
        );

        // ====================================================================
        // Stage 3: Collection
        // ====================================================================

        info!("starting collection stage");
        let stage_start = Instant::now();

        let collector = Arc::clone(&self.collector);
        let root = extracted_dir.clone();
        let staging_dir = self
            .run_stage("collection", move || Ok(collector.collect(&root)?))
            .await?;
        workspace.staging_path = Some(staging_dir.clone());

        stats.collection_duration_ms = stage_start.elapsed().as_millis() as u64;
        info!(
            duration_ms = stats.collection_duration_ms,
            staging = %staging_dir.display(),
            "collection completed"
        );

        // ====================================================================
        // Stage 4: Scan (with progress indicator)
        // ====================================================================
        //
        // The indicator owns the terminal until stop() returns, so it is
        // stopped before the scan result — error or not — propagates further.

        info!("starting scan stage");
        let stage_start = Instant::now();

        let indicator = self
            .show_progress
            .then(|| ProgressIndicator::start(SCAN_WAIT_MESSAGE));

        let scanner = Arc::clone(&self.scanner);
        let staging = staging_dir.clone();
        let scan_result = self
            .run_stage("scan", move || Ok(scanner.scan_all(&staging)?))
            .await;

        if let Some(handle) = indicator {
            handle.stop().await;
        }
        let report = scan_result?;

        stats.scan_duration_ms = stage_start.elapsed().as_millis() as u64;
        stats.payloads_scanned = report.records.len();
        info!(
            duration_ms = stats.scan_duration_ms,
            payloads = stats.payloads_scanned,
            with_links = report.payloads_with_links(),
            "scan completed"
        );

        stats.total_duration_ms = start.elapsed().as_millis() as u64;

        // Workspace guard dropped here — Drop handles directory cleanup.
        drop(workspace);

        Ok(InspectionResult {
            metadata,
            report,
            stats,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect::archive::ZipExtractor;
    use crate::inspect::badging::BadgingInspector;
    use crate::inspect::collect::{PayloadCollector, STAGING_DIR_NAME};
    use crate::inspect::scan::StringScanner;
    use crate::inspect::traits::{
        BadgingError, CollectError, ExtractionError, MetadataInspector,
    };
    use crate::model::{LinkRecord, ScanOutcome, UNKNOWN_VERSION};
    use std::fs;
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    // ------------------------------------------------------------------
    // Mock stages for coordinator behavior
    // ------------------------------------------------------------------

    struct MockInspector;

    impl MetadataInspector for MockInspector {
        fn inspect(&self, apk_path: &Path) -> Result<ApkMetadata, BadgingError> {
            if !apk_path.is_file() {
                return Err(BadgingError::InputNotFound(apk_path.to_path_buf()));
            }
            Ok(ApkMetadata {
                apk_size: fs::metadata(apk_path).map_err(BadgingError::Io)?.len(),
                version_code: "1".to_string(),
                version_name: "1.0".to_string(),
                badging_output: "package: versionCode='1' versionName='1.0'".to_string(),
            })
        }

        fn stage_name(&self) -> &'static str {
            "mock_inspector"
        }
    }

    struct FailingInspector;

    impl MetadataInspector for FailingInspector {
        fn inspect(&self, _apk_path: &Path) -> Result<ApkMetadata, BadgingError> {
            Err(BadgingError::ToolMissing("aapt".to_string()))
        }

        fn stage_name(&self) -> &'static str {
            "failing_inspector"
        }
    }

    struct MockExtractor;

    impl Extractor for MockExtractor {
        fn extract(&self, _source: &Path, dest: &Path) -> Result<(), ExtractionError> {
            fs::create_dir_all(dest)?;
            fs::write(dest.join("classes.dex"), b"dex")?;
            Ok(())
        }

        fn stage_name(&self) -> &'static str {
            "mock_extractor"
        }
    }

    struct MockCollector;

    impl Collector for MockCollector {
        fn collect(&self, extracted_root: &Path) -> Result<PathBuf, CollectError> {
            let staging = extracted_root
                .parent()
                .ok_or_else(|| CollectError::NoParent(extracted_root.to_path_buf()))?
                .join(STAGING_DIR_NAME);
            fs::create_dir_all(&staging)?;
            fs::rename(extracted_root.join("classes.dex"), staging.join("classes.dex"))?;
            Ok(staging)
        }

        fn stage_name(&self) -> &'static str {
            "mock_collector"
        }
    }

    struct MockScanner;

    impl Scanner for MockScanner {
        fn scan_all(&self, _staging_dir: &Path) -> std::io::Result<ScanReport> {
            Ok(ScanReport {
                records: vec![LinkRecord {
                    payload: "classes.dex".to_string(),
                    outcome: ScanOutcome::Links {
                        urls: vec!["https://example.org".to_string()],
                    },
                }],
            })
        }

        fn stage_name(&self) -> &'static str {
            "mock_scanner"
        }
    }

    fn mock_pipeline() -> InspectPipeline<MockExtractor, MockCollector, MockScanner, MockInspector>
    {
        InspectPipeline::new(MockExtractor, MockCollector, MockScanner, MockInspector)
            .with_progress(false)
    }

    #[tokio::test]
    async fn test_pipeline_execution() {
        let dir = tempdir().unwrap();
        let apk = dir.path().join("sample.apk");
        fs::write(&apk, vec![0u8; 64]).unwrap();

        let result = mock_pipeline().execute(apk).await.unwrap();

        assert_eq!(result.metadata.apk_size, 64);
        assert_eq!(result.stats.payloads_scanned, 1);
        assert_eq!(result.report.payloads_with_links(), 1);
        // auto_cleanup=true → working directories are gone
        assert!(!dir.path().join(EXTRACTED_DIR_NAME).exists());
        assert!(!dir.path().join(STAGING_DIR_NAME).exists());
    }

    #[tokio::test]
    async fn test_pipeline_without_cleanup() {
        let dir = tempdir().unwrap();
        let apk = dir.path().join("sample.apk");
        fs::write(&apk, b"bytes").unwrap();

        let result = mock_pipeline().with_cleanup(false).execute(apk).await.unwrap();

        assert_eq!(result.stats.payloads_scanned, 1);
        assert!(dir.path().join(EXTRACTED_DIR_NAME).exists());
        assert!(dir.path().join(STAGING_DIR_NAME).join("classes.dex").exists());
    }

    #[tokio::test]
    async fn test_badging_failure_aborts_before_extraction() {
        let dir = tempdir().unwrap();
        let apk = dir.path().join("sample.apk");
        fs::write(&apk, b"bytes").unwrap();

        let pipeline =
            InspectPipeline::new(MockExtractor, MockCollector, MockScanner, FailingInspector)
                .with_progress(false);
        let result = pipeline.execute(apk).await;

        assert!(matches!(result, Err(PipelineError::Badging(_))));
        assert!(!dir.path().join(EXTRACTED_DIR_NAME).exists());
    }

    #[tokio::test]
    async fn test_missing_input_produces_no_artifacts() {
        let dir = tempdir().unwrap();
        let apk = dir.path().join("missing.apk");

        let result = mock_pipeline().execute(apk).await;

        assert!(matches!(
            result,
            Err(PipelineError::Badging(BadgingError::InputNotFound(_)))
        ));
        assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    // ------------------------------------------------------------------
    // End-to-end with real stages and fake external tools
    // ------------------------------------------------------------------

    fn fake_tool(dir: &Path, name: &str, script: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn test_end_to_end_sample_apk() {
        let dir = tempdir().unwrap();
        let tools = tempdir().unwrap();

        // sample.apk containing one payload plus unrelated entries
        let apk = dir.path().join("sample.apk");
        {
            let file = fs::File::create(&apk).unwrap();
            let mut writer = ZipWriter::new(file);
            let options = SimpleFileOptions::default();
            writer.start_file("classes.dex", options).unwrap();
            writer.write_all(b"opaque dex bytes").unwrap();
            writer.start_file("AndroidManifest.xml", options).unwrap();
            writer.write_all(b"<manifest/>").unwrap();
            writer.finish().unwrap();
        }
        let apk_size = fs::metadata(&apk).unwrap().len();

        // Badging output without version patterns → "unknown" sentinels
        let aapt = fake_tool(
            tools.path(),
            "fake-aapt",
            "#!/bin/sh\nprintf \"package: name='com.example.sample'\\n\"\n",
        );
        let strings = fake_tool(
            tools.path(),
            "fake-strings",
            "#!/bin/sh\nprintf 'foo\\nhttp://example.com/a\\nnoise\\nhttps://example.org/b?x=1\\n'\n",
        );

        let pipeline = InspectPipeline::new(
            ZipExtractor::new(),
            PayloadCollector::default(),
            StringScanner::with_program(strings),
            BadgingInspector::with_program(aapt),
        )
        .with_progress(false);

        let result = pipeline.execute(apk).await.unwrap();

        assert_eq!(result.metadata.apk_size, apk_size);
        assert_eq!(result.metadata.version_code, UNKNOWN_VERSION);
        assert_eq!(result.metadata.version_name, UNKNOWN_VERSION);

        assert_eq!(result.report.records.len(), 1);
        let record = &result.report.records[0];
        assert_eq!(record.payload, "classes.dex");
        match &record.outcome {
            ScanOutcome::Links { urls } => assert_eq!(
                urls,
                &["http://example.com/a", "https://example.org/b?x=1"]
            ),
            other => panic!("unexpected outcome: {other:?}"),
        }

        // Working directories cleaned, only the APK remains
        assert!(!dir.path().join(EXTRACTED_DIR_NAME).exists());
        assert!(!dir.path().join(STAGING_DIR_NAME).exists());
    }
}
