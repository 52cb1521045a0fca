//! Inspect module - the extraction-and-scan pipeline.
//!
//! This module provides the core abstractions of the APK harvester:
//! - **Traits**: [`Extractor`], [`Collector`], [`Scanner`],
//!   [`MetadataInspector`] for building the staged pipeline
//! - **Stages**: ZIP extraction, payload staging, link scanning, badging
//! - **Errors**: Standardized error types for each pipeline stage
//! - **Pipeline**: Async coordinator via [`pipeline::InspectPipeline`]

pub mod archive;
pub mod badging;
pub mod collect;
pub mod pipeline;
pub mod progress;
pub mod scan;
pub mod traits;

// Re-export commonly used types
pub use traits::{
    BadgingError, CollectError, Collector, ExtractionError, Extractor, MetadataInspector,
    ScanError, Scanner,
};

pub use pipeline::{InspectPipeline, InspectStats, InspectionResult, PipelineError, TempExtraction};
