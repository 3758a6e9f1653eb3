//! Segment acquisition pipeline.
//!
//! This crate provides:
//! - Source lookup and window validation
//! - Clip download with ordered fallback strategies
//! - Frame extraction into the permanent frame directory
//! - An orchestrator with whole-pipeline retries, cleanup and cancellation
//! - Catalog sampling, the append-only dataset table and a batch runner

pub mod artifact;
pub mod batch;
pub mod config;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod locator;
pub mod logging;
pub mod orchestrator;
pub mod retry;
pub mod sampler;
pub mod writer;

pub use artifact::TempArtifact;
pub use batch::{BatchRunner, BatchSummary};
pub use config::PipelineConfig;
pub use error::{AcquisitionError, WorkerError, WorkerResult};
pub use extractor::{frame_timestamp, FrameExtractor, FRAME_OFFSET_SECS};
pub use fetcher::{FetchStrategy, SegmentFetcher};
pub use locator::{validate_window, SegmentLocator};
pub use logging::{init_tracing, SegmentLogger};
pub use orchestrator::{AcquisitionOrchestrator, AcquisitionOutcome, AcquisitionState};
pub use retry::{retry_async, RetryConfig, RetryResult};
pub use sampler::{MetadataSampler, DEFAULT_LABEL};
pub use writer::DatasetWriter;
