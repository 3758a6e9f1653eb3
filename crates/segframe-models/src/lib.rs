//! Shared data models for the segframe pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Segment descriptors and the values derived from them
//! - Source information resolved from upstream metadata
//! - Acquisition results written to the dataset table
//! - Catalog entries loaded by the sampler
//! - Clock formatting and source identifier parsing

pub mod catalog;
pub mod segment;
pub mod timestamp;
pub mod utils;

// Re-export common types
pub use catalog::CatalogEntry;
pub use segment::{
    AcquisitionResult, DescriptorError, SegmentDescriptor, SourceInfo, DEFAULT_CLIP_SPAN_SECS,
};
pub use timestamp::format_clock;
pub use utils::{extract_youtube_id, normalize_source, watch_url, SourceIdError, SourceIdResult};
