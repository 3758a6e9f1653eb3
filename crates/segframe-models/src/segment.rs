//! Segment descriptors and acquisition results.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::timestamp::format_clock;
use crate::utils::watch_url;

/// Length of the clip downloaded around a segment midpoint.
pub const DEFAULT_CLIP_SPAN_SECS: f64 = 10.0;

/// Rejected descriptor fields.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DescriptorError {
    #[error("source id cannot be empty")]
    EmptySourceId,

    #[error("window start must be a finite value >= 0, got {0}")]
    InvalidStart(f64),

    #[error("window duration must be a finite value > 0, got {0}")]
    InvalidDuration(f64),
}

/// A time window within a source video, plus the index used to name its frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentDescriptor {
    source_id: String,
    window_start: f64,
    window_duration: f64,
    sequence_index: u64,
}

impl SegmentDescriptor {
    /// Create a validated descriptor.
    pub fn new(
        source_id: impl Into<String>,
        window_start: f64,
        window_duration: f64,
        sequence_index: u64,
    ) -> Result<Self, DescriptorError> {
        let source_id = source_id.into().trim().to_string();
        if source_id.is_empty() {
            return Err(DescriptorError::EmptySourceId);
        }
        if !window_start.is_finite() || window_start < 0.0 {
            return Err(DescriptorError::InvalidStart(window_start));
        }
        if !window_duration.is_finite() || window_duration <= 0.0 {
            return Err(DescriptorError::InvalidDuration(window_duration));
        }

        Ok(Self {
            source_id,
            window_start,
            window_duration,
            sequence_index,
        })
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn window_start(&self) -> f64 {
        self.window_start
    }

    pub fn window_duration(&self) -> f64 {
        self.window_duration
    }

    pub fn sequence_index(&self) -> u64 {
        self.sequence_index
    }

    /// Temporal centre of the window in source seconds.
    pub fn midpoint(&self) -> f64 {
        self.window_start + self.window_duration / 2.0
    }

    /// Where a clip of `span` seconds centred on the midpoint begins, clamped at 0.
    pub fn download_start(&self, span: f64) -> f64 {
        (self.midpoint() - span / 2.0).max(0.0)
    }

    /// Canonical watch URL for the source.
    pub fn source_url(&self) -> String {
        watch_url(&self.source_id)
    }

    /// Midpoint rendered as a clock string, e.g. `0:00:35`.
    pub fn midpoint_clock(&self) -> String {
        format_clock(self.midpoint())
    }
}

/// Facts about a source resolved without downloading payload bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Total duration in seconds
    pub total_duration: f64,
    /// Title reported upstream, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// One row of the dataset table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionResult {
    pub source_url: String,
    pub timestamp: String,
    pub frame_path: PathBuf,
}

impl AcquisitionResult {
    /// Build the result for a descriptor whose frame landed at `frame_path`.
    pub fn for_descriptor(descriptor: &SegmentDescriptor, frame_path: PathBuf) -> Self {
        Self {
            source_url: descriptor.source_url(),
            timestamp: descriptor.midpoint_clock(),
            frame_path,
        }
    }
}
