//! Worker error types.

use thiserror::Error;

use segframe_media::MediaError;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Why a single acquisition attempt failed.
///
/// Every variant consumes one attempt of the retry budget. `is_permanent`
/// marks the ones a retry cannot fix; they are only cut short when the
/// pipeline is configured not to retry permanent failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AcquisitionError {
    #[error("source not found: {0}")]
    NotFound(String),

    #[error("source metadata unavailable: {0}")]
    MetadataUnavailable(String),

    #[error("download start {download_start:.1}s is beyond source duration {total_duration:.1}s")]
    OutOfRange {
        download_start: f64,
        total_duration: f64,
    },

    #[error("download failed: {0}")]
    DownloadFailed(String),

    #[error("probe failed: {0}")]
    ProbeFailed(String),

    #[error("frame extraction failed: {0}")]
    ExtractFailed(String),

    #[error("acquisition cancelled")]
    Cancelled,
}

impl AcquisitionError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn metadata_unavailable(msg: impl Into<String>) -> Self {
        Self::MetadataUnavailable(msg.into())
    }

    pub fn download_failed(msg: impl Into<String>) -> Self {
        Self::DownloadFailed(msg.into())
    }

    pub fn probe_failed(msg: impl Into<String>) -> Self {
        Self::ProbeFailed(msg.into())
    }

    pub fn extract_failed(msg: impl Into<String>) -> Self {
        Self::ExtractFailed(msg.into())
    }

    /// Failures that no amount of retrying will fix for this descriptor.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            AcquisitionError::NotFound(_)
                | AcquisitionError::MetadataUnavailable(_)
                | AcquisitionError::OutOfRange { .. }
        )
    }

    /// Classify a media failure: cancellation stays `Cancelled`, anything
    /// else is wrapped by `stage`.
    pub fn from_media(err: MediaError, stage: fn(String) -> Self) -> Self {
        if err.is_cancelled() {
            Self::Cancelled
        } else {
            stage(err.to_string())
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, AcquisitionError::Cancelled)
    }

    /// Short stable name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AcquisitionError::NotFound(_) => "not_found",
            AcquisitionError::MetadataUnavailable(_) => "metadata_unavailable",
            AcquisitionError::OutOfRange { .. } => "out_of_range",
            AcquisitionError::DownloadFailed(_) => "download_failed",
            AcquisitionError::ProbeFailed(_) => "probe_failed",
            AcquisitionError::ExtractFailed(_) => "extract_failed",
            AcquisitionError::Cancelled => "cancelled",
        }
    }
}

/// Batch-level failures (catalog, table, configuration).
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn catalog(msg: impl Into<String>) -> Self {
        Self::Catalog(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
