//! Clip download with ordered fallback strategies.

use std::fmt;
use std::path::Path;

use tracing::{info, warn};

use segframe_media::{exceeds_size, MediaToolkit};

use crate::error::AcquisitionError;

/// Ways of getting a short clip onto local disk, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStrategy {
    /// Resolve a direct media URL and let FFmpeg seek and stream-copy the range.
    StreamCopy,
    /// Let yt-dlp download and trim through its FFmpeg post-processor.
    TrimmedDownload,
}

impl FetchStrategy {
    pub const ORDER: [FetchStrategy; 2] = [FetchStrategy::StreamCopy, FetchStrategy::TrimmedDownload];

    pub fn as_str(&self) -> &'static str {
        match self {
            FetchStrategy::StreamCopy => "stream_copy",
            FetchStrategy::TrimmedDownload => "trimmed_download",
        }
    }
}

impl fmt::Display for FetchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Downloads a clip into a path owned by the caller.
///
/// The fetcher never deletes what it writes; the caller's temp guard does.
pub struct SegmentFetcher<'a, T: MediaToolkit + ?Sized> {
    toolkit: &'a T,
    min_artifact_bytes: u64,
}

impl<'a, T: MediaToolkit + ?Sized> SegmentFetcher<'a, T> {
    pub fn new(toolkit: &'a T, min_artifact_bytes: u64) -> Self {
        Self {
            toolkit,
            min_artifact_bytes,
        }
    }

    /// Fetch `span_secs` starting at `start_secs` of `source_url` into `output`.
    ///
    /// Returns the strategy whose output passed the size gate.
    pub async fn fetch(
        &self,
        source_url: &str,
        start_secs: f64,
        span_secs: f64,
        output: &Path,
    ) -> Result<FetchStrategy, AcquisitionError> {
        let mut last_reason = String::new();

        for strategy in &FetchStrategy::ORDER {
            let attempt = match strategy {
                FetchStrategy::StreamCopy => {
                    match self.toolkit.resolve_media_url(source_url).await {
                        Ok(media_url) => {
                            self.toolkit
                                .copy_range(&media_url, start_secs, span_secs, output)
                                .await
                        }
                        Err(e) => Err(e),
                    }
                }
                FetchStrategy::TrimmedDownload => {
                    self.toolkit
                        .download_trimmed(source_url, start_secs, span_secs, output)
                        .await
                }
            };

            if let Err(e) = attempt {
                if e.is_cancelled() {
                    return Err(AcquisitionError::Cancelled);
                }
                warn!(strategy = %strategy, "Fetch strategy failed: {}", e);
                last_reason = format!("{}: {}", strategy, e);
                continue;
            }

            if exceeds_size(output, self.min_artifact_bytes).await {
                info!(strategy = %strategy, output = %output.display(), "Fetched clip");
                return Ok(*strategy);
            }

            warn!(
                strategy = %strategy,
                min_bytes = self.min_artifact_bytes,
                "Fetched clip missing or too small"
            );
            last_reason = format!(
                "{}: output missing or not larger than {} bytes",
                strategy, self.min_artifact_bytes
            );
        }

        Err(AcquisitionError::download_failed(last_reason))
    }
}
