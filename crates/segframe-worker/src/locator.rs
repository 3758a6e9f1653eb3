//! Source lookup and window validation.

use tracing::debug;

use segframe_media::{MediaError, MediaToolkit};
use segframe_models::{watch_url, SegmentDescriptor, SourceInfo};

use crate::error::AcquisitionError;

/// Resolves source metadata without downloading any media.
pub struct SegmentLocator<'a, T: MediaToolkit + ?Sized> {
    toolkit: &'a T,
}

impl<'a, T: MediaToolkit + ?Sized> SegmentLocator<'a, T> {
    pub fn new(toolkit: &'a T) -> Self {
        Self { toolkit }
    }

    /// Look up the source and its total duration.
    pub async fn locate(&self, source_id: &str) -> Result<SourceInfo, AcquisitionError> {
        let url = watch_url(source_id);
        let metadata = self
            .toolkit
            .source_metadata(&url)
            .await
            .map_err(|e| match e {
                MediaError::Cancelled => AcquisitionError::Cancelled,
                other => AcquisitionError::not_found(other.to_string()),
            })?;

        let total_duration = match metadata.duration {
            Some(d) if d.is_finite() && d > 0.0 => d,
            other => {
                return Err(AcquisitionError::metadata_unavailable(format!(
                    "no usable duration for {} (got {:?})",
                    source_id, other
                )))
            }
        };

        debug!(source_id = source_id, total_duration, "Located source");
        Ok(SourceInfo {
            total_duration,
            title: metadata.title,
        })
    }
}

/// Compute where the clip starts, rejecting windows past the end of the source.
pub fn validate_window(
    descriptor: &SegmentDescriptor,
    info: &SourceInfo,
    span_secs: f64,
) -> Result<f64, AcquisitionError> {
    let download_start = descriptor.download_start(span_secs);
    if download_start >= info.total_duration {
        return Err(AcquisitionError::OutOfRange {
            download_start,
            total_duration: info.total_duration,
        });
    }
    Ok(download_start)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(total: f64) -> SourceInfo {
        SourceInfo {
            total_duration: total,
            title: None,
        }
    }

    #[test]
    fn test_validate_window_inside_source() {
        let d = SegmentDescriptor::new("abc123", 30.0, 10.0, 0).unwrap();
        assert_eq!(validate_window(&d, &info(120.0), 10.0).unwrap(), 30.0);
    }

    #[test]
    fn test_validate_window_clamps_at_zero() {
        let d = SegmentDescriptor::new("abc123", 0.0, 4.0, 0).unwrap();
        assert_eq!(validate_window(&d, &info(120.0), 10.0).unwrap(), 0.0);
    }

    #[test]
    fn test_validate_window_out_of_range() {
        let d = SegmentDescriptor::new("abc123", 200.0, 10.0, 0).unwrap();
        let err = validate_window(&d, &info(120.0), 10.0).unwrap_err();
        assert_eq!(
            err,
            AcquisitionError::OutOfRange {
                download_start: 200.0,
                total_duration: 120.0
            }
        );
    }

    #[test]
    fn test_validate_window_start_equal_to_duration_is_rejected() {
        // midpoint 125, start 120 on a 120 s source
        let d = SegmentDescriptor::new("abc123", 120.0, 10.0, 0).unwrap();
        assert!(validate_window(&d, &info(120.0), 10.0).is_err());
    }
}
