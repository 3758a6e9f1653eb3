//! Representative frame extraction from a downloaded clip.

use std::path::PathBuf;

use tracing::{debug, warn};

use segframe_media::{file_size, remove_file_if_exists, MediaToolkit};

use crate::artifact::TempArtifact;
use crate::error::AcquisitionError;

/// Seek offset into a default ten second clip, which is centred on the window
/// midpoint.
pub const FRAME_OFFSET_SECS: f64 = 5.0;

/// Timestamp to decode inside a clip of `clip_secs`, preferring `offset_secs`
/// (the distance from the clip start to the midpoint) and never seeking past
/// the clip's own middle.
pub fn frame_timestamp(offset_secs: f64, clip_secs: f64) -> f64 {
    offset_secs.min(clip_secs / 2.0)
}

/// Writes one frame per descriptor into the permanent frame directory.
pub struct FrameExtractor<'a, T: MediaToolkit + ?Sized> {
    toolkit: &'a T,
    offset_secs: f64,
}

impl<'a, T: MediaToolkit + ?Sized> FrameExtractor<'a, T> {
    pub fn new(toolkit: &'a T) -> Self {
        Self {
            toolkit,
            offset_secs: FRAME_OFFSET_SECS,
        }
    }

    /// Seek offset for clips that start `span_secs / 2` before the midpoint.
    pub fn for_span(mut self, span_secs: f64) -> Self {
        self.offset_secs = span_secs / 2.0;
        self
    }

    /// Decode a frame from `artifact` into `frame_path`, overwriting any
    /// existing file. The artifact is removed once the frame is on disk.
    pub async fn extract(
        &self,
        artifact: &mut TempArtifact,
        frame_path: PathBuf,
    ) -> Result<PathBuf, AcquisitionError> {
        let clip_secs = self
            .toolkit
            .probe_duration(artifact.path())
            .await
            .map_err(|e| AcquisitionError::from_media(e, AcquisitionError::ProbeFailed))?;
        if !clip_secs.is_finite() || clip_secs <= 0.0 {
            return Err(AcquisitionError::probe_failed(format!(
                "clip reports duration {}",
                clip_secs
            )));
        }

        let at = frame_timestamp(self.offset_secs, clip_secs);
        debug!(clip_secs, at, frame = %frame_path.display(), "Extracting frame");

        let extracted = self
            .toolkit
            .extract_frame(artifact.path(), at, &frame_path)
            .await
            .map_err(|e| AcquisitionError::from_media(e, AcquisitionError::ExtractFailed));

        let failure = match extracted {
            Err(e) => Some(e),
            Ok(()) => match file_size(&frame_path).await {
                Some(size) if size > 0 => None,
                _ => Some(AcquisitionError::extract_failed(format!(
                    "no image written to {}",
                    frame_path.display()
                ))),
            },
        };
        if let Some(e) = failure {
            // A failed descriptor leaves no frame behind, not even an empty one.
            if let Err(rm) = remove_file_if_exists(&frame_path).await {
                warn!("Failed to remove partial frame {}: {}", frame_path.display(), rm);
            }
            return Err(e);
        }

        artifact.cleanup().await;
        Ok(frame_path)
    }
}
