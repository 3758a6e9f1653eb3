//! Single-frame extraction and stream-copy range download.

use std::path::Path;

use tracing::info;

use crate::command::{FfmpegCommand, ToolRunner};
use crate::error::MediaResult;

/// JPEG quality scale passed to FFmpeg (`-q:v`).
pub const FRAME_JPEG_QUALITY: u8 = 2;

/// Decode one frame at `at_secs` and write it as an image, overwriting `output_path`.
pub async fn extract_frame(
    runner: &ToolRunner,
    video_path: impl AsRef<Path>,
    at_secs: f64,
    output_path: impl AsRef<Path>,
) -> MediaResult<()> {
    let video_path = video_path.as_ref();
    let output_path = output_path.as_ref();

    let cmd = FfmpegCommand::new(video_path.to_string_lossy(), output_path)
        .seek(at_secs)
        .single_frame()
        .quality(FRAME_JPEG_QUALITY)
        .log_level("error");

    runner.run_ffmpeg(&cmd).await
}

/// Seek into `media_url` and copy `span_secs` of it to `output_path` without re-encoding.
pub async fn copy_range(
    runner: &ToolRunner,
    media_url: &str,
    start_secs: f64,
    span_secs: f64,
    output_path: impl AsRef<Path>,
) -> MediaResult<()> {
    let output_path = output_path.as_ref();

    info!(
        start = start_secs,
        span = span_secs,
        output = %output_path.display(),
        "Copying stream range"
    );

    let cmd = FfmpegCommand::new(media_url, output_path)
        .seek(start_secs)
        .duration(span_secs)
        .stream_copy()
        .log_level("error");

    runner.run_ffmpeg(&cmd).await
}
