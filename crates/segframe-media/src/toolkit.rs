//! Capability interface over the external media tools.
//!
//! The acquisition pipeline only ever talks to a [`MediaToolkit`]. The
//! production [`CliToolkit`] shells out to yt-dlp, FFmpeg and FFprobe; tests
//! substitute fakes that write files directly and inject failures.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::watch;

use crate::command::ToolRunner;
use crate::download::{SourceMetadata, YtDlp};
use crate::error::MediaResult;
use crate::frame::{copy_range, extract_frame};
use crate::probe::probe_duration;

/// Operations the acquisition pipeline needs from the outside world.
#[async_trait]
pub trait MediaToolkit: Send + Sync {
    /// Resolve metadata for a source page URL without downloading media.
    async fn source_metadata(&self, url: &str) -> MediaResult<SourceMetadata>;

    /// Resolve a direct media URL for a source page URL.
    async fn resolve_media_url(&self, url: &str) -> MediaResult<String>;

    /// Copy `span_secs` starting at `start_secs` from `media_url` into `output` (stream copy).
    async fn copy_range(
        &self,
        media_url: &str,
        start_secs: f64,
        span_secs: f64,
        output: &Path,
    ) -> MediaResult<()>;

    /// Download the source and trim it through the downloader's own post-processing.
    async fn download_trimmed(
        &self,
        url: &str,
        start_secs: f64,
        span_secs: f64,
        output: &Path,
    ) -> MediaResult<()>;

    /// Duration of a local media file in seconds.
    async fn probe_duration(&self, path: &Path) -> MediaResult<f64>;

    /// Write the frame at `at_secs` of `input` to `output` as an image.
    async fn extract_frame(&self, input: &Path, at_secs: f64, output: &Path) -> MediaResult<()>;
}

/// [`MediaToolkit`] backed by the yt-dlp, FFmpeg and FFprobe executables.
#[derive(Debug, Clone, Default)]
pub struct CliToolkit {
    runner: ToolRunner,
    ytdlp: YtDlp,
}

impl CliToolkit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill any running tool after `secs` seconds.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.runner = self.runner.with_timeout(secs);
        self.rebuild_ytdlp()
    }

    /// Kill any running tool once `cancel_rx` turns true.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.runner = self.runner.with_cancel(cancel_rx);
        self.rebuild_ytdlp()
    }

    /// Hand a cookies file to every yt-dlp call.
    pub fn with_cookies(mut self, cookies: Option<PathBuf>) -> Self {
        self.ytdlp = self.ytdlp.with_cookies(cookies);
        self
    }

    fn rebuild_ytdlp(mut self) -> Self {
        let cookies = self.ytdlp.cookies().map(Path::to_path_buf);
        self.ytdlp = YtDlp::new(self.runner.clone()).with_cookies(cookies);
        self
    }
}

#[async_trait]
impl MediaToolkit for CliToolkit {
    async fn source_metadata(&self, url: &str) -> MediaResult<SourceMetadata> {
        self.ytdlp.metadata(url).await
    }

    async fn resolve_media_url(&self, url: &str) -> MediaResult<String> {
        self.ytdlp.direct_url(url).await
    }

    async fn copy_range(
        &self,
        media_url: &str,
        start_secs: f64,
        span_secs: f64,
        output: &Path,
    ) -> MediaResult<()> {
        copy_range(&self.runner, media_url, start_secs, span_secs, output).await
    }

    async fn download_trimmed(
        &self,
        url: &str,
        start_secs: f64,
        span_secs: f64,
        output: &Path,
    ) -> MediaResult<()> {
        self.ytdlp
            .download_trimmed(url, start_secs, span_secs, output)
            .await
    }

    async fn probe_duration(&self, path: &Path) -> MediaResult<f64> {
        probe_duration(&self.runner, path).await
    }

    async fn extract_frame(&self, input: &Path, at_secs: f64, output: &Path) -> MediaResult<()> {
        extract_frame(&self.runner, input, at_secs, output).await
    }
}
