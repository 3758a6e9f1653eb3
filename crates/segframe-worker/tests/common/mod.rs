//! Shared fixtures for acquisition tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::Instant;

use segframe_media::{MediaError, MediaResult, MediaToolkit, SourceMetadata};
use segframe_worker::PipelineConfig;

/// Size of a fake clip; above the default validation gate.
pub const CLIP_BYTES: usize = 4096;

/// How a fake fetch step behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Ok,
    Fail,
    /// Succeeds but writes a file too small to pass validation
    Tiny,
    /// Reports that the tool was killed by cancellation
    Cancelled,
    /// Leaves a `.part` side file next to the output, then fails
    Partial,
}

/// Everything the fake was asked to do.
#[derive(Debug, Default, Clone)]
pub struct CallLog {
    pub metadata_at: Vec<Instant>,
    pub copy_starts: Vec<f64>,
    pub trimmed_starts: Vec<f64>,
    pub frame_offsets: Vec<f64>,
    /// Files in the watched directory when each metadata call began
    pub temp_files_at_lookup: Vec<usize>,
}

/// In-process [`MediaToolkit`] that writes small files instead of running tools.
pub struct FakeToolkit {
    /// Known sources and their reported duration; unknown ids are unavailable
    sources: HashMap<String, Option<f64>>,
    clip_secs: f64,
    metadata_failures: AtomicU32,
    probe_failures: AtomicU32,
    stream_copy: Step,
    trimmed: Step,
    extract: Step,
    watch_dir: Option<PathBuf>,
    cancel_on_lookup: Mutex<Option<watch::Sender<bool>>>,
    frames_written: AtomicU32,
    log: Mutex<CallLog>,
}

impl Default for FakeToolkit {
    fn default() -> Self {
        Self {
            sources: HashMap::new(),
            clip_secs: 10.0,
            metadata_failures: AtomicU32::new(0),
            probe_failures: AtomicU32::new(0),
            stream_copy: Step::Ok,
            trimmed: Step::Ok,
            extract: Step::Ok,
            watch_dir: None,
            cancel_on_lookup: Mutex::new(None),
            frames_written: AtomicU32::new(0),
            log: Mutex::new(CallLog::default()),
        }
    }
}

impl FakeToolkit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, id: &str, duration: Option<f64>) -> Self {
        self.sources.insert(id.to_string(), duration);
        self
    }

    pub fn with_clip_secs(mut self, secs: f64) -> Self {
        self.clip_secs = secs;
        self
    }

    /// Fail the first `n` metadata lookups with a network error.
    pub fn failing_lookups(self, n: u32) -> Self {
        self.metadata_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Fail the first `n` probes.
    pub fn failing_probes(self, n: u32) -> Self {
        self.probe_failures.store(n, Ordering::SeqCst);
        self
    }

    pub fn with_stream_copy(mut self, step: Step) -> Self {
        self.stream_copy = step;
        self
    }

    pub fn with_trimmed(mut self, step: Step) -> Self {
        self.trimmed = step;
        self
    }

    /// How frame extraction behaves; `Tiny` writes an empty image.
    pub fn with_extract(mut self, step: Step) -> Self {
        self.extract = step;
        self
    }

    /// Count the files in `dir` whenever a lookup starts.
    pub fn watching(mut self, dir: &Path) -> Self {
        self.watch_dir = Some(dir.to_path_buf());
        self
    }

    /// Fire `tx` during the first lookup.
    pub fn cancel_on_lookup(self, tx: watch::Sender<bool>) -> Self {
        *self.cancel_on_lookup.lock().unwrap() = Some(tx);
        self
    }

    pub fn log(&self) -> CallLog {
        self.log.lock().unwrap().clone()
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    async fn write_clip(step: Step, output: &Path) -> MediaResult<()> {
        match step {
            Step::Ok => {
                tokio::fs::write(output, vec![0u8; CLIP_BYTES]).await?;
                Ok(())
            }
            Step::Tiny => {
                tokio::fs::write(output, b"tiny").await?;
                Ok(())
            }
            Step::Fail => Err(MediaError::tool_failed(
                "ffmpeg",
                "Server returned 403 Forbidden",
                None,
                Some(1),
            )),
            Step::Cancelled => Err(MediaError::Cancelled),
            Step::Partial => {
                let mut part = output.as_os_str().to_os_string();
                part.push(".part");
                tokio::fs::write(part, vec![0u8; CLIP_BYTES / 2]).await?;
                Err(MediaError::tool_failed(
                    "yt-dlp",
                    "ERROR: unable to download video data: HTTP Error 403: Forbidden",
                    None,
                    Some(1),
                ))
            }
        }
    }
}

fn id_from_url(url: &str) -> &str {
    url.rsplit("v=").next().unwrap_or(url)
}

#[async_trait]
impl MediaToolkit for FakeToolkit {
    async fn source_metadata(&self, url: &str) -> MediaResult<SourceMetadata> {
        let temp_files = match &self.watch_dir {
            Some(dir) => count_files(dir),
            None => 0,
        };
        {
            let mut log = self.log.lock().unwrap();
            log.metadata_at.push(Instant::now());
            log.temp_files_at_lookup.push(temp_files);
        }
        if let Some(tx) = self.cancel_on_lookup.lock().unwrap().take() {
            tx.send(true).ok();
        }

        if Self::take_failure(&self.metadata_failures) {
            return Err(MediaError::tool_failed(
                "yt-dlp",
                "Unable to download webpage: timed out",
                None,
                Some(1),
            ));
        }

        let id = id_from_url(url);
        match self.sources.get(id) {
            Some(duration) => Ok(SourceMetadata {
                id: Some(id.to_string()),
                title: Some(format!("video {}", id)),
                duration: *duration,
            }),
            None => Err(MediaError::source_unavailable("Private video")),
        }
    }

    async fn resolve_media_url(&self, url: &str) -> MediaResult<String> {
        match self.stream_copy {
            Step::Fail => Err(MediaError::tool_failed("yt-dlp", "no media URL returned", None, None)),
            _ => Ok(format!("https://cdn.test/{}.mp4", id_from_url(url))),
        }
    }

    async fn copy_range(
        &self,
        _media_url: &str,
        start_secs: f64,
        _span_secs: f64,
        output: &Path,
    ) -> MediaResult<()> {
        self.log.lock().unwrap().copy_starts.push(start_secs);
        Self::write_clip(self.stream_copy, output).await
    }

    async fn download_trimmed(
        &self,
        _url: &str,
        start_secs: f64,
        _span_secs: f64,
        output: &Path,
    ) -> MediaResult<()> {
        self.log.lock().unwrap().trimmed_starts.push(start_secs);
        Self::write_clip(self.trimmed, output).await
    }

    async fn probe_duration(&self, path: &Path) -> MediaResult<f64> {
        if !path.exists() {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }
        if Self::take_failure(&self.probe_failures) {
            return Err(MediaError::InvalidVideo("moov atom not found".to_string()));
        }
        Ok(self.clip_secs)
    }

    async fn extract_frame(&self, input: &Path, at_secs: f64, output: &Path) -> MediaResult<()> {
        if !input.exists() {
            return Err(MediaError::FileNotFound(input.to_path_buf()));
        }
        self.log.lock().unwrap().frame_offsets.push(at_secs);
        match self.extract {
            Step::Ok => {
                let n = self.frames_written.fetch_add(1, Ordering::SeqCst) + 1;
                tokio::fs::write(output, format!("frame #{} at {:.3}", n, at_secs)).await?;
                Ok(())
            }
            Step::Tiny => {
                tokio::fs::write(output, b"").await?;
                Ok(())
            }
            Step::Cancelled => Err(MediaError::Cancelled),
            Step::Fail | Step::Partial => {
                tokio::fs::write(output, b"").await?;
                Err(MediaError::tool_failed(
                    "ffmpeg",
                    "Output file is empty, nothing was encoded",
                    None,
                    Some(1),
                ))
            }
        }
    }
}

pub fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| entries.filter_map(Result::ok).count())
        .unwrap_or(0)
}

/// Config rooted in a scratch directory with a short backoff.
pub fn test_config(root: &Path) -> PipelineConfig {
    PipelineConfig::with_data_dir(root.join("data"))
        .with_temp_dir(root.join("tmp"))
        .with_backoff_base(Duration::from_millis(1))
}
