//! Pipeline configuration.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use segframe_models::DEFAULT_CLIP_SPAN_SECS;

use crate::error::{WorkerError, WorkerResult};

/// Configuration passed into the orchestrator and batch runner.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root for permanent outputs
    pub data_dir: PathBuf,
    /// Permanent frame directory (`{sequence_index}.{frame_extension}`)
    pub frames_dir: PathBuf,
    /// Ephemeral directory for downloaded clips, cleaned per attempt
    pub temp_dir: PathBuf,
    /// Directory reserved for downstream derived artifacts
    pub results_dir: PathBuf,
    /// Append-only dataset table
    pub output_table: PathBuf,
    /// Whole-pipeline attempts per descriptor
    pub max_attempts: u32,
    /// Delay after attempt k is `backoff_base * k`
    pub backoff_base: Duration,
    /// Length of the clip downloaded around the midpoint
    pub clip_span_secs: f64,
    /// Downloads at or below this size are treated as failed
    pub min_artifact_bytes: u64,
    /// Frame image extension
    pub frame_extension: String,
    /// Per-tool-invocation timeout
    pub tool_timeout: Duration,
    /// Keep retrying failures that cannot succeed on retry (private video, out of range)
    pub retry_permanent_failures: bool,
    /// Descriptors acquired in parallel
    pub max_concurrent: usize,
    /// Optional Netscape cookies file for yt-dlp
    pub cookies_path: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::with_data_dir("data")
    }
}

impl PipelineConfig {
    /// Defaults with every data path rooted at `data_dir`.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            frames_dir: data_dir.join("frames"),
            temp_dir: std::env::temp_dir(),
            results_dir: data_dir.join("results"),
            output_table: data_dir.join("frame_metadata.csv"),
            data_dir,
            max_attempts: 3,
            backoff_base: Duration::from_secs(2),
            clip_span_secs: DEFAULT_CLIP_SPAN_SECS,
            min_artifact_bytes: 1000,
            frame_extension: "jpg".to_string(),
            tool_timeout: Duration::from_secs(300),
            retry_permanent_failures: true,
            max_concurrent: 1,
            cookies_path: None,
        }
    }

    /// Create config from environment variables (after loading `.env`).
    pub fn from_env() -> WorkerResult<Self> {
        let data_dir = std::env::var("SEGFRAME_DATA_DIR").unwrap_or_else(|_| "data".to_string());
        let mut config = Self::with_data_dir(data_dir);

        if let Some(dir) = env_path("SEGFRAME_FRAMES_DIR") {
            config.frames_dir = dir;
        }
        if let Some(dir) = env_path("SEGFRAME_TEMP_DIR") {
            config.temp_dir = dir;
        }
        if let Some(dir) = env_path("SEGFRAME_RESULTS_DIR") {
            config.results_dir = dir;
        }
        if let Some(path) = env_path("SEGFRAME_OUTPUT_TABLE") {
            config.output_table = path;
        }
        if let Some(n) = env_parse("SEGFRAME_MAX_ATTEMPTS")? {
            config.max_attempts = n;
        }
        if let Some(secs) = env_parse::<f64>("SEGFRAME_BACKOFF_BASE_SECS")? {
            config.backoff_base = secs_to_duration("SEGFRAME_BACKOFF_BASE_SECS", secs)?;
        }
        if let Some(span) = env_parse("SEGFRAME_CLIP_SPAN_SECS")? {
            config.clip_span_secs = span;
        }
        if let Some(bytes) = env_parse("SEGFRAME_MIN_ARTIFACT_BYTES")? {
            config.min_artifact_bytes = bytes;
        }
        if let Ok(ext) = std::env::var("SEGFRAME_FRAME_EXT") {
            config.frame_extension = ext.trim_start_matches('.').to_string();
        }
        if let Some(secs) = env_parse("SEGFRAME_TOOL_TIMEOUT_SECS")? {
            config.tool_timeout = Duration::from_secs(secs);
        }
        if let Some(retry) = env_parse("SEGFRAME_RETRY_PERMANENT")? {
            config.retry_permanent_failures = retry;
        }
        if let Some(n) = env_parse("SEGFRAME_MAX_CONCURRENT")? {
            config.max_concurrent = n;
        }
        config.cookies_path = env_path("SEGFRAME_COOKIES");

        config.validate()?;
        Ok(config)
    }

    /// Move every data path under `data_dir`, keeping the other settings.
    pub fn rebase(self, data_dir: impl Into<PathBuf>) -> Self {
        let rooted = Self::with_data_dir(data_dir);
        Self {
            data_dir: rooted.data_dir,
            frames_dir: rooted.frames_dir,
            results_dir: rooted.results_dir,
            output_table: rooted.output_table,
            ..self
        }
    }

    /// Override the number of attempts per descriptor.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Override the backoff base delay.
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// Override the temporary directory.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    /// Override the length of the clip fetched around each midpoint.
    pub fn with_clip_span_secs(mut self, span_secs: f64) -> Self {
        self.clip_span_secs = span_secs;
        self
    }

    /// Stop retrying failures that cannot succeed on retry.
    pub fn with_retry_permanent_failures(mut self, retry: bool) -> Self {
        self.retry_permanent_failures = retry;
        self
    }

    /// Override the number of descriptors processed in parallel.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    /// Reject values that would make the pipeline meaningless.
    pub fn validate(&self) -> WorkerResult<()> {
        if self.max_attempts == 0 {
            return Err(WorkerError::config_error("max_attempts must be at least 1"));
        }
        if self.max_concurrent == 0 {
            return Err(WorkerError::config_error("max_concurrent must be at least 1"));
        }
        if !self.clip_span_secs.is_finite() || self.clip_span_secs <= 0.0 {
            return Err(WorkerError::config_error("clip_span_secs must be positive"));
        }
        if self.frame_extension.is_empty() {
            return Err(WorkerError::config_error("frame_extension cannot be empty"));
        }
        Ok(())
    }

    /// Permanent frame path for a sequence index.
    pub fn frame_path(&self, sequence_index: u64) -> PathBuf {
        self.frames_dir
            .join(format!("{}.{}", sequence_index, self.frame_extension))
    }

    /// Create the frame, temp and results directories.
    pub async fn ensure_dirs(&self) -> WorkerResult<()> {
        for dir in [&self.frames_dir, &self.temp_dir, &self.results_dir] {
            segframe_media::ensure_dir(dir).await?;
        }
        if let Some(parent) = self.output_table.parent().filter(|p| !p.as_os_str().is_empty()) {
            segframe_media::ensure_dir(parent).await?;
        }
        Ok(())
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(|v| Path::new(v.trim()).to_path_buf())
}

fn env_parse<T: FromStr>(key: &str) -> WorkerResult<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| WorkerError::config_error(format!("{} has invalid value '{}'", key, raw))),
        Err(_) => Ok(None),
    }
}

fn secs_to_duration(key: &str, secs: f64) -> WorkerResult<Duration> {
    Duration::try_from_secs_f64(secs)
        .map_err(|_| WorkerError::config_error(format!("{} must be a non-negative number", key)))
}
