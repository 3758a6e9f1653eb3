//! Source metadata and media download using yt-dlp.
//!
//! yt-dlp is used three ways: to read source metadata without downloading
//! payload bytes, to resolve a direct media URL that FFmpeg can seek into,
//! and as a whole-file fallback that trims through its own FFmpeg
//! post-processor.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::command::{last_line, Tool, ToolRunner};
use crate::error::{MediaError, MediaResult};

/// Format selector for every yt-dlp call. A single progressive stream, so
/// `--get-url` yields one URL FFmpeg can seek into.
pub const PROGRESSIVE_FORMAT: &str = "best[ext=mp4]/best";

/// Minimum size for a valid cookies file (bytes).
/// A real Netscape cookies file is at least ~50 bytes.
const MIN_COOKIES_FILE_SIZE: u64 = 50;

/// Metadata reported by yt-dlp for a source.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourceMetadata {
    pub id: Option<String>,
    pub title: Option<String>,
    /// Duration in seconds; absent for some live or broken sources
    pub duration: Option<f64>,
}

/// Validate that a cookies file appears to be in Netscape format.
fn is_valid_netscape_cookies(content: &str) -> bool {
    if content.starts_with("# Netscape HTTP Cookie File")
        || content.starts_with("# HTTP Cookie File")
    {
        return true;
    }

    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .any(|l| l.split('\t').count() >= 6)
}

/// Return `path` if it is a usable cookies file, otherwise `None`.
///
/// Missing, tiny or non-Netscape files are skipped with a log line so a bad
/// mount never breaks downloads outright.
pub async fn usable_cookies(path: &Path) -> Option<PathBuf> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(m) => m,
        Err(e) => {
            debug!("Cookies file {} not readable, skipping: {}", path.display(), e);
            return None;
        }
    };

    if metadata.len() < MIN_COOKIES_FILE_SIZE {
        debug!(
            "Cookies file {} is too small ({} bytes), skipping",
            path.display(),
            metadata.len()
        );
        return None;
    }

    match tokio::fs::read_to_string(path).await {
        Ok(content) if is_valid_netscape_cookies(&content) => {
            info!("Using cookies file {} for yt-dlp", path.display());
            Some(path.to_path_buf())
        }
        Ok(_) => {
            debug!(
                "Cookies file {} is not in Netscape format, skipping",
                path.display()
            );
            None
        }
        Err(e) => {
            warn!("Failed to read cookies file: {}", e);
            None
        }
    }
}

/// yt-dlp invocation settings shared by every call.
#[derive(Debug, Clone, Default)]
pub struct YtDlp {
    runner: ToolRunner,
    cookies: Option<PathBuf>,
}

impl YtDlp {
    pub fn new(runner: ToolRunner) -> Self {
        Self {
            runner,
            cookies: None,
        }
    }

    /// Pass a cookies file on every call.
    pub fn with_cookies(mut self, cookies: Option<PathBuf>) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn cookies(&self) -> Option<&Path> {
        self.cookies.as_deref()
    }

    fn base_args(&self) -> Vec<String> {
        let mut args = vec![
            "--no-warnings".to_string(),
            "--no-playlist".to_string(),
            "--extractor-args".to_string(),
            "youtube:player_client=web".to_string(),
        ];
        if let Some(cookies) = &self.cookies {
            args.push("--cookies".to_string());
            args.push(cookies.to_string_lossy().to_string());
        }
        args
    }

    async fn run(&self, args: Vec<String>, url: &str) -> MediaResult<std::process::Output> {
        let output = self.runner.output(Tool::YtDlp, &args).await?;
        if output.status.success() {
            return Ok(output);
        }
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        Err(classify_failure(url, &stderr, output.status.code()))
    }

    /// Read source metadata without downloading media.
    pub async fn metadata(&self, url: &str) -> MediaResult<SourceMetadata> {
        let mut args = self.base_args();
        args.extend(
            ["--dump-single-json", "--skip-download", "-f", PROGRESSIVE_FORMAT]
                .map(String::from),
        );
        args.push(url.to_string());

        let output = self.run(args, url).await?;
        let metadata: SourceMetadata = serde_json::from_slice(&output.stdout)?;
        debug!(url = url, duration = ?metadata.duration, "Resolved source metadata");
        Ok(metadata)
    }

    /// Resolve a direct media URL FFmpeg can read from.
    pub async fn direct_url(&self, url: &str) -> MediaResult<String> {
        let mut args = self.base_args();
        args.extend(["-f", PROGRESSIVE_FORMAT, "--get-url"].map(String::from));
        args.push(url.to_string());

        let output = self.run(args, url).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                MediaError::tool_failed(Tool::YtDlp.program(), "no media URL returned", None, None)
            })
    }

    /// Arguments for [`YtDlp::download_trimmed`]. `--no-part` keeps an
    /// interrupted transfer at `output_path` instead of a `.part` sibling.
    fn trimmed_args(
        &self,
        url: &str,
        start_secs: f64,
        span_secs: f64,
        output_path: &Path,
    ) -> Vec<String> {
        let mut args = self.base_args();
        args.extend(
            [
                "-f",
                PROGRESSIVE_FORMAT,
                "--force-overwrites",
                "--no-part",
                "--postprocessor-args",
            ]
            .map(String::from),
        );
        args.push(trim_postprocessor_arg(start_secs, span_secs));
        args.push("-o".to_string());
        args.push(output_path.to_string_lossy().to_string());
        args.push(url.to_string());
        args
    }

    /// Download the source and let yt-dlp trim it with FFmpeg post-processing.
    ///
    /// Best effort: depending on the format picked the file may cover more
    /// than `span_secs`.
    pub async fn download_trimmed(
        &self,
        url: &str,
        start_secs: f64,
        span_secs: f64,
        output_path: &Path,
    ) -> MediaResult<()> {
        let args = self.trimmed_args(url, start_secs, span_secs, output_path);

        info!(
            url = url,
            start = start_secs,
            span = span_secs,
            output = %output_path.display(),
            "Downloading with yt-dlp post-processor trim"
        );
        self.run(args, url).await.map(|_| ())
    }
}

/// `--postprocessor-args` value that seeks and limits duration.
fn trim_postprocessor_arg(start_secs: f64, span_secs: f64) -> String {
    format!("ffmpeg:-ss {:.3} -t {:.3}", start_secs, span_secs)
}

/// True when yt-dlp says the source itself cannot be reached.
fn is_unavailable_message(stderr: &str) -> bool {
    let msg = stderr.to_lowercase();
    msg.contains("private video")
        || msg.contains("video unavailable")
        || msg.contains("video is unavailable")
        || msg.contains("has been removed")
        || msg.contains("account associated with this video has been terminated")
        || msg.contains("not available in your country")
        || msg.contains("confirm your age")
}

/// True when yt-dlp stderr looks like upstream rate limiting.
fn is_rate_limited(stderr: &str) -> bool {
    stderr.contains("429")
        || stderr.contains("Too Many Requests")
        || stderr.contains("rate limit")
        || stderr.contains("Sign in to confirm")
}

fn classify_failure(url: &str, stderr: &str, exit_code: Option<i32>) -> MediaError {
    debug!("yt-dlp stderr: {}", stderr);
    let reason = last_line(stderr).unwrap_or("Unknown error").to_string();

    if is_rate_limited(stderr) {
        warn!(url = %url, "Upstream rate limit detected");
    }

    if is_unavailable_message(stderr) {
        return MediaError::source_unavailable(reason);
    }

    MediaError::tool_failed(
        Tool::YtDlp.program(),
        reason,
        Some(stderr.to_string()),
        exit_code,
    )
}
