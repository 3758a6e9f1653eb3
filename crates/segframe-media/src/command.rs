//! External tool command builder and runner.

use std::future::pending;
use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::process::Command;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};

/// External programs the pipeline shells out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Ffmpeg,
    Ffprobe,
    YtDlp,
}

impl Tool {
    /// Executable name looked up on `PATH`.
    pub fn program(self) -> &'static str {
        match self {
            Tool::Ffmpeg => "ffmpeg",
            Tool::Ffprobe => "ffprobe",
            Tool::YtDlp => "yt-dlp",
        }
    }

    /// Resolve the executable, failing with the tool-specific error.
    pub fn locate(self) -> MediaResult<PathBuf> {
        which::which(self.program()).map_err(|_| match self {
            Tool::Ffmpeg => MediaError::FfmpegNotFound,
            Tool::Ffprobe => MediaError::FfprobeNotFound,
            Tool::YtDlp => MediaError::YtDlpNotFound,
        })
    }
}

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file path or URL
    input: String,
    /// Output file path
    output: PathBuf,
    /// Input arguments (before -i)
    input_args: Vec<String>,
    /// Output arguments (after -i)
    output_args: Vec<String>,
    /// Log level
    log_level: String,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command. `input` may be a local path or a URL.
    pub fn new(input: impl Into<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            input_args: Vec::new(),
            output_args: Vec::new(),
            log_level: "error".to_string(),
        }
    }

    /// Add input arguments (before -i).
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    /// Add output arguments (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Set seek position (before input).
    pub fn seek(self, seconds: f64) -> Self {
        self.input_arg("-ss").input_arg(format!("{:.3}", seconds))
    }

    /// Limit output duration.
    pub fn duration(self, seconds: f64) -> Self {
        self.output_arg("-t").output_arg(format!("{:.3}", seconds))
    }

    /// Copy audio and video streams without re-encoding.
    pub fn stream_copy(self) -> Self {
        self.output_arg("-c:v")
            .output_arg("copy")
            .output_arg("-c:a")
            .output_arg("copy")
    }

    /// Extract single frame.
    pub fn single_frame(self) -> Self {
        self.output_arg("-frames:v").output_arg("1")
    }

    /// Set image quality scale (2 is near-lossless JPEG).
    pub fn quality(self, q: u8) -> Self {
        self.output_arg("-q:v").output_arg(q.to_string())
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec!["-hide_banner".to_string()];

        // Outputs are always replaced; frames for a reused index overwrite.
        args.push("-y".to_string());

        args.push("-loglevel".to_string());
        args.push(self.log_level.clone());

        args.extend(self.input_args.iter().cloned());

        args.push("-i".to_string());
        args.push(self.input.clone());

        args.extend(self.output_args.iter().cloned());

        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Runs external tools with optional timeout and cancellation.
///
/// The child is spawned with `kill_on_drop`, so abandoning the wait on
/// timeout or cancellation also kills the process.
#[derive(Debug, Clone, Default)]
pub struct ToolRunner {
    /// Cancellation signal receiver
    cancel_rx: Option<watch::Receiver<bool>>,
    /// Timeout in seconds
    timeout_secs: Option<u64>,
}

impl ToolRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set cancellation signal.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    /// Set timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Run a tool and return its raw output, whatever the exit status.
    pub async fn output(&self, tool: Tool, args: &[String]) -> MediaResult<Output> {
        tool.locate()?;
        debug!("Running {} {}", tool.program(), args.join(" "));

        let child = Command::new(tool.program())
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let mut cancel_rx = self.cancel_rx.clone();
        let cancelled = async move {
            match cancel_rx.as_mut() {
                Some(rx) => wait_for_cancel(rx).await,
                None => pending::<()>().await,
            }
        };

        let timeout_secs = self.timeout_secs;
        let timed_out = async move {
            match timeout_secs {
                Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
                None => pending::<()>().await,
            }
        };

        tokio::select! {
            output = child.wait_with_output() => Ok(output?),
            _ = cancelled => {
                info!("{} cancelled, killing process", tool.program());
                Err(MediaError::Cancelled)
            }
            _ = timed_out => {
                let secs = timeout_secs.unwrap_or_default();
                warn!("{} timed out after {} seconds, killing process", tool.program(), secs);
                Err(MediaError::Timeout(secs))
            }
        }
    }

    /// Run a tool and fail unless it exits successfully.
    pub async fn run(&self, tool: Tool, args: &[String]) -> MediaResult<Output> {
        let output = self.output(tool, args).await?;
        if output.status.success() {
            return Ok(output);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        debug!("{} stderr: {}", tool.program(), stderr);
        Err(MediaError::tool_failed(
            tool.program(),
            last_line(&stderr).unwrap_or("exited with non-zero status"),
            Some(stderr.clone()),
            output.status.code(),
        ))
    }

    /// Run an FFmpeg command.
    pub async fn run_ffmpeg(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        self.run(Tool::Ffmpeg, &cmd.build_args()).await.map(|_| ())
    }
}

/// Resolve once the receiver observes `true`. Never resolves if the sender is gone.
async fn wait_for_cancel(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return pending::<()>().await;
        }
    }
}

/// Last non-empty line of tool output.
pub(crate) fn last_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).filter(|l| !l.is_empty()).last()
}

/// Check that FFmpeg, FFprobe and yt-dlp are all available.
pub fn check_tools() -> MediaResult<Vec<(Tool, PathBuf)>> {
    [Tool::Ffmpeg, Tool::Ffprobe, Tool::YtDlp]
        .into_iter()
        .map(|tool| tool.locate().map(|path| (tool, path)))
        .collect()
}
