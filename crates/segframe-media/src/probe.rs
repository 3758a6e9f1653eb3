//! FFprobe duration probing.

use serde::Deserialize;
use std::path::Path;

use crate::command::{Tool, ToolRunner};
use crate::error::{MediaError, MediaResult};

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Probe a media file for its container duration in seconds.
pub async fn probe_duration(runner: &ToolRunner, path: impl AsRef<Path>) -> MediaResult<f64> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    let args = vec![
        "-v".to_string(),
        "error".to_string(),
        "-print_format".to_string(),
        "json".to_string(),
        "-show_format".to_string(),
        path.to_string_lossy().to_string(),
    ];

    let output = runner.run(Tool::Ffprobe, &args).await?;
    parse_duration(&output.stdout)
}

/// Extract `format.duration` from FFprobe JSON.
fn parse_duration(stdout: &[u8]) -> MediaResult<f64> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)?;

    let duration = probe
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.trim().parse::<f64>().ok())
        .ok_or_else(|| MediaError::InvalidVideo("container reports no duration".to_string()))?;

    if !duration.is_finite() || duration <= 0.0 {
        return Err(MediaError::InvalidVideo(format!(
            "container reports unusable duration {}",
            duration
        )));
    }

    Ok(duration)
}
