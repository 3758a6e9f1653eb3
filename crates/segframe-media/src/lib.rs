//! yt-dlp / FFmpeg CLI wrappers for segment acquisition.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - A tool runner with timeout and cancellation via tokio
//! - Source metadata, direct-URL resolution and trimmed downloads via yt-dlp
//! - Duration probing via FFprobe
//! - Single-frame extraction and stream-copy range download
//! - The [`MediaToolkit`] capability trait the pipeline is written against

pub mod command;
pub mod download;
pub mod error;
pub mod frame;
pub mod fs_utils;
pub mod probe;
pub mod toolkit;

pub use command::{check_tools, FfmpegCommand, Tool, ToolRunner};
pub use download::{usable_cookies, SourceMetadata, YtDlp};
pub use error::{MediaError, MediaResult};
pub use frame::{copy_range, extract_frame};
pub use fs_utils::{ensure_dir, exceeds_size, file_size, remove_file_if_exists};
pub use probe::probe_duration;
pub use toolkit::{CliToolkit, MediaToolkit};
