//! Append-only dataset table.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::debug;

use segframe_models::AcquisitionResult;

use crate::error::WorkerResult;

/// Table columns, in order.
pub const COLUMNS: [&str; 3] = ["source_url", "timestamp", "frame_path"];

/// CSV writer shared by concurrent acquisitions.
///
/// Rows are flushed as soon as they are written so a crash loses at most the
/// row in flight. The header is only written to an empty file.
pub struct DatasetWriter {
    path: PathBuf,
    inner: Mutex<csv::Writer<File>>,
}

impl DatasetWriter {
    /// Open `path` for appending, creating it (and its header) if needed.
    pub fn open(path: impl AsRef<Path>) -> WorkerResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let is_empty = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if is_empty {
            writer.write_record(COLUMNS)?;
            writer.flush()?;
            debug!(table = %path.display(), "Wrote table header");
        }

        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(writer),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row and flush it to disk.
    pub async fn append(&self, row: &AcquisitionResult) -> WorkerResult<()> {
        let frame_path = row.frame_path.to_string_lossy();
        let mut writer = self.inner.lock().await;
        writer.write_record([
            row.source_url.as_str(),
            row.timestamp.as_str(),
            &*frame_path,
        ])?;
        writer.flush()?;
        Ok(())
    }
}
