//! Temporary clip files owned by a single acquisition attempt.

use std::ffi::OsStr;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use segframe_media::{remove_file_if_exists, MediaResult};

/// A downloaded clip in the temp directory.
///
/// The guard owns the clip and every sibling whose name starts with the
/// clip's stem, which covers tool side files such as `<name>.mp4.part` or
/// `<stem>.temp.mp4`. They are removed by [`TempArtifact::cleanup`] at the
/// end of each attempt. If the guard is dropped without a successful
/// cleanup (panic, task abort, removal error) they are removed
/// synchronously in `Drop`.
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
    stem: String,
    cleaned: bool,
}

impl TempArtifact {
    /// Reserve a unique path for `source_id` inside `temp_dir`.
    ///
    /// Name: `{source_id}_{unix_secs}_{uuid8}.mp4`.
    pub fn reserve(temp_dir: &Path, source_id: &str) -> Self {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let stem = format!(
            "{}_{}_{}",
            sanitize(source_id),
            chrono::Utc::now().timestamp(),
            &suffix[..8]
        );
        Self {
            path: temp_dir.join(format!("{}.mp4", stem)),
            stem,
            cleaned: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn owns(&self, name: &OsStr) -> bool {
        name.to_str().is_some_and(|n| n.starts_with(&self.stem))
    }

    /// Remove the clip and its side files. Once a cleanup succeeds later
    /// calls are no-ops; after a failure `Drop` tries again.
    pub async fn cleanup(&mut self) {
        if self.cleaned {
            return;
        }
        match self.remove_owned().await {
            Ok(removed) => {
                self.cleaned = true;
                if removed > 0 {
                    debug!(removed, "Removed temp artifact {}", self.path.display());
                }
            }
            Err(e) => warn!("Failed to remove temp artifact {}: {}", self.path.display(), e),
        }
    }

    async fn remove_owned(&self) -> MediaResult<usize> {
        let Some(dir) = self.path.parent() else {
            return Ok(0);
        };
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        let mut failure = None;
        while let Some(entry) = entries.next_entry().await? {
            if !self.owns(&entry.file_name()) {
                continue;
            }
            match remove_file_if_exists(entry.path()).await {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => failure = Some(e),
            }
        }
        failure.map_or(Ok(removed), Err)
    }

    fn remove_owned_blocking(&self) -> std::io::Result<usize> {
        let Some(dir) = self.path.parent() else {
            return Ok(0);
        };
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };

        let mut removed = 0;
        let mut failure = None;
        for entry in entries.filter_map(Result::ok) {
            if !self.owns(&entry.file_name()) {
                continue;
            }
            match std::fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => failure = Some(e),
            }
        }
        failure.map_or(Ok(removed), Err)
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        if self.cleaned {
            return;
        }
        match self.remove_owned_blocking() {
            Ok(0) => {}
            Ok(removed) => debug!(removed, "Removed temp artifact {} on drop", self.path.display()),
            Err(e) => warn!("Failed to remove temp artifact {}: {}", self.path.display(), e),
        }
    }
}

/// Keep ids usable as file name components.
fn sanitize(source_id: &str) -> String {
    source_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
