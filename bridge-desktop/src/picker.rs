//! File picker for desktop hosts that already know which files to offer
//! (command-line arguments, drag-and-drop, a recent-files list).

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    picker::{audio_mime_type, FilePicker, PickedFile},
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Hands out pre-selected paths one pick at a time.
///
/// Paths without an audio extension are dropped at construction, mirroring a
/// native picker filtered to `audio/*`. Once the queue is empty every pick
/// behaves like a dismissed dialog.
pub struct PathFilePicker {
    queue: Mutex<VecDeque<PathBuf>>,
}

impl PathFilePicker {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let queue = paths
            .into_iter()
            .map(Into::into)
            .filter(|path: &PathBuf| {
                let audio = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .and_then(audio_mime_type)
                    .is_some();
                if !audio {
                    warn!(path = %path.display(), "Skipping non-audio file");
                }
                audio
            })
            .collect();

        Self {
            queue: Mutex::new(queue),
        }
    }

    /// Number of picks left before the picker reports cancellation.
    pub fn remaining(&self) -> usize {
        self.queue.lock().len()
    }
}

#[async_trait]
impl FilePicker for PathFilePicker {
    async fn pick_audio(&self) -> Result<Option<PickedFile>> {
        let Some(path) = self.queue.lock().pop_front() else {
            debug!("No file selected");
            return Ok(None);
        };

        let metadata = tokio::fs::metadata(&path).await?;
        if !metadata.is_file() {
            return Err(BridgeError::InvalidInput(format!(
                "Not a regular file: {}",
                path.display()
            )));
        }

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                BridgeError::InvalidInput(format!("Unusable file name: {}", path.display()))
            })?;

        Ok(Some(PickedFile::new(path.to_string_lossy(), name)))
    }
}
