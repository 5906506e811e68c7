//! File picker abstraction.
//!
//! Hosts present their native document picker restricted to audio files and
//! hand back a reference to the chosen file. Closing the picker is not an
//! error: it yields `Ok(None)`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;

/// Audio extensions offered by pickers, with the MIME type forwarded on upload.
const AUDIO_TYPES: &[(&str, &str)] = &[
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("flac", "audio/flac"),
    ("m4a", "audio/mp4"),
    ("aac", "audio/aac"),
    ("ogg", "audio/ogg"),
    ("oga", "audio/ogg"),
    ("opus", "audio/opus"),
    ("aif", "audio/aiff"),
    ("aiff", "audio/aiff"),
];

/// Look up the audio MIME type for a file name by extension.
///
/// Returns `None` for names without a known audio extension.
pub fn audio_mime_type(file_name: &str) -> Option<&'static str> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    AUDIO_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
}

/// A file chosen by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickedFile {
    /// Host reference to the file (a path, or a `file://` URI).
    pub uri: String,
    /// Name shown to the user and forwarded as the upload file name.
    pub name: String,
}

impl PickedFile {
    pub fn new(uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
        }
    }

    /// Local filesystem path behind the URI.
    ///
    /// `file://` URIs are percent-decoded (`take%201.flac` names
    /// `take 1.flac`); plain paths are taken literally.
    pub fn local_path(&self) -> PathBuf {
        let Some(encoded) = self.uri.strip_prefix("file://") else {
            return PathBuf::from(&self.uri);
        };
        let encoded = encoded.strip_prefix("localhost").unwrap_or(encoded);
        match urlencoding::decode(encoded) {
            Ok(decoded) => PathBuf::from(decoded.into_owned()),
            Err(_) => PathBuf::from(encoded),
        }
    }
}

/// Native document picker restricted to audio files.
#[async_trait]
pub trait FilePicker: Send + Sync {
    /// Ask the user for one audio file.
    ///
    /// Returns `Ok(None)` when the user dismissed the picker.
    async fn pick_audio(&self) -> Result<Option<PickedFile>>;
}
