//! # Session Configuration
//!
//! Settings for one stem session: which stems the backend produces, how
//! concurrent playback is handled, and where uploads are sent.

use crate::stems::StemLayout;
use serde::{Deserialize, Serialize};

/// What happens to other stems when one starts playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackPolicy {
    /// Stems play and pause independently; any number may play at once.
    #[default]
    Concurrent,
    /// Starting a stem pauses every other playing stem first.
    Exclusive,
}

/// Stem session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Stems the backend is expected to return.
    ///
    /// Default: four stems (vocals, drums, bass, other).
    #[serde(default)]
    pub layout: StemLayout,

    /// Default: concurrent.
    #[serde(default)]
    pub playback_policy: PlaybackPolicy,

    /// Path of the separation endpoint, relative to the backend URL.
    ///
    /// Default: `/split`.
    #[serde(default = "default_endpoint_path")]
    pub endpoint_path: String,

    /// Multipart field carrying the audio file.
    ///
    /// Default: `file`.
    #[serde(default = "default_upload_field")]
    pub upload_field: String,

    /// Create and load players as soon as every stem URL is known.
    ///
    /// When disabled the host binds stems on demand.
    ///
    /// Default: true.
    #[serde(default = "default_bind_on_ready")]
    pub bind_on_ready: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            layout: StemLayout::default(),
            playback_policy: PlaybackPolicy::default(),
            endpoint_path: default_endpoint_path(),
            upload_field: default_upload_field(),
            bind_on_ready: default_bind_on_ready(),
        }
    }
}

impl SessionConfig {
    /// Vocals plus instrumental.
    pub fn two_stems() -> Self {
        Self {
            layout: StemLayout::TwoStems,
            ..Default::default()
        }
    }

    pub fn with_policy(mut self, policy: PlaybackPolicy) -> Self {
        self.playback_policy = policy;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if !self.endpoint_path.starts_with('/') {
            return Err(format!(
                "endpoint_path must start with '/', got '{}'",
                self.endpoint_path
            ));
        }

        if self.upload_field.trim().is_empty() {
            return Err("upload_field must not be empty".to_string());
        }

        Ok(())
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_endpoint_path() -> String {
    "/split".to_string()
}

fn default_upload_field() -> String {
    "file".to_string()
}

fn default_bind_on_ready() -> bool {
    true
}
