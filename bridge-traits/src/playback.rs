//! Audio player bridge traits.
//!
//! The host platform owns audio decoding and output. The core only drives a
//! player through this small capability set: load a URL, play, pause, seek,
//! release, and observe a status feed. Each player instance plays exactly one
//! source; a host creates as many instances as the core asks for through
//! [`AudioPlayerFactory`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::Result;

/// Snapshot emitted on a player's status feed.
///
/// Hosts publish a new snapshot whenever something changes and at least once
/// per second while playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerStatus {
    /// `true` once the host confirmed the source finished loading.
    pub is_loaded: bool,
    /// `true` while audio is being rendered.
    pub is_playing: bool,
    /// Current playback position in milliseconds.
    pub position_ms: u64,
    /// Total duration in milliseconds; `0` while unknown.
    pub duration_ms: u64,
}

impl PlayerStatus {
    /// Status of a freshly created player with nothing loaded.
    pub fn unloaded() -> Self {
        Self::default()
    }

    /// Status of a loaded, paused player at the start of a source.
    pub fn loaded(duration_ms: u64) -> Self {
        Self {
            is_loaded: true,
            is_playing: false,
            position_ms: 0,
            duration_ms,
        }
    }
}

/// A single host-side audio player.
///
/// Implementations must tolerate calls in any order but the core only issues
/// transport calls after [`load`](AudioPlayer::load) succeeded, and never
/// calls anything after [`release`](AudioPlayer::release).
#[async_trait]
pub trait AudioPlayer: Send + Sync {
    /// Start loading a remote source. Completion of loading is reported on
    /// the status feed through `is_loaded`.
    ///
    /// # Errors
    ///
    /// Returns error if the host rejects the URL.
    async fn load(&self, url: &str) -> Result<()>;

    /// Begin or resume playback.
    async fn play(&self) -> Result<()>;

    /// Pause playback, keeping the position.
    async fn pause(&self) -> Result<()>;

    /// Seek to an absolute position in milliseconds.
    async fn seek(&self, position_ms: u64) -> Result<()>;

    /// Subscribe to the status feed. Every receiver observes the latest
    /// snapshot immediately.
    fn subscribe(&self) -> watch::Receiver<PlayerStatus>;

    /// Release native resources held by this player.
    async fn release(&self) -> Result<()>;
}

/// Creates [`AudioPlayer`] instances on demand.
#[async_trait]
pub trait AudioPlayerFactory: Send + Sync {
    /// Allocate a new, unloaded player.
    async fn create_player(&self) -> Result<Box<dyn AudioPlayer>>;
}
