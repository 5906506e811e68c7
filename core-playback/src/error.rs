//! # Playback Error Types
//!
//! Errors raised while uploading a file for separation and while driving
//! the per-stem players.

use crate::stems::StemName;
use bridge_traits::BridgeError;
use std::time::Duration;
use thiserror::Error;

/// Why a separation request produced no usable stem map.
///
/// Every variant carries its cause. None of them are retried automatically;
/// the user re-picks or re-uploads.
#[derive(Error, Debug)]
pub enum UploadError {
    /// The picked file could not be read into the request body.
    #[error("Cannot read picked file: {0}")]
    UnreadableFile(#[source] BridgeError),

    /// The request never produced a response.
    #[error("Network request failed: {0}")]
    Network(#[source] BridgeError),

    /// The backend answered with a non-2xx status.
    #[error("Backend returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// The response body is not a JSON object.
    #[error("Invalid response body: {0}")]
    InvalidBody(String),

    /// A stem URL could not be percent-decoded.
    #[error("Invalid URL for {stem}: {reason}")]
    InvalidUrl { stem: String, reason: String },

    #[error("Upload timed out after {0:?}")]
    TimedOut(Duration),

    /// A newer upload replaced this one before it finished.
    #[error("Upload superseded by a newer request")]
    Superseded,
}

impl UploadError {
    /// Classify an HTTP client failure. Local input problems are not
    /// network faults.
    pub fn from_bridge(err: BridgeError) -> Self {
        match err {
            BridgeError::Io(_) | BridgeError::InvalidInput(_) => UploadError::UnreadableFile(err),
            other => UploadError::Network(other),
        }
    }

    /// Returns `true` if repeating the same upload may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            UploadError::Network(_) | UploadError::TimedOut(_) => true,
            UploadError::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Errors that can occur during session and playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Addressing Errors
    // ========================================================================
    /// Index outside the session's stem layout.
    #[error("No stem at index {0}")]
    UnknownStem(usize),

    /// The stem has no player, either never bound or released.
    #[error("Stem {0} is not bound to a player")]
    NotBound(StemName),

    /// The player exists but has not confirmed load completion.
    #[error("Stem {0} is not loaded yet")]
    NotLoaded(StemName),

    /// The stem has no resolved URL to bind.
    #[error("Stem {0} has no URL")]
    NoUrl(StemName),

    // ========================================================================
    // Player Errors
    // ========================================================================
    /// The host could not create a player or rejected the stem URL.
    #[error("Failed to load {stem}: {message}")]
    LoadFailed { stem: StemName, message: String },

    // ========================================================================
    // Session Errors
    // ========================================================================
    /// URLs were applied before the previous generation was cleared.
    #[error("Stem registry must be reset before applying new URLs")]
    RegistryNotReset,

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("Host bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

impl PlaybackError {
    /// Returns `true` if this error is transient and the operation can be retried.
    pub fn is_transient(&self) -> bool {
        match self {
            PlaybackError::Upload(e) => e.is_transient(),
            PlaybackError::NotLoaded(_) => true,
            PlaybackError::Bridge(BridgeError::NotAvailable(_)) => true,
            _ => false,
        }
    }

    /// Returns `true` if the stem must be (re)bound before the operation is valid.
    pub fn is_not_bound(&self) -> bool {
        matches!(self, PlaybackError::NotBound(_))
    }

    /// Returns `true` if a newer upload replaced the one that failed.
    pub fn is_superseded(&self) -> bool {
        matches!(self, PlaybackError::Upload(UploadError::Superseded))
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
