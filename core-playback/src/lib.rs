//! # Stem Playback Core
//!
//! Uploads a picked audio file to a source-separation backend and plays the
//! returned stems side by side.
//!
//! ## Overview
//!
//! - [`upload`]: the Upload Orchestrator, one multipart POST per pick
//! - [`registry`]: the Stem Registry and its "all stems ready" gate
//! - [`players`]: the Playback Session Manager, one host player per stem
//! - [`session`]: [`StemSession`], the upload state machine tying them together
//! - [`time`]: `M:SS` display formatting
//!
//! Audio decoding and output stay with the host, behind
//! [`bridge_traits::playback::AudioPlayer`].
//!
//! ```ignore
//! use core_playback::{SessionConfig, StemSession};
//!
//! let session = StemSession::new(
//!     SessionConfig::default(),
//!     "http://192.168.1.20:8000",
//!     http_client,
//!     player_factory,
//!     event_bus,
//! );
//!
//! if let Some(outcome) = session.pick_and_upload(picker.as_ref()).await? {
//!     println!("{:?}", outcome);
//!     session.toggle(1).await?; // drums
//! }
//! ```

pub mod config;
pub mod error;
pub mod players;
pub mod registry;
pub mod session;
pub mod stems;
pub mod time;
pub mod upload;

pub use config::{PlaybackPolicy, SessionConfig};
pub use error::{PlaybackError, Result, UploadError};
pub use players::{PlaybackSessionManager, PlayerPhase, StemView};
pub use registry::StemRegistry;
pub use session::{StemSession, UploadOutcome, UploadStatus};
pub use stems::{Stem, StemLayout, StemName, StemUrlMap};
pub use time::format_time;
pub use upload::{decode_stem_url, encode_stem_url, parse_stem_urls, UploadOrchestrator};
