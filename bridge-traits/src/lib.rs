//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the stem-splitter core and
//! platform-specific implementations. Each trait represents a capability that
//! the core requires but that must be implemented differently per platform
//! (desktop, iOS, Android).
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Async HTTP operations with multipart uploads
//!
//! ### Media
//! - [`AudioPlayer`](playback::AudioPlayer) - One native player per remote stem
//! - [`AudioPlayerFactory`](playback::AudioPlayerFactory) - Allocates players on demand
//! - [`FilePicker`](picker::FilePicker) - Native document picker restricted to audio
//!
//! ### Utilities
//! - [`LoggerSink`](log::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | HTTP + picker; audio engine injected by host |
//! | iOS      | TBD                 | Planned |
//! | Android  | TBD                 | Planned |
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type for consistent
//! error handling. Platform implementations should:
//!
//! - Convert platform-specific errors to `BridgeError`
//! - Provide actionable error messages
//! - Include error context (e.g., file paths, URLs)
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds to support safe concurrent usage
//! across async tasks.

pub mod error;
pub mod http;
pub mod log;
pub mod picker;
pub mod playback;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, MultipartForm, MultipartPart};
pub use log::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use picker::{audio_mime_type, FilePicker, PickedFile};
pub use playback::{AudioPlayer, AudioPlayerFactory, PlayerStatus};
