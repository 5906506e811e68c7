//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! This crate provides implementations of the bridge traits that have a
//! sensible desktop default:
//! - `HttpClient` using `reqwest` (multipart uploads, single attempt)
//! - `FilePicker` over a list of pre-selected paths
//!
//! The audio engine is not provided here: hosts inject their own
//! `AudioPlayerFactory`.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{PathFilePicker, ReqwestHttpClient};
//!
//! #[tokio::main]
//! async fn main() {
//!     let http_client = ReqwestHttpClient::new();
//!     let picker = PathFilePicker::new(std::env::args().skip(1));
//!
//!     // Use in core configuration
//! }
//! ```

mod http;
mod picker;

pub use http::ReqwestHttpClient;
pub use picker::PathFilePicker;
