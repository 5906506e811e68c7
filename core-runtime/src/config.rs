//! # Core Configuration
//!
//! Builder-based configuration holding the separation backend location and
//! the host bridges the stem session depends on.
//!
//! ## Required
//!
//! - backend base URL (or the compile-time `BACKEND_URL` variable)
//! - `AudioPlayerFactory`: there is no built-in audio engine
//!
//! ## Optional (with platform defaults)
//!
//! - `HttpClient`: desktop default is reqwest when `desktop-shims` is enabled
//! - `FilePicker`: only needed for `pick_and_upload`
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .backend_url("http://192.168.1.20:8000")
//!     .player_factory(Arc::new(MyPlayerFactory))
//!     .build()?;
//! assert_eq!(config.backend_url, "http://192.168.1.20:8000");
//! ```
//!
//! Missing capabilities produce [`Error::CapabilityMissing`] with a message
//! naming what to inject:
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! CoreConfig::builder()
//!     .backend_url("http://localhost:8000")
//!     .build()
//!     .expect("no player factory");
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{AudioPlayerFactory, FilePicker, HttpClient};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Backend base URL baked in at build time, if any.
const BUILD_BACKEND_URL: Option<&str> = option_env!("BACKEND_URL");

/// Upper bound accepted for the event channel capacity.
const MAX_EVENT_BUFFER_SIZE: usize = 10_000;

/// Configuration for the stem-splitter core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Separation backend base URL, without a trailing slash.
    pub backend_url: String,

    pub http_client: Arc<dyn HttpClient>,

    pub player_factory: Arc<dyn AudioPlayerFactory>,

    pub file_picker: Option<Arc<dyn FilePicker>>,

    /// Overall limit for one separation request. `None` waits indefinitely.
    pub upload_timeout: Option<Duration>,

    /// Capacity of the broadcast channel carrying core events.
    pub event_buffer_size: usize,
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// This checks:
    /// - the backend URL uses http(s) and names a host
    /// - the upload timeout, when set, is non-zero
    /// - the event buffer size is within `1..=10_000`
    pub fn validate(&self) -> Result<()> {
        validate_backend_url(&self.backend_url)?;

        if self.upload_timeout == Some(Duration::ZERO) {
            return Err(Error::Config(
                "Upload timeout must be greater than zero. \
                 Omit .upload_timeout() to wait for the backend indefinitely."
                    .to_string(),
            ));
        }

        if self.event_buffer_size == 0 || self.event_buffer_size > MAX_EVENT_BUFFER_SIZE {
            return Err(Error::Config(format!(
                "Event buffer size must be between 1 and {}, got {}",
                MAX_EVENT_BUFFER_SIZE, self.event_buffer_size
            )));
        }

        Ok(())
    }
}

impl fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreConfig")
            .field("backend_url", &self.backend_url)
            .field("has_file_picker", &self.file_picker.is_some())
            .field("upload_timeout", &self.upload_timeout)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish_non_exhaustive()
    }
}

fn validate_backend_url(url: &str) -> Result<()> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| {
            Error::Config(format!(
                "Backend URL must start with http:// or https://, got '{}'",
                url
            ))
        })?;

    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() {
        return Err(Error::Config(format!("Backend URL '{}' has no host", url)));
    }

    if url.contains(['?', '#']) {
        return Err(Error::Config(format!(
            "Backend URL '{}' must not carry a query or fragment",
            url
        )));
    }

    Ok(())
}

fn player_factory_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "AudioPlayerFactory".to_string(),
        message: "An AudioPlayerFactory is required to play separated stems. \
                 Desktop: wrap the host audio engine and inject it with .player_factory(). \
                 Mobile: inject the platform media player (AVPlayer/ExoPlayer)."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(timeout: Option<Duration>) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = match timeout {
        Some(timeout) => ReqwestHttpClient::with_timeout(timeout),
        None => ReqwestHttpClient::new(),
    };
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(_timeout: Option<Duration>) -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "An HttpClient is required to reach the separation backend. \
                 Desktop: enable the 'desktop-shims' feature to use the default ReqwestHttpClient. \
                 Mobile: inject the platform HTTP stack (URLSession/OkHttp)."
            .to_string(),
    })
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    backend_url: Option<String>,
    http_client: Option<Arc<dyn HttpClient>>,
    player_factory: Option<Arc<dyn AudioPlayerFactory>>,
    file_picker: Option<Arc<dyn FilePicker>>,
    upload_timeout: Option<Duration>,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    /// Sets the separation backend base URL, e.g. `http://10.0.2.2:8000`.
    ///
    /// A trailing slash is dropped.
    pub fn backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend_url = Some(url.into());
        self
    }

    /// Sets the HTTP client used for uploads.
    ///
    /// If not provided, the reqwest-based client is used when the
    /// `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn player_factory(mut self, factory: Arc<dyn AudioPlayerFactory>) -> Self {
        self.player_factory = Some(factory);
        self
    }

    pub fn file_picker(mut self, picker: Arc<dyn FilePicker>) -> Self {
        self.file_picker = Some(picker);
        self
    }

    /// Bounds each separation request. Unset by default.
    pub fn upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = Some(timeout);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] when no backend URL is set (neither here nor via
    ///   `BACKEND_URL` at build time) or a value is invalid
    /// - [`Error::CapabilityMissing`] when the player factory is missing, or
    ///   the HTTP client is missing without `desktop-shims`
    pub fn build(self) -> Result<CoreConfig> {
        let backend_url = self
            .backend_url
            .or_else(|| BUILD_BACKEND_URL.map(str::to_string))
            .ok_or_else(|| {
                Error::Config(
                    "Backend URL is required. Use .backend_url() or set BACKEND_URL at build time."
                        .to_string(),
                )
            })?;
        let backend_url = backend_url.trim().trim_end_matches('/').to_string();

        let player_factory = self.player_factory.ok_or_else(player_factory_missing_error)?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client(self.upload_timeout)?,
        };

        let config = CoreConfig {
            backend_url,
            http_client,
            player_factory,
            file_picker: self.file_picker,
            upload_timeout: self.upload_timeout,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}
