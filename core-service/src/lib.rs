//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (HTTP, audio player,
//! file picker) into a [`StemSession`]. Desktop apps typically enable the
//! `desktop-shims` feature (which depends on `bridge-desktop`) and call
//! [`bootstrap_desktop`]; mobile hosts build a [`CoreConfig`] with their own
//! bridges and call [`CoreService::new`].

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use core_playback::{SessionConfig, StemSession, UploadOutcome};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, EventStream, Receiver};
use tracing::info;

#[cfg(feature = "desktop-shims")]
use bridge_traits::playback::AudioPlayerFactory;

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    config: Arc<CoreConfig>,
    events: Arc<EventBus>,
    session: Arc<StemSession>,
}

impl CoreService {
    /// Create a new service from validated bridges and session settings.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Runtime`] when `config` fails validation
    /// - [`CoreError::CapabilityMissing`] when a required bridge is absent
    /// - [`CoreError::InitializationFailed`] when `session` is invalid
    pub fn new(config: CoreConfig, session: SessionConfig) -> Result<Self> {
        config.validate().map_err(from_runtime)?;
        session
            .validate()
            .map_err(CoreError::InitializationFailed)?;

        let events = Arc::new(EventBus::new(config.event_buffer_size));
        let stem_session = StemSession::new(
            session,
            &config.backend_url,
            Arc::clone(&config.http_client),
            Arc::clone(&config.player_factory),
            Arc::clone(&events),
        )
        .with_upload_timeout(config.upload_timeout);

        info!(
            endpoint = stem_session.endpoint(),
            layout = ?stem_session.config().layout,
            policy = ?stem_session.config().playback_policy,
            "Core service initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            events,
            session: Arc::new(stem_session),
        })
    }

    /// Like [`CoreService::new`], reading session settings from a JSON
    /// document. Missing keys take their defaults.
    pub fn with_settings_json(config: CoreConfig, settings: &str) -> Result<Self> {
        Self::new(config, parse_session_config(settings)?)
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// The stem session driven by this service.
    pub fn session(&self) -> Arc<StemSession> {
        Arc::clone(&self.session)
    }

    pub fn subscribe_events(&self) -> Receiver<CoreEvent> {
        self.events.subscribe()
    }

    /// Event stream helper for hosts that only care about some events.
    pub fn event_stream(&self) -> EventStream {
        EventStream::new(self.events.subscribe())
    }

    /// Run the configured file picker and upload the chosen file.
    ///
    /// Returns `Ok(None)` when the user dismissed the picker.
    ///
    /// # Errors
    ///
    /// - [`CoreError::CapabilityMissing`] when no file picker was configured
    /// - [`CoreError::Playback`] when picking or uploading fails
    pub async fn pick_and_upload(&self) -> Result<Option<UploadOutcome>> {
        let picker = self
            .config
            .file_picker
            .as_ref()
            .ok_or_else(|| CoreError::CapabilityMissing {
                capability: "FilePicker".to_string(),
                message: "Inject a FilePicker with CoreConfig::builder().file_picker(), \
                          or pass the file to StemSession::upload directly."
                    .to_string(),
            })?;

        Ok(self.session.pick_and_upload(picker.as_ref()).await?)
    }

    /// Cancel any in-flight upload and release every player.
    pub async fn shutdown(&self) {
        self.session.shutdown().await;
    }
}

/// Parse session settings from JSON.
pub fn parse_session_config(settings: &str) -> Result<SessionConfig> {
    serde_json::from_str(settings)
        .map_err(|e| CoreError::InitializationFailed(format!("Invalid session settings: {}", e)))
}

/// Surface a missing bridge as a façade-level capability error.
fn from_runtime(err: core_runtime::Error) -> CoreError {
    match err {
        core_runtime::Error::CapabilityMissing {
            capability,
            message,
        } => CoreError::CapabilityMissing {
            capability,
            message,
        },
        other => CoreError::Runtime(other),
    }
}

/// Convenience bootstrapper for desktop hosts.
///
/// Uses the reqwest HTTP client and a picker over `paths` (for example the
/// command-line arguments). The audio engine still comes from the host.
///
/// ```ignore
/// use core_service::bootstrap_desktop;
///
/// let core = bootstrap_desktop("http://127.0.0.1:8000", engine, std::env::args().skip(1))?;
/// let outcome = core.pick_and_upload().await?;
/// ```
#[cfg(feature = "desktop-shims")]
pub fn bootstrap_desktop<I, P>(
    backend_url: &str,
    player_factory: Arc<dyn AudioPlayerFactory>,
    paths: I,
) -> Result<CoreService>
where
    I: IntoIterator<Item = P>,
    P: Into<std::path::PathBuf>,
{
    let picker = bridge_desktop::PathFilePicker::new(paths);
    let config = CoreConfig::builder()
        .backend_url(backend_url)
        .player_factory(player_factory)
        .file_picker(Arc::new(picker))
        .build()
        .map_err(from_runtime)?;

    CoreService::new(config, SessionConfig::default())
}
