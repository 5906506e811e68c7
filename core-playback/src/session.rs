//! # Stem Session
//!
//! The upload state machine: tracks the in-flight separation request, feeds
//! the response into the [`StemRegistry`], binds players through the
//! [`PlaybackSessionManager`] and pumps every player's status feed into the
//! session state and the event bus.
//!
//! ```text
//!            upload()                 all stems resolved
//!   Idle ─────────────> Uploading ───────────────────────> Ready
//!    ^                     │   │
//!    │  partial response   │   │ network / status / body error
//!    └─────────────────────┘   └──────────────────────────> Failed
//! ```
//!
//! Before a new upload starts, every player of the previous generation is
//! released and the registry is cleared, in that order and under the session
//! lock. A second `upload()` supersedes the first: the older request is
//! cancelled and its result, if it still arrives, is dropped.

use crate::config::SessionConfig;
use crate::error::{Result, UploadError};
use crate::players::{PlaybackSessionManager, StemView};
use crate::registry::StemRegistry;
use crate::stems::{Stem, StemName};
use crate::upload::UploadOrchestrator;
use bridge_traits::picker::{FilePicker, PickedFile};
use bridge_traits::playback::AudioPlayerFactory;
use bridge_traits::HttpClient;
use core_runtime::events::{CoreEvent, EventBus, Receiver, StemEvent, UploadEvent};
use core_runtime::logging::strip_path;
use serde::Serialize;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Upload lifecycle as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UploadStatus {
    /// Nothing in flight. Also the state after a partial response.
    Idle,
    Uploading,
    /// Every expected stem has a URL.
    Ready,
    Failed { reason: String },
}

impl UploadStatus {
    /// Whether the loading indicator should be shown.
    pub fn is_busy(&self) -> bool {
        matches!(self, UploadStatus::Uploading)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, UploadStatus::Ready)
    }
}

/// Result of a completed upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Every stem resolved. `load_failed` lists stems whose player could not
    /// be bound; the others are playable.
    Ready {
        bound: Vec<StemName>,
        load_failed: Vec<StemName>,
    },
    /// The backend left some stems unresolved; no players are shown.
    Partial { missing: Vec<StemName> },
}

struct SessionState {
    status: UploadStatus,
    picked_file: Option<PickedFile>,
    registry: StemRegistry,
    players: PlaybackSessionManager,
    pumps: Vec<JoinHandle<()>>,
}

impl SessionState {
    /// Stop status pumps and release every player.
    async fn release_players(&mut self) -> usize {
        for pump in self.pumps.drain(..) {
            pump.abort();
        }
        self.players.release_all().await
    }
}

struct InFlight {
    id: Uuid,
    token: CancellationToken,
}

pub struct StemSession {
    config: SessionConfig,
    orchestrator: UploadOrchestrator,
    state: Arc<Mutex<SessionState>>,
    events: Arc<EventBus>,
    in_flight: parking_lot::Mutex<Option<InFlight>>,
}

impl StemSession {
    /// `backend_url` is the separation service base URL; the endpoint path
    /// comes from `config`.
    pub fn new(
        config: SessionConfig,
        backend_url: &str,
        http: Arc<dyn HttpClient>,
        player_factory: Arc<dyn AudioPlayerFactory>,
        events: Arc<EventBus>,
    ) -> Self {
        let endpoint = format!(
            "{}/{}",
            backend_url.trim_end_matches('/'),
            config.endpoint_path.trim_start_matches('/')
        );
        let orchestrator = UploadOrchestrator::new(http, endpoint, config.layout)
            .with_field(config.upload_field.clone());

        let state = SessionState {
            status: UploadStatus::Idle,
            picked_file: None,
            registry: StemRegistry::new(config.layout),
            players: PlaybackSessionManager::new(
                player_factory,
                config.layout,
                config.playback_policy,
            ),
            pumps: Vec::new(),
        };

        Self {
            config,
            orchestrator,
            state: Arc::new(Mutex::new(state)),
            events,
            in_flight: parking_lot::Mutex::new(None),
        }
    }

    /// Bound every separation request. `None` waits indefinitely.
    pub fn with_upload_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.orchestrator.set_timeout(timeout);
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn endpoint(&self) -> &str {
        self.orchestrator.endpoint()
    }

    pub fn subscribe_events(&self) -> Receiver<CoreEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: CoreEvent) {
        // No subscribers is fine.
        self.events.emit(event).ok();
    }

    // ========================================================================
    // Upload
    // ========================================================================

    /// Ask `picker` for a file and upload it.
    ///
    /// Returns `Ok(None)` when the user dismissed the picker; the session is
    /// left untouched.
    pub async fn pick_and_upload(&self, picker: &dyn FilePicker) -> Result<Option<UploadOutcome>> {
        match picker.pick_audio().await? {
            Some(file) => self.upload(file).await.map(Some),
            None => {
                debug!("File pick cancelled");
                Ok(None)
            }
        }
    }

    /// Release the current generation, upload `file` and bind the new stems.
    ///
    /// # Errors
    ///
    /// - [`PlaybackError::Upload`](crate::PlaybackError::Upload) when the request fails; the session is
    ///   then [`UploadStatus::Failed`]
    /// - [`UploadError::Superseded`] (wrapped) when a newer upload started
    ///   before this one finished; the session state belongs to the newer one
    #[instrument(skip(self, file), fields(file = %strip_path(&file.name)))]
    pub async fn upload(&self, file: PickedFile) -> Result<UploadOutcome> {
        let upload_id = Uuid::new_v4();
        let token = CancellationToken::new();

        let previous = self.in_flight.lock().replace(InFlight {
            id: upload_id,
            token: token.clone(),
        });
        if let Some(previous) = previous {
            previous.token.cancel();
            info!(superseded = %previous.id, "Superseding in-flight upload");
            self.emit(CoreEvent::Upload(UploadEvent::Superseded {
                upload_id: previous.id.to_string(),
            }));
        }

        {
            let mut state = self.state.lock().await;
            // A newer upload may have started while this one waited.
            if token.is_cancelled() {
                debug!(%upload_id, "Superseded before start");
                return Err(UploadError::Superseded.into());
            }
            let released = state.release_players().await;
            if released > 0 {
                self.emit(CoreEvent::Stem(StemEvent::Released {
                    generation: state.players.generation(),
                }));
            }
            state.registry.reset();
            state.status = UploadStatus::Uploading;
            state.picked_file = Some(file.clone());
        }

        self.emit(CoreEvent::Upload(UploadEvent::Started {
            upload_id: upload_id.to_string(),
            file_name: file.name.clone(),
        }));

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => Err(UploadError::Superseded),
            result = self.orchestrator.submit(&file) => result,
        };

        let mut state = self.state.lock().await;
        if token.is_cancelled() {
            debug!(%upload_id, "Dropping result of superseded upload");
            return Err(UploadError::Superseded.into());
        }
        self.finish_in_flight(upload_id);

        let map = match result {
            Ok(map) => map,
            Err(e) => {
                error!(%upload_id, error = %e, "Upload failed");
                state.status = UploadStatus::Failed {
                    reason: e.to_string(),
                };
                self.emit(CoreEvent::Upload(UploadEvent::Failed {
                    upload_id: upload_id.to_string(),
                    message: e.to_string(),
                }));
                return Err(e.into());
            }
        };

        state.registry.apply_urls(&map)?;

        if !state.registry.all_ready() {
            let missing = state.registry.missing();
            warn!(%upload_id, ?missing, "Separation incomplete; players hidden");
            state.status = UploadStatus::Idle;
            self.emit(CoreEvent::Upload(UploadEvent::Partial {
                upload_id: upload_id.to_string(),
                missing: missing.iter().map(ToString::to_string).collect(),
            }));
            return Ok(UploadOutcome::Partial { missing });
        }

        state.status = UploadStatus::Ready;
        let mut bound = Vec::new();
        let mut load_failed = Vec::new();
        if self.config.bind_on_ready {
            for index in 0..state.registry.len() {
                let name = state.players.name(index)?;
                match self.bind(&mut state, index).await {
                    Ok(_) => bound.push(name),
                    Err(_) => load_failed.push(name),
                }
            }
        }

        info!(%upload_id, bound = bound.len(), failed = load_failed.len(), "Stems ready");
        self.emit(CoreEvent::Upload(UploadEvent::Completed {
            upload_id: upload_id.to_string(),
            stems: state
                .registry
                .stems()
                .iter()
                .map(|stem| stem.name.to_string())
                .collect(),
        }));

        Ok(UploadOutcome::Ready { bound, load_failed })
    }

    fn finish_in_flight(&self, upload_id: Uuid) {
        let mut in_flight = self.in_flight.lock();
        if in_flight.as_ref().is_some_and(|current| current.id == upload_id) {
            *in_flight = None;
        }
    }

    // ========================================================================
    // Binding
    // ========================================================================

    /// Bind one stem and start pumping its status feed.
    async fn bind(&self, state: &mut SessionState, index: usize) -> Result<bool> {
        let name = state.players.name(index)?;
        let url = state.registry.url(index)?.map(str::to_string);

        match state.players.ensure_bound(index, url.as_deref()).await {
            Ok(false) => Ok(false),
            Ok(true) => {
                let pump = self.spawn_status_pump(state, index)?;
                state.pumps.push(pump);
                self.emit(CoreEvent::Stem(StemEvent::Bound {
                    stem: name.to_string(),
                    generation: state.players.generation(),
                }));
                Ok(true)
            }
            Err(e) => {
                warn!(stem = %name, error = %e, "Stem failed to load");
                self.emit(CoreEvent::Stem(StemEvent::LoadFailed {
                    stem: name.to_string(),
                    message: e.to_string(),
                }));
                Err(e)
            }
        }
    }

    /// Forward every tick of a stem's status feed into the session state.
    ///
    /// The task ends when the player is released, its generation is retired,
    /// or the session is dropped.
    fn spawn_status_pump(&self, state: &SessionState, index: usize) -> Result<JoinHandle<()>> {
        let name = state.players.name(index)?;
        let (generation, mut status_rx) = state.players.subscribe(index)?;
        let shared: Weak<Mutex<SessionState>> = Arc::downgrade(&self.state);
        let events = Arc::clone(&self.events);

        Ok(tokio::spawn(async move {
            while status_rx.changed().await.is_ok() {
                let status = *status_rx.borrow_and_update();
                let Some(state) = shared.upgrade() else {
                    break;
                };
                if !state.lock().await.players.apply_status(index, generation, status) {
                    break;
                }
                events
                    .emit(CoreEvent::Stem(StemEvent::StatusChanged {
                        stem: name.to_string(),
                        generation,
                        is_loaded: status.is_loaded,
                        is_playing: status.is_playing,
                        position_ms: status.position_ms,
                        duration_ms: status.duration_ms,
                    }))
                    .ok();
            }
            debug!(stem = %name, generation, "Status pump stopped");
        }))
    }

    /// Bind a stem on demand. Idempotent; returns whether a player was created.
    pub async fn ensure_bound(&self, index: usize) -> Result<bool> {
        let mut state = self.state.lock().await;
        self.bind(&mut state, index).await
    }

    // ========================================================================
    // Transport
    // ========================================================================

    /// Play or pause one stem. Returns whether it was asked to play.
    pub async fn toggle(&self, index: usize) -> Result<bool> {
        self.state.lock().await.players.toggle(index).await
    }

    pub async fn seek(&self, index: usize, position_ms: u64) -> Result<u64> {
        self.state.lock().await.players.seek(index, position_ms).await
    }

    pub async fn begin_scrub(&self, index: usize, position_ms: u64) -> Result<()> {
        self.state.lock().await.players.begin_scrub(index, position_ms)
    }

    pub async fn update_scrub(&self, index: usize, position_ms: u64) -> Result<()> {
        self.state.lock().await.players.update_scrub(index, position_ms)
    }

    /// Slider released: one seek to the final drag position.
    pub async fn end_scrub(&self, index: usize) -> Result<Option<u64>> {
        self.state.lock().await.players.end_scrub(index).await
    }

    pub async fn cancel_scrub(&self, index: usize) -> Result<()> {
        self.state.lock().await.players.cancel_scrub(index)
    }

    /// Release every player. Stem URLs are kept so stems can be re-bound.
    pub async fn release_all(&self) -> usize {
        let mut state = self.state.lock().await;
        let released = state.release_players().await;
        self.emit(CoreEvent::Stem(StemEvent::Released {
            generation: state.players.generation(),
        }));
        released
    }

    /// Cancel any in-flight upload, release all players and clear the stems.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        if let Some(in_flight) = self.in_flight.lock().take() {
            in_flight.token.cancel();
        }

        let mut state = self.state.lock().await;
        let released = state.release_players().await;
        state.registry.reset();
        state.status = UploadStatus::Idle;
        state.picked_file = None;
        info!(released, "Stem session shut down");
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub async fn status(&self) -> UploadStatus {
        self.state.lock().await.status.clone()
    }

    /// The gate for showing the players.
    pub async fn all_ready(&self) -> bool {
        self.state.lock().await.registry.all_ready()
    }

    pub async fn stems(&self) -> Vec<Stem> {
        self.state.lock().await.registry.stems().to_vec()
    }

    pub async fn picked_file(&self) -> Option<PickedFile> {
        self.state.lock().await.picked_file.clone()
    }

    pub async fn views(&self) -> Vec<StemView> {
        self.state.lock().await.players.views()
    }

    pub async fn view(&self, index: usize) -> Result<StemView> {
        self.state.lock().await.players.view(index)
    }

    pub async fn active_stem(&self) -> Option<StemName> {
        self.state.lock().await.players.active_stem()
    }

    /// Player generation; advances every time players are released.
    pub async fn generation(&self) -> u64 {
        self.state.lock().await.players.generation()
    }
}

impl Drop for StemSession {
    fn drop(&mut self) {
        if let Some(in_flight) = self.in_flight.get_mut().take() {
            in_flight.token.cancel();
        }
    }
}
