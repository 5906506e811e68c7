//! End-to-end tests for the stem session
//!
//! This test suite drives `StemSession` through:
//! - Full, partial and failed separation responses
//! - Independent and exclusive stem playback
//! - Release, re-upload and stale status ticks
//! - A stuck upload superseded by a newer pick

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::picker::{FilePicker, PickedFile};
use bridge_traits::playback::{AudioPlayer, AudioPlayerFactory, PlayerStatus};
use bytes::Bytes;
use core_playback::{
    PlaybackError, PlaybackPolicy, PlayerPhase, SessionConfig, StemName, StemSession,
    UploadError, UploadOutcome, UploadStatus,
};
use core_runtime::events::{CoreEvent, EventBus, Receiver, StemEvent, UploadEvent};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};

const BACKEND: &str = "http://10.0.0.5:8000";

const FULL_RESPONSE: &str = r#"{
    "message": "File processed successfully!",
    "vocals_url": "http%3A%2F%2Fx%2Fv.mp3",
    "drums_url": "http%3A%2F%2Fx%2Fd.mp3",
    "bass_url": "http%3A%2F%2Fx%2Fb.mp3",
    "other_url": "http%3A%2F%2Fx%2Fo.mp3"
}"#;

const VOCALS: usize = 0;
const DRUMS: usize = 1;
const BASS: usize = 2;

// ============================================================================
// Fake Audio Player
// ============================================================================

/// Shared view into one fake player, kept by the factory for assertions.
struct PlayerSpy {
    status: watch::Sender<PlayerStatus>,
    url: Mutex<Option<String>>,
    calls: Mutex<Vec<String>>,
    released: Mutex<bool>,
}

impl PlayerSpy {
    fn confirm_load(&self, duration_ms: u64) {
        self.status.send_modify(|s| {
            s.is_loaded = true;
            s.duration_ms = duration_ms;
        });
    }

    fn tick(&self, position_ms: u64) {
        self.status.send_modify(|s| s.position_ms = position_ms);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn url(&self) -> Option<String> {
        self.url.lock().clone()
    }

    fn is_released(&self) -> bool {
        *self.released.lock()
    }
}

struct FakePlayer {
    spy: Arc<PlayerSpy>,
    auto_load_ms: Option<u64>,
    reject_containing: Option<String>,
    play_gate: Option<Arc<Notify>>,
}

#[async_trait]
impl AudioPlayer for FakePlayer {
    async fn load(&self, url: &str) -> BridgeResult<()> {
        if let Some(pattern) = &self.reject_containing {
            if url.contains(pattern.as_str()) {
                return Err(BridgeError::OperationFailed(format!("cannot decode {}", url)));
            }
        }
        *self.spy.url.lock() = Some(url.to_string());
        self.spy.calls.lock().push("load".to_string());
        if let Some(duration_ms) = self.auto_load_ms {
            self.spy.confirm_load(duration_ms);
        }
        Ok(())
    }

    async fn play(&self) -> BridgeResult<()> {
        if let Some(gate) = &self.play_gate {
            gate.notified().await;
        }
        self.spy.calls.lock().push("play".to_string());
        self.spy.status.send_modify(|s| s.is_playing = true);
        Ok(())
    }

    async fn pause(&self) -> BridgeResult<()> {
        self.spy.calls.lock().push("pause".to_string());
        self.spy.status.send_modify(|s| s.is_playing = false);
        Ok(())
    }

    async fn seek(&self, position_ms: u64) -> BridgeResult<()> {
        self.spy.calls.lock().push(format!("seek {}", position_ms));
        self.spy.status.send_modify(|s| s.position_ms = position_ms);
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<PlayerStatus> {
        self.spy.status.subscribe()
    }

    async fn release(&self) -> BridgeResult<()> {
        *self.spy.released.lock() = true;
        Ok(())
    }
}

struct FakePlayerFactory {
    spies: Mutex<Vec<Arc<PlayerSpy>>>,
    auto_load_ms: Option<u64>,
    reject_containing: Option<String>,
    play_gate: Option<Arc<Notify>>,
}

impl FakePlayerFactory {
    fn new() -> Self {
        Self {
            spies: Mutex::new(Vec::new()),
            auto_load_ms: Some(200_000),
            reject_containing: None,
            play_gate: None,
        }
    }

    /// Players wait for `PlayerSpy::confirm_load`.
    fn manual_load() -> Self {
        Self {
            auto_load_ms: None,
            ..Self::new()
        }
    }

    /// `play()` blocks until the gate is notified.
    fn gated(gate: Arc<Notify>) -> Self {
        Self {
            play_gate: Some(gate),
            ..Self::new()
        }
    }

    fn rejecting(pattern: &str) -> Self {
        Self {
            reject_containing: Some(pattern.to_string()),
            ..Self::new()
        }
    }

    fn spies(&self) -> Vec<Arc<PlayerSpy>> {
        self.spies.lock().clone()
    }

    fn created(&self) -> usize {
        self.spies.lock().len()
    }

    fn spy_for(&self, fragment: &str) -> Arc<PlayerSpy> {
        self.spies()
            .into_iter()
            .rev()
            .find(|p| p.url().is_some_and(|u| u.contains(fragment)))
            .expect("no player loaded that URL")
    }
}

#[async_trait]
impl AudioPlayerFactory for FakePlayerFactory {
    async fn create_player(&self) -> BridgeResult<Box<dyn AudioPlayer>> {
        let (status, _) = watch::channel(PlayerStatus::unloaded());
        let spy = Arc::new(PlayerSpy {
            status,
            url: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            released: Mutex::new(false),
        });
        self.spies.lock().push(Arc::clone(&spy));

        Ok(Box::new(FakePlayer {
            spy,
            auto_load_ms: self.auto_load_ms,
            reject_containing: self.reject_containing.clone(),
            play_gate: self.play_gate.clone(),
        }))
    }
}

// ============================================================================
// Scripted HTTP Client
// ============================================================================

enum Script {
    Respond(u16, &'static str),
    Fail(&'static str),
    /// Never answers.
    Hang,
}

#[derive(Default)]
struct ScriptedHttpClient {
    script: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttpClient {
    fn with(script: Vec<Script>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl HttpClient for ScriptedHttpClient {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        self.requests.lock().push(request);
        let next = self.script.lock().pop_front();

        match next {
            Some(Script::Respond(status, body)) => Ok(HttpResponse {
                status,
                headers: HashMap::new(),
                body: Bytes::from_static(body.as_bytes()),
            }),
            Some(Script::Fail(message)) => Err(BridgeError::OperationFailed(message.to_string())),
            Some(Script::Hang) => std::future::pending().await,
            None => Err(BridgeError::NotAvailable("script exhausted".to_string())),
        }
    }
}

struct StaticPicker(Mutex<Option<PickedFile>>);

#[async_trait]
impl FilePicker for StaticPicker {
    async fn pick_audio(&self) -> BridgeResult<Option<PickedFile>> {
        Ok(self.0.lock().take())
    }
}

// ============================================================================
// Helpers
// ============================================================================

struct Harness {
    session: Arc<StemSession>,
    http: Arc<ScriptedHttpClient>,
    players: Arc<FakePlayerFactory>,
    events: Receiver<CoreEvent>,
}

fn harness(config: SessionConfig, factory: FakePlayerFactory, script: Vec<Script>) -> Harness {
    let http = Arc::new(ScriptedHttpClient::with(script));
    let players = Arc::new(factory);
    let bus = Arc::new(EventBus::new(256));
    let events = bus.subscribe();
    let session = StemSession::new(config, BACKEND, http.clone(), players.clone(), bus);

    Harness {
        session: Arc::new(session),
        http,
        players,
        events,
    }
}

fn song() -> PickedFile {
    PickedFile::new("file:///music/song.mp3", "song.mp3")
}

/// Let spawned tasks run until they block.
async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

fn drain(events: &mut Receiver<CoreEvent>) -> Vec<CoreEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

// ============================================================================
// Upload Scenarios
// ============================================================================

#[tokio::test]
async fn test_full_response_binds_four_players() {
    let mut h = harness(
        SessionConfig::default(),
        FakePlayerFactory::new(),
        vec![Script::Respond(200, FULL_RESPONSE)],
    );

    let outcome = h.session.upload(song()).await.unwrap();

    assert_eq!(
        outcome,
        UploadOutcome::Ready {
            bound: vec![StemName::Vocals, StemName::Drums, StemName::Bass, StemName::Other],
            load_failed: vec![],
        }
    );
    assert_eq!(h.session.status().await, UploadStatus::Ready);
    assert!(h.session.all_ready().await);
    assert_eq!(h.players.created(), 4);
    assert_eq!(h.session.endpoint(), "http://10.0.0.5:8000/split");

    let urls: Vec<_> = h.players.spies().iter().filter_map(|p| p.url()).collect();
    assert_eq!(
        urls,
        ["http://x/v.mp3", "http://x/d.mp3", "http://x/b.mp3", "http://x/o.mp3"]
    );

    let views = h.session.views().await;
    assert_eq!(views.len(), 4);
    assert!(views.iter().all(|v| v.phase == PlayerPhase::Loaded));
    assert_eq!(views[0].label, "VOCALS");
    assert_eq!(views[0].duration_label, "3:20");

    let events = drain(&mut h.events);
    assert!(matches!(events.first(), Some(CoreEvent::Upload(UploadEvent::Started { .. }))));
    let bound = events
        .iter()
        .filter(|e| matches!(e, CoreEvent::Stem(StemEvent::Bound { .. })))
        .count();
    assert_eq!(bound, 4);
    assert!(events
        .iter()
        .any(|e| matches!(e, CoreEvent::Upload(UploadEvent::Completed { .. }))));
}

#[tokio::test]
async fn test_partial_response_shows_no_players() {
    let mut h = harness(
        SessionConfig::default(),
        FakePlayerFactory::new(),
        vec![Script::Respond(200, r#"{"vocals_url":"http%3A%2F%2Fx%2Fv.mp3"}"#)],
    );

    let outcome = h.session.upload(song()).await.unwrap();

    assert_eq!(
        outcome,
        UploadOutcome::Partial {
            missing: vec![StemName::Drums, StemName::Bass, StemName::Other],
        }
    );
    assert_eq!(h.session.status().await, UploadStatus::Idle);
    assert!(!h.session.status().await.is_busy());
    assert!(!h.session.all_ready().await);
    assert_eq!(h.players.created(), 0);

    let stems = h.session.stems().await;
    assert_eq!(stems[0].url.as_deref(), Some("http://x/v.mp3"));
    assert!(stems[1].url.is_none());

    assert!(drain(&mut h.events).iter().any(|e| matches!(
        e,
        CoreEvent::Upload(UploadEvent::Partial { missing, .. }) if missing.len() == 3
    )));
}

#[tokio::test]
async fn test_http_error_marks_session_failed() {
    let mut h = harness(
        SessionConfig::default(),
        FakePlayerFactory::new(),
        vec![Script::Respond(500, r#"{"detail":"out of memory"}"#)],
    );

    let err = h.session.upload(song()).await.unwrap_err();

    assert!(matches!(
        err,
        PlaybackError::Upload(UploadError::HttpStatus { status: 500, .. })
    ));
    assert!(matches!(h.session.status().await, UploadStatus::Failed { .. }));
    assert_eq!(h.players.created(), 0);
    assert!(drain(&mut h.events)
        .iter()
        .any(|e| matches!(e, CoreEvent::Upload(UploadEvent::Failed { .. }))));
}

#[tokio::test]
async fn test_network_failure_is_recoverable_by_reupload() {
    let h = harness(
        SessionConfig::default(),
        FakePlayerFactory::new(),
        vec![
            Script::Fail("connection refused"),
            Script::Respond(200, FULL_RESPONSE),
        ],
    );

    let err = h.session.upload(song()).await.unwrap_err();
    assert!(err.is_transient());

    h.session.upload(song()).await.unwrap();
    assert_eq!(h.session.status().await, UploadStatus::Ready);
    assert_eq!(h.http.request_count(), 2);
}

#[tokio::test]
async fn test_cancelled_pick_is_a_no_op() {
    let h = harness(SessionConfig::default(), FakePlayerFactory::new(), vec![]);
    let picker = StaticPicker(Mutex::new(None));

    assert_eq!(h.session.pick_and_upload(&picker).await.unwrap(), None);
    assert_eq!(h.session.status().await, UploadStatus::Idle);
    assert_eq!(h.http.request_count(), 0);
}

#[tokio::test]
async fn test_pick_and_upload_records_picked_file() {
    let h = harness(
        SessionConfig::default(),
        FakePlayerFactory::new(),
        vec![Script::Respond(200, FULL_RESPONSE)],
    );
    let picker = StaticPicker(Mutex::new(Some(song())));

    let outcome = h.session.pick_and_upload(&picker).await.unwrap();

    assert!(matches!(outcome, Some(UploadOutcome::Ready { .. })));
    assert_eq!(h.session.picked_file().await, Some(song()));
}

#[tokio::test]
async fn test_two_stem_layout() {
    let h = harness(
        SessionConfig::two_stems(),
        FakePlayerFactory::new(),
        vec![Script::Respond(
            200,
            r#"{"vocals_url":"http://x/v.mp3","instrumental_url":"http://x/no_vocals.mp3"}"#,
        )],
    );

    h.session.upload(song()).await.unwrap();

    let views = h.session.views().await;
    let names: Vec<_> = views.iter().map(|v| v.name).collect();
    assert_eq!(names, vec![StemName::Vocals, StemName::Instrumental]);
    assert_eq!(h.players.created(), 2);
}

#[tokio::test]
async fn test_bind_on_demand_when_disabled() {
    let mut config = SessionConfig::default();
    config.bind_on_ready = false;
    let h = harness(
        config,
        FakePlayerFactory::new(),
        vec![Script::Respond(200, FULL_RESPONSE)],
    );

    h.session.upload(song()).await.unwrap();
    assert_eq!(h.players.created(), 0);
    assert!(h.session.toggle(DRUMS).await.unwrap_err().is_not_bound());

    assert!(h.session.ensure_bound(DRUMS).await.unwrap());
    assert!(!h.session.ensure_bound(DRUMS).await.unwrap());
    assert_eq!(h.players.created(), 1);
    assert!(h.session.toggle(DRUMS).await.unwrap());
}

// ============================================================================
// Playback Scenarios
// ============================================================================

#[tokio::test]
async fn test_stems_play_concurrently_by_default() {
    let h = harness(
        SessionConfig::default(),
        FakePlayerFactory::new(),
        vec![Script::Respond(200, FULL_RESPONSE)],
    );
    h.session.upload(song()).await.unwrap();

    assert!(h.session.toggle(DRUMS).await.unwrap());
    assert!(h.session.toggle(VOCALS).await.unwrap());

    let views = h.session.views().await;
    assert!(views[DRUMS].is_playing);
    assert!(views[VOCALS].is_playing);
    assert!(!views[BASS].is_playing);
    assert_eq!(h.session.active_stem().await, Some(StemName::Vocals));

    // Pausing drums leaves vocals alone.
    assert!(!h.session.toggle(DRUMS).await.unwrap());
    let views = h.session.views().await;
    assert!(!views[DRUMS].is_playing);
    assert_eq!(views[DRUMS].phase, PlayerPhase::Paused);
    assert!(views[VOCALS].is_playing);
}

#[tokio::test]
async fn test_exclusive_policy_pauses_previous_stem() {
    let h = harness(
        SessionConfig::default().with_policy(PlaybackPolicy::Exclusive),
        FakePlayerFactory::new(),
        vec![Script::Respond(200, FULL_RESPONSE)],
    );
    h.session.upload(song()).await.unwrap();

    h.session.toggle(DRUMS).await.unwrap();
    h.session.toggle(VOCALS).await.unwrap();

    let views = h.session.views().await;
    assert!(!views[DRUMS].is_playing);
    assert!(views[VOCALS].is_playing);
    assert_eq!(h.players.spy_for("/d.mp3").calls(), ["load", "play", "pause"]);
}

#[tokio::test]
async fn test_transport_requires_loaded_player() {
    let h = harness(
        SessionConfig::default(),
        FakePlayerFactory::manual_load(),
        vec![Script::Respond(200, FULL_RESPONSE)],
    );
    h.session.upload(song()).await.unwrap();
    assert_eq!(h.session.view(BASS).await.unwrap().phase, PlayerPhase::Loading);

    let err = h.session.toggle(BASS).await.unwrap_err();
    assert!(matches!(err, PlaybackError::NotLoaded(StemName::Bass)));
    assert!(h.session.seek(BASS, 1_000).await.is_err());

    h.players.spy_for("/b.mp3").confirm_load(90_000);
    assert_eq!(h.session.seek(BASS, 1_000).await.unwrap(), 1_000);
    assert!(h.session.toggle(BASS).await.unwrap());
}

#[tokio::test]
async fn test_slider_drag_seeks_once() {
    let h = harness(
        SessionConfig::default(),
        FakePlayerFactory::new(),
        vec![Script::Respond(200, FULL_RESPONSE)],
    );
    h.session.upload(song()).await.unwrap();

    h.session.begin_scrub(VOCALS, 5_000).await.unwrap();
    for position in [10_000, 20_000, 30_000, 65_000] {
        h.session.update_scrub(VOCALS, position).await.unwrap();
    }
    assert_eq!(h.session.view(VOCALS).await.unwrap().slider_value_ms, 65_000);

    assert_eq!(h.session.end_scrub(VOCALS).await.unwrap(), Some(65_000));

    let spy = h.players.spy_for("/v.mp3");
    let seeks: Vec<_> = spy
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("seek"))
        .collect();
    assert_eq!(seeks, ["seek 65000"]);
    assert_eq!(h.session.view(VOCALS).await.unwrap().position_label, "1:05");
}

#[tokio::test]
async fn test_per_stem_load_failure_is_isolated() {
    let mut h = harness(
        SessionConfig::default(),
        FakePlayerFactory::rejecting("/b.mp3"),
        vec![Script::Respond(200, FULL_RESPONSE)],
    );

    let outcome = h.session.upload(song()).await.unwrap();

    assert_eq!(
        outcome,
        UploadOutcome::Ready {
            bound: vec![StemName::Vocals, StemName::Drums, StemName::Other],
            load_failed: vec![StemName::Bass],
        }
    );
    assert_eq!(h.session.view(BASS).await.unwrap().phase, PlayerPhase::Unbound);
    assert!(h.session.toggle(BASS).await.unwrap_err().is_not_bound());
    assert!(h.session.toggle(DRUMS).await.unwrap());

    assert!(drain(&mut h.events).iter().any(|e| matches!(
        e,
        CoreEvent::Stem(StemEvent::LoadFailed { stem, .. }) if stem == "bass"
    )));
}

#[tokio::test]
async fn test_status_ticks_reach_views_and_events() {
    let mut h = harness(
        SessionConfig::default(),
        FakePlayerFactory::new(),
        vec![Script::Respond(200, FULL_RESPONSE)],
    );
    h.session.upload(song()).await.unwrap();
    drain(&mut h.events);

    h.players.spy_for("/d.mp3").tick(42_000);

    // Earlier load confirmations may still be queued ahead of the tick.
    let generation = tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            if let Ok(CoreEvent::Stem(StemEvent::StatusChanged {
                stem,
                generation,
                position_ms: 42_000,
                ..
            })) = h.events.recv().await
            {
                if stem == "drums" {
                    return generation;
                }
            }
        }
    })
    .await
    .expect("status tick was not forwarded");

    assert_eq!(generation, h.session.generation().await);
    assert_eq!(h.session.view(DRUMS).await.unwrap().position_label, "0:42");
}

// ============================================================================
// Release & Generations
// ============================================================================

#[tokio::test]
async fn test_release_all_then_transport_is_not_bound() {
    let h = harness(
        SessionConfig::default(),
        FakePlayerFactory::new(),
        vec![Script::Respond(200, FULL_RESPONSE)],
    );
    h.session.upload(song()).await.unwrap();
    h.session.toggle(DRUMS).await.unwrap();

    assert_eq!(h.session.release_all().await, 4);
    assert!(h.players.spies().iter().all(|p| p.is_released()));

    for index in 0..4 {
        assert!(h.session.toggle(index).await.unwrap_err().is_not_bound());
        assert!(h.session.seek(index, 0).await.unwrap_err().is_not_bound());
    }
    assert_eq!(h.session.view(DRUMS).await.unwrap().phase, PlayerPhase::Released);

    // Re-binding is allowed; URLs survive a release.
    assert!(h.session.ensure_bound(DRUMS).await.unwrap());
}

#[tokio::test]
async fn test_reupload_releases_previous_generation_first() {
    let h = harness(
        SessionConfig::default(),
        FakePlayerFactory::new(),
        vec![
            Script::Respond(200, FULL_RESPONSE),
            Script::Respond(200, r#"{"vocals_url":"http://y/v2.mp3"}"#),
        ],
    );
    h.session.upload(song()).await.unwrap();
    let first_generation = h.players.spies();
    let old_drums = h.players.spy_for("/d.mp3");
    let generation = h.session.generation().await;

    h.session.upload(song()).await.unwrap();

    assert!(first_generation.iter().all(|p| p.is_released()));
    assert_eq!(h.session.generation().await, generation + 1);
    assert!(!h.session.all_ready().await);

    // A late tick from a released player changes nothing.
    old_drums.tick(77_000);
    tokio::task::yield_now().await;
    let view = h.session.view(DRUMS).await.unwrap();
    assert_eq!(view.phase, PlayerPhase::Released);
    assert_eq!(view.position_ms, 0);
}

#[tokio::test]
async fn test_shutdown_releases_and_clears() {
    let h = harness(
        SessionConfig::default(),
        FakePlayerFactory::new(),
        vec![Script::Respond(200, FULL_RESPONSE)],
    );
    h.session.upload(song()).await.unwrap();

    h.session.shutdown().await;

    assert!(h.players.spies().iter().all(|p| p.is_released()));
    assert_eq!(h.session.status().await, UploadStatus::Idle);
    assert!(h.session.stems().await.iter().all(|s| s.url.is_none()));
    assert_eq!(h.session.picked_file().await, None);
}

// ============================================================================
// Stuck & Superseded Uploads
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_stuck_upload_blocks_readiness_until_superseded() {
    let mut h = harness(
        SessionConfig::default(),
        FakePlayerFactory::new(),
        vec![Script::Hang, Script::Respond(200, FULL_RESPONSE)],
    );

    let session = Arc::clone(&h.session);
    let stuck = tokio::spawn(async move { session.upload(song()).await });

    // Let the stuck request reach the HTTP client.
    while h.http.request_count() == 0 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert!(!stuck.is_finished());
    assert_eq!(h.session.status().await, UploadStatus::Uploading);
    assert!(!h.session.all_ready().await);

    let outcome = h.session.upload(song()).await.unwrap();
    assert!(matches!(outcome, UploadOutcome::Ready { .. }));

    let stale = stuck.await.unwrap().unwrap_err();
    assert!(stale.is_superseded());
    assert_eq!(h.session.status().await, UploadStatus::Ready);
    assert_eq!(h.players.created(), 4);

    assert!(drain(&mut h.events)
        .iter()
        .any(|e| matches!(e, CoreEvent::Upload(UploadEvent::Superseded { .. }))));
}

#[tokio::test(start_paused = true)]
async fn test_upload_timeout_fails_stuck_request() {
    let h = harness(SessionConfig::default(), FakePlayerFactory::new(), vec![Script::Hang]);
    let session = Arc::try_unwrap(h.session)
        .ok()
        .expect("single owner")
        .with_upload_timeout(Some(Duration::from_secs(120)));

    let err = session.upload(song()).await.unwrap_err();

    assert!(matches!(err, PlaybackError::Upload(UploadError::TimedOut(_))));
    assert!(matches!(session.status().await, UploadStatus::Failed { .. }));
}

#[tokio::test]
async fn test_upload_superseded_while_waiting_never_starts() {
    let gate = Arc::new(Notify::new());
    let mut h = harness(
        SessionConfig::default(),
        FakePlayerFactory::gated(Arc::clone(&gate)),
        vec![
            Script::Respond(200, FULL_RESPONSE),
            Script::Respond(200, FULL_RESPONSE),
        ],
    );
    h.session.upload(song()).await.unwrap();
    drain(&mut h.events);

    // Hold the session lock inside a transport call.
    let session = Arc::clone(&h.session);
    let toggle = tokio::spawn(async move { session.toggle(DRUMS).await });
    settle().await;

    let session = Arc::clone(&h.session);
    let waiting = tokio::spawn(async move {
        session
            .upload(PickedFile::new("file:///music/first.mp3", "first.mp3"))
            .await
    });
    settle().await;

    let session = Arc::clone(&h.session);
    let newest = tokio::spawn(async move { session.upload(song()).await });
    settle().await;

    gate.notify_one();
    assert!(toggle.await.unwrap().unwrap());
    assert!(waiting.await.unwrap().unwrap_err().is_superseded());
    assert!(matches!(
        newest.await.unwrap().unwrap(),
        UploadOutcome::Ready { .. }
    ));

    let events = drain(&mut h.events);
    let superseded: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            CoreEvent::Upload(UploadEvent::Superseded { upload_id }) => Some(upload_id.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(superseded.len(), 1);

    let started: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            CoreEvent::Upload(UploadEvent::Started { upload_id, file_name }) => {
                Some((upload_id.clone(), file_name.clone()))
            }
            _ => None,
        })
        .collect();
    assert_eq!(started.len(), 1);
    assert_ne!(started[0].0, superseded[0]);
    assert_eq!(started[0].1, "song.mp3");
    assert_eq!(h.session.picked_file().await, Some(song()));
    assert_eq!(h.http.request_count(), 2);
}
