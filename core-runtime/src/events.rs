//! # Event Bus
//!
//! Typed events broadcast to host UIs over `tokio::sync::broadcast`.
//!
//! The stem session publishes two families of events:
//!
//! - [`UploadEvent`]: lifecycle of a separation request (started, completed,
//!   partially completed, failed, superseded by a newer pick).
//! - [`StemEvent`]: per-stem player activity (bound, failed to load, status
//!   changed, all players released).
//!
//! ```text
//! ┌──────────────────┐  emit   ┌──────────┐  subscribe  ┌─────────┐
//! │ UploadOrchestr.  ├────────>│          ├────────────>│ Host UI │
//! └──────────────────┘         │ EventBus │             └─────────┘
//! ┌──────────────────┐  emit   │          │  subscribe  ┌─────────┐
//! │ PlaybackSession  ├────────>│          ├────────────>│ Logger  │
//! └──────────────────┘         └──────────┘             └─────────┘
//! ```
//!
//! Emitting with no subscribers is not an error for callers; the send result
//! is discarded. Slow subscribers observe `RecvError::Lagged(n)` and keep
//! receiving newer events.
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, UploadEvent};
//!
//! let bus = EventBus::new(16);
//! let mut rx = bus.subscribe();
//!
//! bus.emit(CoreEvent::Upload(UploadEvent::Started {
//!     upload_id: "u-1".to_string(),
//!     file_name: "song.mp3".to_string(),
//! }))
//! .ok();
//!
//! assert!(matches!(rx.try_recv(), Ok(CoreEvent::Upload(_))));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Upload(UploadEvent),
    Stem(StemEvent),
}

impl CoreEvent {
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Upload(e) => e.description(),
            CoreEvent::Stem(e) => e.description(),
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Upload(UploadEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Stem(StemEvent::LoadFailed { .. }) => EventSeverity::Error,
            CoreEvent::Upload(UploadEvent::Partial { .. }) => EventSeverity::Warning,
            CoreEvent::Upload(UploadEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Upload(UploadEvent::Started { .. }) => EventSeverity::Info,
            CoreEvent::Stem(StemEvent::Bound { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Upload Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum UploadEvent {
    /// A picked file is being sent to the separation backend.
    Started { upload_id: String, file_name: String },
    /// Every expected stem came back with a URL.
    Completed {
        upload_id: String,
        stems: Vec<String>,
    },
    /// The backend answered but some stems have no URL.
    Partial {
        upload_id: String,
        missing: Vec<String>,
    },
    Failed { upload_id: String, message: String },
    /// A newer pick replaced this upload before it finished.
    Superseded { upload_id: String },
}

impl UploadEvent {
    fn description(&self) -> &str {
        match self {
            UploadEvent::Started { .. } => "Upload started",
            UploadEvent::Completed { .. } => "Separation completed",
            UploadEvent::Partial { .. } => "Separation returned partial results",
            UploadEvent::Failed { .. } => "Upload failed",
            UploadEvent::Superseded { .. } => "Upload superseded",
        }
    }

    pub fn upload_id(&self) -> &str {
        match self {
            UploadEvent::Started { upload_id, .. }
            | UploadEvent::Completed { upload_id, .. }
            | UploadEvent::Partial { upload_id, .. }
            | UploadEvent::Failed { upload_id, .. }
            | UploadEvent::Superseded { upload_id } => upload_id,
        }
    }
}

// ============================================================================
// Stem Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum StemEvent {
    /// A player was created and asked to load the stem URL.
    Bound { stem: String, generation: u64 },
    /// The player for a stem could not be created or rejected its URL.
    LoadFailed { stem: String, message: String },
    /// A bound player reported new status.
    StatusChanged {
        stem: String,
        generation: u64,
        is_loaded: bool,
        is_playing: bool,
        position_ms: u64,
        duration_ms: u64,
    },
    /// Every player of the given generation was released.
    Released { generation: u64 },
}

impl StemEvent {
    fn description(&self) -> &str {
        match self {
            StemEvent::Bound { .. } => "Stem player bound",
            StemEvent::LoadFailed { .. } => "Stem failed to load",
            StemEvent::StatusChanged { .. } => "Stem status changed",
            StemEvent::Released { .. } => "Stem players released",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event; fails only when nobody is subscribed.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// Receiver that skips events rejected by a predicate.
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |f| f(event))
    }

    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking receive. `None` when no matching event is queued.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.accepts(&event) => return Some(Ok(event)),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
