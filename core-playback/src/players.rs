//! # Playback Session Manager
//!
//! Owns one host [`AudioPlayer`] per stem slot and is the only component that
//! issues transport calls on them.
//!
//! ## Slot lifecycle
//!
//! ```text
//! Unbound ──ensure_bound──> Loading ──status: is_loaded──> Loaded
//!                                                            │ toggle
//!                                                            v
//!                                          Paused <──toggle── Playing
//!
//! any state ──release_all──> Released ──ensure_bound──> Loading
//! ```
//!
//! Every [`release_all`](PlaybackSessionManager::release_all) bumps the
//! generation counter. Status ticks are applied through
//! [`apply_status`](PlaybackSessionManager::apply_status) together with the
//! generation they were subscribed under, so a tick from a released player
//! can never overwrite the state of its successor.
//!
//! Status is reconciled verbatim: no smoothing, no filtering.

use crate::config::PlaybackPolicy;
use crate::error::{PlaybackError, Result};
use crate::stems::{StemLayout, StemName};
use crate::time::format_time;
use bridge_traits::playback::{AudioPlayer, AudioPlayerFactory, PlayerStatus};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

/// Slider range used while a stem's duration is still unknown.
pub const UNKNOWN_DURATION_FALLBACK_MS: u64 = 1000;

/// Where a stem slot is in its player lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerPhase {
    /// No player has been created.
    Unbound,
    /// A player exists and was asked to load; the host has not confirmed yet.
    Loading,
    /// Loaded and never started.
    Loaded,
    Playing,
    Paused,
    /// The player was disposed. Transport calls fail until the slot is re-bound.
    Released,
}

impl PlayerPhase {
    /// Whether a player handle is currently held for the slot.
    pub fn is_bound(&self) -> bool {
        !matches!(self, PlayerPhase::Unbound | PlayerPhase::Released)
    }
}

/// Display model for one stem row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StemView {
    pub name: StemName,
    /// Upper-case stem name.
    pub label: String,
    pub phase: PlayerPhase,
    pub is_loaded: bool,
    pub is_playing: bool,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub position_label: String,
    pub duration_label: String,
    pub slider_max_ms: u64,
    /// Drag position while scrubbing, otherwise the playback position.
    pub slider_value_ms: u64,
}

impl StemView {
    fn new(name: StemName, phase: PlayerPhase, status: PlayerStatus, scrub: Option<u64>) -> Self {
        let slider_max_ms = match status.duration_ms {
            0 => UNKNOWN_DURATION_FALLBACK_MS,
            duration => duration,
        };
        let slider_value_ms = scrub.unwrap_or(status.position_ms);

        Self {
            name,
            label: name.label(),
            phase,
            is_loaded: status.is_loaded,
            is_playing: status.is_playing,
            position_ms: status.position_ms,
            duration_ms: status.duration_ms,
            position_label: format_time(slider_value_ms),
            duration_label: format_time(slider_max_ms),
            slider_max_ms,
            slider_value_ms,
        }
    }
}

struct BoundPlayer {
    player: Box<dyn AudioPlayer>,
    status_rx: watch::Receiver<PlayerStatus>,
    /// Last reconciled status.
    status: PlayerStatus,
    has_played: bool,
    scrub: Option<u64>,
}

impl BoundPlayer {
    /// Pull the newest snapshot from the player's feed.
    fn reconcile(&mut self) -> PlayerStatus {
        self.status = *self.status_rx.borrow();
        self.status
    }

    fn phase(&self) -> PlayerPhase {
        if !self.status.is_loaded {
            PlayerPhase::Loading
        } else if self.status.is_playing {
            PlayerPhase::Playing
        } else if self.has_played {
            PlayerPhase::Paused
        } else {
            PlayerPhase::Loaded
        }
    }

    /// Clamp a target position to the known duration.
    fn clamp(&self, position_ms: u64) -> u64 {
        match self.status.duration_ms {
            0 => position_ms,
            duration => position_ms.min(duration),
        }
    }
}

enum Slot {
    Unbound,
    Bound(BoundPlayer),
    Released,
}

pub struct PlaybackSessionManager {
    factory: Arc<dyn AudioPlayerFactory>,
    names: &'static [StemName],
    policy: PlaybackPolicy,
    slots: Vec<Slot>,
    generation: u64,
    active: Option<usize>,
}

impl PlaybackSessionManager {
    pub fn new(
        factory: Arc<dyn AudioPlayerFactory>,
        layout: StemLayout,
        policy: PlaybackPolicy,
    ) -> Self {
        let names = layout.stems();
        Self {
            factory,
            names,
            policy,
            slots: names.iter().map(|_| Slot::Unbound).collect(),
            generation: 0,
            active: None,
        }
    }

    pub fn policy(&self) -> PlaybackPolicy {
        self.policy
    }

    /// Incremented by every [`release_all`](Self::release_all).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Stem most recently started with [`toggle`](Self::toggle).
    pub fn active_stem(&self) -> Option<StemName> {
        self.active.map(|index| self.names[index])
    }

    pub fn name(&self, index: usize) -> Result<StemName> {
        self.names
            .get(index)
            .copied()
            .ok_or(PlaybackError::UnknownStem(index))
    }

    pub fn is_bound(&self, index: usize) -> bool {
        matches!(self.slots.get(index), Some(Slot::Bound(_)))
    }

    fn bound(&self, index: usize) -> Result<&BoundPlayer> {
        let name = self.name(index)?;
        match &self.slots[index] {
            Slot::Bound(bound) => Ok(bound),
            Slot::Unbound | Slot::Released => Err(PlaybackError::NotBound(name)),
        }
    }

    fn bound_mut(&mut self, index: usize) -> Result<&mut BoundPlayer> {
        let name = self.name(index)?;
        match &mut self.slots[index] {
            Slot::Bound(bound) => Ok(bound),
            Slot::Unbound | Slot::Released => Err(PlaybackError::NotBound(name)),
        }
    }

    /// Bound player that has confirmed load completion, reconciled.
    fn loaded_mut(&mut self, index: usize) -> Result<&mut BoundPlayer> {
        let name = self.name(index)?;
        let bound = self.bound_mut(index)?;
        if !bound.reconcile().is_loaded {
            return Err(PlaybackError::NotLoaded(name));
        }
        Ok(bound)
    }

    /// Create a player for the stem and start loading `url`.
    ///
    /// Returns `Ok(false)` without side effects if the slot is already bound.
    /// On failure the slot stays unbound and other slots are unaffected.
    ///
    /// # Errors
    ///
    /// - [`PlaybackError::NoUrl`] when `url` is `None`
    /// - [`PlaybackError::LoadFailed`] when the host cannot create a player
    ///   or rejects the URL
    #[instrument(skip(self, url), fields(generation = self.generation))]
    pub async fn ensure_bound(&mut self, index: usize, url: Option<&str>) -> Result<bool> {
        let name = self.name(index)?;
        if self.is_bound(index) {
            return Ok(false);
        }
        let url = url.ok_or(PlaybackError::NoUrl(name))?;

        let player = self
            .factory
            .create_player()
            .await
            .map_err(|e| PlaybackError::LoadFailed {
                stem: name,
                message: e.to_string(),
            })?;

        // Subscribe before loading so the load confirmation is not missed.
        let status_rx = player.subscribe();

        if let Err(e) = player.load(url).await {
            if let Err(release_err) = player.release().await {
                warn!(stem = %name, error = %release_err, "Failed to release rejected player");
            }
            self.slots[index] = Slot::Unbound;
            return Err(PlaybackError::LoadFailed {
                stem: name,
                message: e.to_string(),
            });
        }

        let status = *status_rx.borrow();
        self.slots[index] = Slot::Bound(BoundPlayer {
            player,
            status_rx,
            status,
            has_played: false,
            scrub: None,
        });
        debug!(stem = %name, "Player bound");
        Ok(true)
    }

    /// A fresh receiver on the stem's status feed, tagged with the current
    /// generation for [`apply_status`](Self::apply_status).
    pub fn subscribe(&self, index: usize) -> Result<(u64, watch::Receiver<PlayerStatus>)> {
        let bound = self.bound(index)?;
        Ok((self.generation, bound.status_rx.clone()))
    }

    /// Record a status tick observed under `generation`.
    ///
    /// Returns `false`, changing nothing, when the tick belongs to an older
    /// generation or the slot no longer holds a player.
    pub fn apply_status(&mut self, index: usize, generation: u64, status: PlayerStatus) -> bool {
        if generation != self.generation {
            return false;
        }
        match self.slots.get_mut(index) {
            Some(Slot::Bound(bound)) => {
                bound.status = status;
                true
            }
            _ => false,
        }
    }

    /// Last reconciled status of a bound stem.
    pub fn status(&self, index: usize) -> Result<PlayerStatus> {
        Ok(self.bound(index)?.status)
    }

    /// Pause a playing stem, or start a paused one.
    ///
    /// Under [`PlaybackPolicy::Exclusive`] every other playing stem is paused
    /// before this one starts. Returns whether the stem was asked to play.
    #[instrument(skip(self))]
    pub async fn toggle(&mut self, index: usize) -> Result<bool> {
        let name = self.name(index)?;
        let was_playing = self.loaded_mut(index)?.status.is_playing;

        if was_playing {
            self.bound_mut(index)?.player.pause().await?;
            debug!(stem = %name, "Paused");
            return Ok(false);
        }

        if self.policy == PlaybackPolicy::Exclusive {
            self.pause_others(index).await?;
        }

        let bound = self.bound_mut(index)?;
        bound.player.play().await?;
        bound.has_played = true;
        self.active = Some(index);
        debug!(stem = %name, "Playing");
        Ok(true)
    }

    async fn pause_others(&mut self, keep: usize) -> Result<()> {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if index == keep {
                continue;
            }
            if let Slot::Bound(bound) = slot {
                if bound.reconcile().is_playing {
                    bound.player.pause().await?;
                    debug!(stem = %self.names[index], "Paused by exclusive playback");
                }
            }
        }
        Ok(())
    }

    /// Seek a loaded stem. The position is clamped to the known duration.
    ///
    /// Returns the position actually requested from the player.
    #[instrument(skip(self))]
    pub async fn seek(&mut self, index: usize, position_ms: u64) -> Result<u64> {
        let bound = self.loaded_mut(index)?;
        let target = bound.clamp(position_ms);
        bound.scrub = None;
        bound.player.seek(target).await?;
        Ok(target)
    }

    /// Start a slider drag. Only the view moves; the player is untouched.
    pub fn begin_scrub(&mut self, index: usize, position_ms: u64) -> Result<()> {
        let bound = self.loaded_mut(index)?;
        bound.scrub = Some(bound.clamp(position_ms));
        Ok(())
    }

    /// Move an ongoing drag, starting one if needed.
    pub fn update_scrub(&mut self, index: usize, position_ms: u64) -> Result<()> {
        self.begin_scrub(index, position_ms)
    }

    /// Finish a drag with a single seek to the last drag position.
    ///
    /// Returns `None` when no drag was in progress.
    #[instrument(skip(self))]
    pub async fn end_scrub(&mut self, index: usize) -> Result<Option<u64>> {
        let bound = self.bound_mut(index)?;
        let Some(target) = bound.scrub.take() else {
            return Ok(None);
        };
        bound.player.seek(target).await?;
        Ok(Some(target))
    }

    /// Abandon a drag without seeking.
    pub fn cancel_scrub(&mut self, index: usize) -> Result<()> {
        self.bound_mut(index)?.scrub = None;
        Ok(())
    }

    /// Release every bound player and start a new generation.
    ///
    /// Release errors are logged and do not stop the remaining releases.
    /// Returns the number of players released.
    #[instrument(skip(self), fields(generation = self.generation))]
    pub async fn release_all(&mut self) -> usize {
        let mut released = 0;

        for (index, slot) in self.slots.iter_mut().enumerate() {
            if !matches!(slot, Slot::Bound(_)) {
                continue;
            }
            if let Slot::Bound(bound) = std::mem::replace(slot, Slot::Released) {
                if let Err(e) = bound.player.release().await {
                    warn!(stem = %self.names[index], error = %e, "Player release failed");
                }
                released += 1;
            }
        }

        self.generation += 1;
        self.active = None;
        info!(released, generation = self.generation, "Released stem players");
        released
    }

    pub fn phase(&self, index: usize) -> Result<PlayerPhase> {
        self.name(index)?;
        Ok(match &self.slots[index] {
            Slot::Unbound => PlayerPhase::Unbound,
            Slot::Released => PlayerPhase::Released,
            Slot::Bound(bound) => bound.phase(),
        })
    }

    pub fn view(&mut self, index: usize) -> Result<StemView> {
        let name = self.name(index)?;
        Ok(match &mut self.slots[index] {
            Slot::Unbound => StemView::new(name, PlayerPhase::Unbound, PlayerStatus::unloaded(), None),
            Slot::Released => {
                StemView::new(name, PlayerPhase::Released, PlayerStatus::unloaded(), None)
            }
            Slot::Bound(bound) => {
                let status = bound.reconcile();
                StemView::new(name, bound.phase(), status, bound.scrub)
            }
        })
    }

    /// Views for every stem, in layout order.
    pub fn views(&mut self) -> Vec<StemView> {
        (0..self.slots.len())
            .filter_map(|index| self.view(index).ok())
            .collect()
    }
}
