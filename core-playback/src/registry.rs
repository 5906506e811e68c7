//! # Stem Registry
//!
//! Ordered stem slots for one session and the readiness gate hosts use to
//! decide whether to show the players.
//!
//! URLs are written once per upload generation. [`StemRegistry::apply_urls`]
//! refuses to overwrite a generation that was not cleared with
//! [`StemRegistry::reset`], which keeps two sets of players from ever
//! coexisting.

use crate::error::{PlaybackError, Result};
use crate::stems::{Stem, StemLayout, StemName, StemUrlMap};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct StemRegistry {
    layout: StemLayout,
    stems: Vec<Stem>,
}

impl StemRegistry {
    pub fn new(layout: StemLayout) -> Self {
        Self {
            layout,
            stems: layout.stems().iter().copied().map(Stem::unresolved).collect(),
        }
    }

    pub fn layout(&self) -> StemLayout {
        self.layout
    }

    /// Clear every URL.
    ///
    /// Players bound to the old URLs must already be released; the session
    /// does that before calling this.
    pub fn reset(&mut self) {
        for stem in &mut self.stems {
            stem.url = None;
        }
        debug!(layout = ?self.layout, "Stem registry reset");
    }

    /// Whether no stem holds a URL.
    pub fn is_cleared(&self) -> bool {
        self.stems.iter().all(|stem| stem.url.is_none())
    }

    /// Assign URLs from a decoded response. Stems absent from the map stay
    /// unresolved.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::RegistryNotReset`] if any stem still holds a URL.
    pub fn apply_urls(&mut self, map: &StemUrlMap) -> Result<()> {
        if !self.is_cleared() {
            return Err(PlaybackError::RegistryNotReset);
        }

        for stem in &mut self.stems {
            stem.url = map.get(stem.name).map(str::to_string);
        }

        debug!(
            resolved = self.stems.iter().filter(|s| s.url.is_some()).count(),
            expected = self.stems.len(),
            "Stem URLs applied"
        );
        Ok(())
    }

    /// `true` iff every expected stem has a URL.
    pub fn all_ready(&self) -> bool {
        self.stems.iter().all(|stem| stem.url.is_some())
    }

    pub fn missing(&self) -> Vec<StemName> {
        self.stems
            .iter()
            .filter(|stem| stem.url.is_none())
            .map(|stem| stem.name)
            .collect()
    }

    pub fn stems(&self) -> &[Stem] {
        &self.stems
    }

    pub fn get(&self, index: usize) -> Result<&Stem> {
        self.stems.get(index).ok_or(PlaybackError::UnknownStem(index))
    }

    pub fn url(&self, index: usize) -> Result<Option<&str>> {
        Ok(self.get(index)?.url.as_deref())
    }

    pub fn len(&self) -> usize {
        self.stems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stems.is_empty()
    }
}
