//! Stem vocabulary shared by the registry, the orchestrator and the players.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed identifier of a separated track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StemName {
    Vocals,
    Drums,
    Bass,
    Other,
    Instrumental,
}

impl StemName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StemName::Vocals => "vocals",
            StemName::Drums => "drums",
            StemName::Bass => "bass",
            StemName::Other => "other",
            StemName::Instrumental => "instrumental",
        }
    }

    /// Upper-case display label.
    pub fn label(&self) -> String {
        self.as_str().to_ascii_uppercase()
    }

    /// JSON field carrying this stem's URL in the separation response.
    pub fn response_field(&self) -> String {
        format!("{}_url", self.as_str())
    }
}

impl fmt::Display for StemName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of stems a backend model produces, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StemLayout {
    /// vocals, drums, bass, other
    #[default]
    FourStems,
    /// vocals, instrumental
    TwoStems,
}

impl StemLayout {
    pub fn stems(&self) -> &'static [StemName] {
        match self {
            StemLayout::FourStems => &[
                StemName::Vocals,
                StemName::Drums,
                StemName::Bass,
                StemName::Other,
            ],
            StemLayout::TwoStems => &[StemName::Vocals, StemName::Instrumental],
        }
    }

    pub fn len(&self) -> usize {
        self.stems().len()
    }

    pub fn is_empty(&self) -> bool {
        self.stems().is_empty()
    }

    pub fn index_of(&self, name: StemName) -> Option<usize> {
        self.stems().iter().position(|s| *s == name)
    }
}

/// One separated track and its remote location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stem {
    pub name: StemName,
    /// Decoded URL; `None` until the backend resolves it.
    pub url: Option<String>,
}

impl Stem {
    pub fn unresolved(name: StemName) -> Self {
        Self { name, url: None }
    }
}

/// Decoded stem URLs from one separation response, in layout order.
///
/// Every stem of the layout has an entry; unresolved stems map to `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StemUrlMap {
    entries: Vec<(StemName, Option<String>)>,
}

impl StemUrlMap {
    /// A map with every stem of `layout` unresolved.
    pub fn empty(layout: StemLayout) -> Self {
        Self {
            entries: layout.stems().iter().map(|name| (*name, None)).collect(),
        }
    }

    /// Set the URL for a stem of the layout. Names outside the layout are ignored.
    pub fn set(&mut self, name: StemName, url: Option<String>) {
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = url;
        }
    }

    pub fn with(mut self, name: StemName, url: impl Into<String>) -> Self {
        self.set(name, Some(url.into()));
        self
    }

    pub fn get(&self, name: StemName) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .and_then(|(_, url)| url.as_deref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (StemName, Option<&str>)> {
        self.entries.iter().map(|(n, url)| (*n, url.as_deref()))
    }

    /// Stems without a URL, in layout order.
    pub fn missing(&self) -> Vec<StemName> {
        self.entries
            .iter()
            .filter(|(_, url)| url.is_none())
            .map(|(n, _)| *n)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.entries.iter().all(|(_, url)| url.is_some())
    }
}
