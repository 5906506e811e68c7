//! Workspace umbrella crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (`core-service`, `core-playback`). Host applications can
//! depend on `stemsplit-workspace` and enable the documented features without
//! needing to wire each crate individually.

pub use core_playback as playback;

#[cfg(feature = "desktop-shims")]
pub use core_service as service;
