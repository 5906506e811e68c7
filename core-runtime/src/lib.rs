//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the stem-splitter core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that other modules depend on.
//! It establishes the logging conventions, the bridge wiring performed at
//! startup, and the event broadcasting used to drive host UIs.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
