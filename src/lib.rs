//! Reelfeed - short-video feed playback engine
//!
//! This library crate wires the playback and feed crates into a runnable
//! engine and exposes it for integration testing.

pub mod check;
pub mod device;
pub mod engine;
pub mod http_media;
pub mod runtime;
pub mod telemetry;

pub use engine::FeedEngine;
