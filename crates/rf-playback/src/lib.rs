//! rf-playback: source resolution and the playback state machine.
//!
//! Everything here is synchronous and host-agnostic. The host supplies a
//! [`MediaElement`], a [`Scheduler`] for timers, and a [`ViewSink`] for
//! telemetry, then forwards media events and fired timers back into the
//! [`PlaybackController`].

pub mod controller;
pub mod error;
pub mod media;
pub mod mute;
pub mod retry;
pub mod scheduler;
pub mod source;
pub mod views;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use controller::{PlaybackContext, PlaybackController, PlaybackEvent, PlaybackSession, PlaybackStatus};
pub use error::{MediaErrorCode, PlaybackError};
pub use media::{MediaElement, MediaEvent, NetworkState, PlayRejection, ReadyState};
pub use mute::{MuteStore, SubscriptionId};
pub use retry::{RetryDecision, RetryPolicy, RetryState};
pub use scheduler::{Scheduler, TimerKind, TimerToken};
pub use source::{with_cache_buster, SourceCandidate, SourceResolver};
pub use views::{NullViewSink, ViewDeduper, ViewEvent, ViewSink};
