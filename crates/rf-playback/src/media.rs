//! The playable-media contract the controller drives.
//!
//! A browser `<video>` element, a native player, or the headless HTTP
//! prober all satisfy [`MediaElement`]; their asynchronous signals come
//! back to the controller as [`MediaEvent`]s.

use crate::error::MediaErrorCode;

/// Buffered-data level, mirroring the HTML media `readyState` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ReadyState {
    #[default]
    HaveNothing = 0,
    HaveMetadata = 1,
    HaveCurrentData = 2,
    HaveFutureData = 3,
    HaveEnoughData = 4,
}

/// Network activity, mirroring the HTML media `networkState` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkState {
    #[default]
    Empty = 0,
    Idle = 1,
    Loading = 2,
    NoSource = 3,
}

/// Asynchronous signal from the media element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaEvent {
    /// Enough data is buffered to start.
    CanPlay,
    /// Frames are actually advancing.
    Playing,
    /// Playback halted waiting for data.
    Waiting,
    /// The fetch stopped delivering data.
    Stalled,
    Error(MediaErrorCode),
}

/// Why `play()` was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayRejection {
    /// The platform requires a user gesture first.
    NotAllowed,
    /// The play request was interrupted by a source change or pause.
    Aborted,
}

/// Operations the playback controller needs from a media element.
pub trait MediaElement: Send {
    /// Assign a new source URL. Does not start fetching until [`load`](Self::load).
    fn set_source(&mut self, url: &str);

    /// Drop the current source and release its network/memory resources.
    fn clear_source(&mut self);

    fn load(&mut self);

    fn play(&mut self) -> Result<(), PlayRejection>;

    fn pause(&mut self);

    fn set_muted(&mut self, muted: bool);

    fn ready_state(&self) -> ReadyState;

    fn network_state(&self) -> NetworkState;
}
