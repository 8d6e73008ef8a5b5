//! Timer seam between the controller and the host event loop.
//!
//! The controller never sleeps. It asks a [`Scheduler`] to deliver a
//! [`TimerToken`] back after a delay and cancels tokens it no longer
//! wants. Hosts may still deliver a cancelled token late; the controller
//! only acts on the token it currently has armed.

use std::time::Duration;

/// Purpose of an armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// No readiness signal since the source was assigned.
    LoadTimeout,
    /// Buffering after playback started.
    StallWatchdog,
}

/// Unique handle for one armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken {
    seq: u64,
    kind: TimerKind,
}

impl TimerToken {
    pub fn kind(&self) -> TimerKind {
        self.kind
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Issues strictly increasing tokens.
#[derive(Debug, Default)]
pub(crate) struct TokenIssuer {
    next: u64,
}

impl TokenIssuer {
    pub(crate) fn issue(&mut self, kind: TimerKind) -> TimerToken {
        self.next += 1;
        TimerToken {
            seq: self.next,
            kind,
        }
    }
}

/// Host timer facility.
pub trait Scheduler {
    /// Deliver `token` back to the controller after `after` elapses.
    fn schedule(&mut self, token: TimerToken, after: Duration);

    /// Best-effort cancellation of a previously scheduled token.
    fn cancel(&mut self, token: TimerToken);
}
