//! In-memory fakes for driving the controller deterministically.
//!
//! Enabled for this crate's tests and, via the `testing` feature, for
//! downstream integration tests.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::media::{MediaElement, NetworkState, PlayRejection, ReadyState};
use crate::scheduler::{Scheduler, TimerToken};
use crate::views::{ViewEvent, ViewSink};

/// Media element call log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaCall {
    SetSource(String),
    ClearSource,
    Load,
    Play,
    Pause,
}

/// Media element that records calls and never emits events on its own.
#[derive(Debug, Default)]
pub struct FakeMedia {
    pub source: Option<String>,
    pub muted: bool,
    pub calls: Vec<MediaCall>,
    /// When set, `play()` fails with this rejection.
    pub reject_play: Option<PlayRejection>,
}

impl FakeMedia {
    pub fn load_count(&self) -> usize {
        self.calls.iter().filter(|c| **c == MediaCall::Load).count()
    }
}

impl MediaElement for FakeMedia {
    fn set_source(&mut self, url: &str) {
        self.source = Some(url.to_string());
        self.calls.push(MediaCall::SetSource(url.to_string()));
    }

    fn clear_source(&mut self) {
        self.source = None;
        self.calls.push(MediaCall::ClearSource);
    }

    fn load(&mut self) {
        self.calls.push(MediaCall::Load);
    }

    fn play(&mut self) -> Result<(), PlayRejection> {
        self.calls.push(MediaCall::Play);
        match self.reject_play {
            Some(rejection) => Err(rejection),
            None => Ok(()),
        }
    }

    fn pause(&mut self) {
        self.calls.push(MediaCall::Pause);
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn ready_state(&self) -> ReadyState {
        ReadyState::HaveNothing
    }

    fn network_state(&self) -> NetworkState {
        if self.source.is_some() {
            NetworkState::Idle
        } else {
            NetworkState::Empty
        }
    }
}

/// Scheduler that only records; tests fire tokens by hand.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    scheduled: HashMap<TimerToken, Duration>,
    cancelled: HashSet<TimerToken>,
}

impl ManualScheduler {
    pub fn delay_of(&self, token: TimerToken) -> Option<Duration> {
        self.scheduled.get(&token).copied()
    }

    pub fn was_cancelled(&self, token: TimerToken) -> bool {
        self.cancelled.contains(&token)
    }

    /// Scheduled and not cancelled.
    pub fn pending(&self) -> Vec<TimerToken> {
        let mut tokens: Vec<TimerToken> = self
            .scheduled
            .keys()
            .filter(|t| !self.cancelled.contains(t))
            .copied()
            .collect();
        tokens.sort_by_key(|t| t.seq());
        tokens
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self, token: TimerToken, after: Duration) {
        self.scheduled.insert(token, after);
    }

    fn cancel(&mut self, token: TimerToken) {
        self.cancelled.insert(token);
    }
}

/// View sink that keeps every event.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ViewEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<ViewEvent> {
        self.events.lock().clone()
    }
}

impl ViewSink for RecordingSink {
    fn record_view(&self, event: ViewEvent) {
        self.events.lock().push(event);
    }
}
