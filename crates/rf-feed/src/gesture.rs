//! Wheel, touch and key input to one-item navigation steps.
//!
//! Continuous wheel deltas accumulate until the threshold is reached, then
//! exactly one step fires and all input is ignored for the lock window.
//! Touch swipes must travel a minimum distance. The manager only emits
//! intents; the feed controller decides whether the step is in bounds.

use rf_core::config::GestureConfig;
use std::time::{Duration, Instant};

/// Direction of a single navigation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavIntent {
    Next,
    Previous,
}

impl NavIntent {
    pub fn delta(self) -> i64 {
        match self {
            Self::Next => 1,
            Self::Previous => -1,
        }
    }
}

/// Discrete keyboard navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    Down,
    Up,
}

pub struct GestureScrollManager {
    threshold: f64,
    idle_reset: Duration,
    lock: Duration,
    touch_min: f64,
    accumulated: f64,
    last_wheel: Option<Instant>,
    locked_until: Option<Instant>,
    touch_start: Option<f64>,
}

impl GestureScrollManager {
    pub fn new(config: &GestureConfig) -> Self {
        Self {
            threshold: config.wheel_threshold,
            idle_reset: Duration::from_millis(config.wheel_idle_reset_ms),
            lock: Duration::from_millis(config.lock_ms),
            touch_min: config.touch_min_distance,
            accumulated: 0.0,
            last_wheel: None,
            locked_until: None,
            touch_start: None,
        }
    }

    pub fn is_locked(&self, now: Instant) -> bool {
        self.locked_until.is_some_and(|until| now < until)
    }

    /// Positive `delta_y` scrolls toward the next item.
    pub fn on_wheel(&mut self, delta_y: f64, now: Instant) -> Option<NavIntent> {
        if !delta_y.is_finite() {
            return None;
        }
        if self.is_locked(now) {
            self.accumulated = 0.0;
            return None;
        }

        let idle = self
            .last_wheel
            .is_some_and(|last| now.saturating_duration_since(last) > self.idle_reset);
        if idle {
            self.accumulated = 0.0;
        }
        self.last_wheel = Some(now);
        self.accumulated += delta_y;

        if self.accumulated.abs() < self.threshold {
            return None;
        }
        let intent = if self.accumulated > 0.0 {
            NavIntent::Next
        } else {
            NavIntent::Previous
        };
        Some(self.fire(intent, now))
    }

    pub fn on_touch_start(&mut self, y: f64) {
        self.touch_start = y.is_finite().then_some(y);
    }

    /// A swipe up (finger moving toward the top) advances to the next item.
    pub fn on_touch_end(&mut self, y: f64, now: Instant) -> Option<NavIntent> {
        let start = self.touch_start.take()?;
        if !y.is_finite() || self.is_locked(now) {
            return None;
        }
        let travel = start - y;
        if travel.abs() < self.touch_min {
            return None;
        }
        let intent = if travel > 0.0 {
            NavIntent::Next
        } else {
            NavIntent::Previous
        };
        Some(self.fire(intent, now))
    }

    pub fn on_touch_cancel(&mut self) {
        self.touch_start = None;
    }

    pub fn on_key(&mut self, key: NavKey, now: Instant) -> Option<NavIntent> {
        if self.is_locked(now) {
            return None;
        }
        let intent = match key {
            NavKey::Down => NavIntent::Next,
            NavKey::Up => NavIntent::Previous,
        };
        Some(self.fire(intent, now))
    }

    fn fire(&mut self, intent: NavIntent, now: Instant) -> NavIntent {
        self.accumulated = 0.0;
        self.locked_until = Some(now + self.lock);
        tracing::trace!(?intent, "Navigation gesture");
        intent
    }
}
