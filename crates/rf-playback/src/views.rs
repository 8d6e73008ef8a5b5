//! At-most-once view reporting.

use parking_lot::Mutex;
use rf_core::{VideoId, ViewerId};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// Set of video ids that already emitted a view for the current feed
/// mount. Cloning shares the underlying set.
#[derive(Debug, Clone, Default)]
pub struct ViewDeduper {
    seen: Arc<Mutex<HashSet<VideoId>>>,
}

impl ViewDeduper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` exactly once per id for the life of the set.
    pub fn should_report(&self, id: VideoId) -> bool {
        self.seen.lock().insert(id)
    }

    pub fn has_seen(&self, id: VideoId) -> bool {
        self.seen.lock().contains(&id)
    }

    /// Start a new set lifetime (full feed reset).
    pub fn clear(&self) {
        self.seen.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.lock().is_empty()
    }
}

/// Payload written to the view telemetry endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ViewEvent {
    pub video_id: VideoId,
    pub viewer_id: Option<ViewerId>,
}

/// Fire-and-forget destination for view events.
///
/// Implementations must not block and must swallow their own failures.
pub trait ViewSink: Send + Sync {
    fn record_view(&self, event: ViewEvent);
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullViewSink;

impl ViewSink for NullViewSink {
    fn record_view(&self, _event: ViewEvent) {}
}
