//! View telemetry delivery.
//!
//! The playback controller reports views synchronously; this sink hands
//! each one to a spawned task so recording never blocks or fails playback.

use rf_feed::FeedSource;
use rf_playback::{ViewEvent, ViewSink};
use std::sync::Arc;
use tokio::runtime::Handle;

pub struct BackendViewSink {
    source: Arc<dyn FeedSource>,
    handle: Handle,
}

impl BackendViewSink {
    pub fn new(source: Arc<dyn FeedSource>, handle: Handle) -> Self {
        Self { source, handle }
    }

    /// Bind to the runtime of the calling task.
    pub fn current(source: Arc<dyn FeedSource>) -> Self {
        Self::new(source, Handle::current())
    }
}

impl ViewSink for BackendViewSink {
    fn record_view(&self, event: ViewEvent) {
        let source = self.source.clone();
        self.handle.spawn(async move {
            match source.record_view(&event).await {
                Ok(()) => tracing::debug!(video_id = %event.video_id, "View recorded"),
                Err(e) => {
                    tracing::debug!(video_id = %event.video_id, error = %e, "Failed to record view")
                }
            }
        });
    }
}
