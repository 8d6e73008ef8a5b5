//! Tokio host for the synchronous engine.
//!
//! Timers, media probes and page fetches all run as spawned tasks that
//! report back over one channel as [`RuntimeEvent`]s. The driver owns the
//! engine and processes those events one at a time.

use rf_core::FeedPage;
use rf_feed::{FeedSource, PageRequest};
use rf_playback::{MediaEvent, Scheduler, TimerToken};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Everything that re-enters the engine from outside.
#[derive(Debug)]
pub enum RuntimeEvent {
    /// Media signal tagged with the source epoch it was produced for.
    Media { event: MediaEvent, epoch: u64 },
    Timer(TimerToken),
    Page {
        request: PageRequest,
        result: rf_core::Result<FeedPage>,
    },
    Shutdown,
}

pub type EventSender = mpsc::UnboundedSender<RuntimeEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<RuntimeEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

// ---------------------------------------------------------------------------
// TokioScheduler
// ---------------------------------------------------------------------------

/// [`Scheduler`] backed by `tokio::time::sleep` tasks.
pub struct TokioScheduler {
    tx: EventSender,
    timers: HashMap<TimerToken, JoinHandle<()>>,
}

impl TokioScheduler {
    pub fn new(tx: EventSender) -> Self {
        Self {
            tx,
            timers: HashMap::new(),
        }
    }

    /// Drop bookkeeping for a token that has fired.
    pub fn forget(&mut self, token: TimerToken) {
        self.timers.remove(&token);
    }

    pub fn pending(&self) -> usize {
        self.timers.len()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&mut self, token: TimerToken, after: Duration) {
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = tx.send(RuntimeEvent::Timer(token));
        });
        if let Some(previous) = self.timers.insert(token, handle) {
            previous.abort();
        }
    }

    fn cancel(&mut self, token: TimerToken) {
        if let Some(handle) = self.timers.remove(&token) {
            handle.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
    }
}

/// Fetch `request` on a background task and post the answer back.
pub fn spawn_fetch(source: Arc<dyn FeedSource>, request: PageRequest, tx: EventSender) {
    tokio::spawn(async move {
        tracing::debug!(page = request.page, generation = request.generation, "Fetching feed page");
        let result = source.fetch_page(&request).await;
        let _ = tx.send(RuntimeEvent::Page { request, result });
    });
}
