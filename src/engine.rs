//! Feed engine: one feed, one gesture manager, one playback controller.
//!
//! The engine is the only place that moves the active index and hands
//! records to playback, which keeps "exactly one active video" true by
//! construction. Every method that may need a page returns the
//! [`PageRequest`] for the host to fetch.

use rf_core::config::Config;
use rf_core::{FeedFilter, FeedPage, UserId, VideoRecord, ViewerId};
use rf_feed::{FeedController, GestureScrollManager, IndexChange, NavIntent, NavKey, PageOutcome, PageRequest};
use rf_playback::{
    MediaElement, MediaEvent, MuteStore, PlaybackContext, PlaybackController, PlaybackEvent,
    PlaybackStatus, RetryPolicy, Scheduler, SourceResolver, TimerToken, ViewDeduper, ViewSink,
};
use std::sync::Arc;
use std::time::Instant;

pub struct FeedEngine<M: MediaElement + 'static, S: Scheduler> {
    feed: FeedController,
    gestures: GestureScrollManager,
    playback: PlaybackController<M, S>,
    resolver: SourceResolver,
}

impl<M: MediaElement + 'static, S: Scheduler> FeedEngine<M, S> {
    pub fn new(
        config: &Config,
        media: M,
        scheduler: S,
        sink: Arc<dyn ViewSink>,
        mute: Arc<MuteStore>,
        viewer: Option<ViewerId>,
    ) -> Self {
        let deduper = ViewDeduper::new();
        let resolver = SourceResolver::new(&config.sources);
        let ctx = PlaybackContext {
            resolver: resolver.clone(),
            policy: RetryPolicy::new(config.playback.clone()),
            deduper: deduper.clone(),
            sink,
            mute,
            viewer,
        };

        Self {
            feed: FeedController::new(&config.feed, deduper),
            gestures: GestureScrollManager::new(&config.gestures),
            playback: PlaybackController::new(media, scheduler, ctx),
            resolver,
        }
    }

    pub fn feed(&self) -> &FeedController {
        &self.feed
    }

    pub fn playback(&self) -> &PlaybackController<M, S> {
        &self.playback
    }

    pub fn playback_mut(&mut self) -> &mut PlaybackController<M, S> {
        &mut self.playback
    }

    pub fn status(&self) -> PlaybackStatus {
        self.playback.status()
    }

    pub fn poster(&self, record: &VideoRecord) -> Option<String> {
        self.resolver.poster(record)
    }

    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        self.playback.drain_events()
    }

    // -----------------------------------------------------------------------
    // Feed
    // -----------------------------------------------------------------------

    /// Full reset for a new filter. Playback stops immediately.
    pub fn load(&mut self, filter: FeedFilter, user_id: Option<UserId>) -> PageRequest {
        self.playback.deactivate();
        self.feed.load(filter, user_id)
    }

    /// Apply a fetched page; starts playback if nothing is active yet.
    pub fn complete_page(
        &mut self,
        request: &PageRequest,
        result: rf_core::Result<FeedPage>,
    ) -> PageOutcome {
        let outcome = self.feed.complete(request, result);
        if matches!(outcome, PageOutcome::Appended { .. }) && self.playback.active_video().is_none() {
            self.sync_playback();
        }
        outcome
    }

    pub fn retry_feed(&mut self) -> Option<PageRequest> {
        self.feed.retry()
    }

    // -----------------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------------

    pub fn on_wheel(&mut self, delta_y: f64, now: Instant) -> Option<PageRequest> {
        let intent = self.gestures.on_wheel(delta_y, now)?;
        self.navigate(intent)
    }

    pub fn on_touch_start(&mut self, y: f64) {
        self.gestures.on_touch_start(y);
    }

    pub fn on_touch_end(&mut self, y: f64, now: Instant) -> Option<PageRequest> {
        let intent = self.gestures.on_touch_end(y, now)?;
        self.navigate(intent)
    }

    pub fn on_key(&mut self, key: NavKey, now: Instant) -> Option<PageRequest> {
        let intent = self.gestures.on_key(key, now)?;
        self.navigate(intent)
    }

    /// Step one item without going through gesture debouncing.
    pub fn navigate(&mut self, intent: NavIntent) -> Option<PageRequest> {
        let change = self.feed.navigate(intent);
        self.apply_index_change(change)
    }

    pub fn go_to(&mut self, index: usize) -> Option<PageRequest> {
        let change = self.feed.set_active_index(index);
        self.apply_index_change(change)
    }

    fn apply_index_change(&mut self, change: IndexChange) -> Option<PageRequest> {
        if change.changed {
            self.sync_playback();
        }
        change.prefetch
    }

    fn sync_playback(&mut self) {
        match self.feed.active_record() {
            Some(record) => self.playback.activate(record.clone()),
            None => self.playback.deactivate(),
        }
    }

    // -----------------------------------------------------------------------
    // Playback passthrough
    // -----------------------------------------------------------------------

    pub fn handle_media_event(&mut self, event: MediaEvent) {
        self.playback.handle_media_event(event);
    }

    pub fn handle_timer(&mut self, token: TimerToken) {
        self.playback.handle_timer(token);
    }

    /// Tap on the video surface: resumes when autoplay was blocked,
    /// otherwise toggles mute.
    pub fn tap(&mut self) {
        if self.playback.status() == PlaybackStatus::NeedsInteraction {
            self.playback.resume();
        } else {
            self.playback.toggle_mute();
        }
    }

    pub fn retry_playback(&mut self) -> bool {
        self.playback.retry()
    }
}
