//! Shared test harness for integration tests.
//!
//! Provides [`EngineHarness`], a [`FeedEngine`] over in-memory media and a
//! hand-fired scheduler, plus record builders.

#![allow(dead_code)]

use std::sync::Arc;

use reelfeed::FeedEngine;
use rf_core::config::Config;
use rf_core::{FeedFilter, FeedPage, VideoId, VideoRecord};
use rf_feed::{PageOutcome, PageRequest};
use rf_playback::testing::{FakeMedia, ManualScheduler, RecordingSink};
use rf_playback::{MediaEvent, MuteStore, TimerToken};

pub type TestEngine = FeedEngine<FakeMedia, ManualScheduler>;

pub struct EngineHarness {
    pub engine: TestEngine,
    pub sink: Arc<RecordingSink>,
    pub mute: Arc<MuteStore>,
}

impl EngineHarness {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let sink = Arc::new(RecordingSink::default());
        let mute = MuteStore::new(config.playback.start_muted);
        let engine = FeedEngine::new(
            &config,
            FakeMedia::default(),
            ManualScheduler::default(),
            sink.clone(),
            mute.clone(),
            None,
        );
        Self { engine, sink, mute }
    }

    pub fn with_paging(page_size: usize, lookahead: usize) -> Self {
        let mut config = Config::default();
        config.feed.page_size = page_size;
        config.feed.prefetch_lookahead = lookahead;
        Self::with_config(config)
    }

    /// Load the default feed and answer the first page with `records`.
    pub fn load_with(&mut self, records: Vec<VideoRecord>) -> PageOutcome {
        let req = self.engine.load(FeedFilter::default(), None);
        self.answer(&req, records)
    }

    pub fn answer(&mut self, req: &PageRequest, records: Vec<VideoRecord>) -> PageOutcome {
        let page = FeedPage::from_records(records, req.page, req.limit);
        self.engine.complete_page(req, Ok(page))
    }

    /// Drive the active session to its first frame.
    pub fn play_active(&mut self) {
        self.engine.handle_media_event(MediaEvent::CanPlay);
        self.engine.handle_media_event(MediaEvent::Playing);
    }

    /// The timer the active session is waiting on, if any.
    pub fn armed(&self) -> Option<TimerToken> {
        self.engine.playback().scheduler().pending().last().copied()
    }

    pub fn media_source(&self) -> Option<String> {
        self.engine.playback().media().lock().source.clone()
    }

    pub fn active_id(&self) -> Option<VideoId> {
        self.engine.feed().active_record().map(|r| r.id)
    }
}

pub fn records(n: usize) -> Vec<VideoRecord> {
    (0..n)
        .map(|i| VideoRecord::new(VideoId::new(), format!("https://cdn.example.com/u/{i}.mp4")))
        .collect()
}
