//! Headless playback check over a live feed.
//!
//! Loads the feed, plays each video through [`HttpMedia`] until it either
//! reaches its first frame or exhausts its sources, then advances. The
//! result is one [`VideoReport`] per visited video.

use anyhow::{bail, Result};
use rf_core::config::Config;
use rf_core::{FeedFilter, Tier, UserId, VideoId, ViewerId};
use rf_feed::{FeedSource, NavIntent, PageOutcome, PageRequest};
use rf_playback::{MuteStore, PlaybackError, PlaybackEvent, PlaybackStatus, ViewSink};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

use crate::engine::FeedEngine;
use crate::http_media::HttpMedia;
use crate::runtime::{self, EventSender, RuntimeEvent, TokioScheduler};

/// What to check and how.
#[derive(Debug, Clone)]
pub struct CheckOptions {
    /// Stop after this many videos.
    pub count: usize,
    pub filter: FeedFilter,
    pub user_id: Option<UserId>,
    pub viewer: Option<ViewerId>,
    /// Upper bound for the whole run.
    pub deadline: Duration,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            count: 5,
            filter: FeedFilter::default(),
            user_id: None,
            viewer: None,
            deadline: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckOutcome {
    Played {
        tier: Tier,
        #[serde(with = "millis")]
        ttff: Duration,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoReport {
    pub video_id: VideoId,
    pub index: usize,
    /// Failures recorded before the outcome.
    pub failures: u32,
    #[serde(flatten)]
    pub outcome: CheckOutcome,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckReport {
    pub videos: Vec<VideoReport>,
    pub feed_error: Option<String>,
    pub timed_out: bool,
}

impl CheckReport {
    pub fn played(&self) -> usize {
        self.videos
            .iter()
            .filter(|v| matches!(v.outcome, CheckOutcome::Played { .. }))
            .count()
    }
}

mod millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}

/// Run the check until `count` videos concluded, the feed ran out, or the
/// deadline passed.
pub async fn run_check(
    config: &Config,
    source: Arc<dyn FeedSource>,
    sink: Arc<dyn ViewSink>,
    options: CheckOptions,
) -> Result<CheckReport> {
    if options.count == 0 {
        bail!("count must be at least 1");
    }

    let (tx, mut rx) = runtime::channel();
    let media_timeout = Duration::from_millis(
        Tier::ALL
            .iter()
            .map(|t| config.playback.load_timeout_ms(*t))
            .max()
            .unwrap_or(8_000),
    );
    let media = HttpMedia::new(tx.clone(), Handle::current(), media_timeout);
    let scheduler = TokioScheduler::new(tx.clone());
    let mute = MuteStore::new(config.playback.start_muted);
    let mut engine = FeedEngine::new(config, media, scheduler, sink, mute, options.viewer);

    let deadline_tx = tx.clone();
    let deadline = options.deadline;
    let deadline_task = tokio::spawn(async move {
        tokio::time::sleep(deadline).await;
        let _ = deadline_tx.send(RuntimeEvent::Shutdown);
    });

    let request = engine.load(options.filter.clone(), options.user_id);
    runtime::spawn_fetch(source.clone(), request, tx.clone());

    let mut run = CheckRun {
        report: CheckReport::default(),
        failures: 0,
        waiting_for_more: false,
        concluded: None,
    };

    while let Some(event) = rx.recv().await {
        match event {
            RuntimeEvent::Shutdown => {
                tracing::warn!("Check deadline reached");
                run.report.timed_out = true;
                break;
            }
            RuntimeEvent::Timer(token) => {
                engine.playback_mut().scheduler_mut().forget(token);
                engine.handle_timer(token);
            }
            RuntimeEvent::Media { event, epoch } => {
                let current = engine.playback().media().lock().epoch();
                if epoch != current {
                    tracing::trace!(?event, epoch, current, "Dropping media event for replaced source");
                    continue;
                }
                engine.handle_media_event(event);
            }
            RuntimeEvent::Page { request, result } => {
                match engine.complete_page(&request, result) {
                    PageOutcome::Appended { next, .. } => {
                        fetch(&source, next, &tx);
                        if engine.feed().is_empty() && !engine.feed().is_loading() {
                            tracing::info!("Feed is empty");
                            break;
                        }
                        if run.waiting_for_more {
                            run.waiting_for_more = false;
                            if !advance(&mut engine, &source, &tx) {
                                break;
                            }
                        }
                    }
                    PageOutcome::Failed(err) => {
                        run.report.feed_error = Some(err.to_string());
                        if engine.feed().is_empty() || run.waiting_for_more {
                            break;
                        }
                    }
                    PageOutcome::Stale => {}
                }
            }
        }

        run.absorb(&mut engine);
        if let Some(report) = run.concluded.take() {
            tracing::info!(video_id = %report.video_id, outcome = ?report.outcome, "Video checked");
            run.report.videos.push(report);
            run.failures = 0;
            if run.report.videos.len() >= options.count {
                break;
            }
            if !advance(&mut engine, &source, &tx) {
                if engine.feed().is_loading() {
                    run.waiting_for_more = true;
                } else {
                    break;
                }
            }
        }
    }

    deadline_task.abort();
    engine.playback_mut().deactivate();
    Ok(run.report)
}

struct CheckRun {
    report: CheckReport,
    failures: u32,
    waiting_for_more: bool,
    concluded: Option<VideoReport>,
}

impl CheckRun {
    fn absorb(&mut self, engine: &mut FeedEngine<HttpMedia, TokioScheduler>) {
        let index = engine.feed().active_index();
        for event in engine.drain_events() {
            match event {
                PlaybackEvent::Failure { error, .. } => {
                    if !matches!(error, PlaybackError::TiersExhausted { .. }) {
                        self.failures += 1;
                    }
                }
                PlaybackEvent::FirstFrame { video_id, tier, ttff } => {
                    self.concluded = Some(VideoReport {
                        video_id,
                        index,
                        failures: self.failures,
                        outcome: CheckOutcome::Played { tier, ttff },
                    });
                }
                PlaybackEvent::StatusChanged {
                    video_id,
                    to: PlaybackStatus::Error,
                    ..
                } => {
                    let error = engine
                        .playback()
                        .session()
                        .and_then(|s| s.last_error())
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "playback failed".into());
                    self.concluded = Some(VideoReport {
                        video_id,
                        index,
                        failures: self.failures,
                        outcome: CheckOutcome::Failed { error },
                    });
                }
                _ => {}
            }
        }
    }
}

/// Step to the next video. Returns `false` when there is nothing to step to.
fn advance(
    engine: &mut FeedEngine<HttpMedia, TokioScheduler>,
    source: &Arc<dyn FeedSource>,
    tx: &EventSender,
) -> bool {
    let before = engine.feed().active_index();
    let prefetch = engine.navigate(NavIntent::Next);
    fetch(source, prefetch, tx);
    engine.feed().active_index() != before
}

fn fetch(source: &Arc<dyn FeedSource>, request: Option<PageRequest>, tx: &EventSender) {
    if let Some(request) = request {
        runtime::spawn_fetch(source.clone(), request, tx.clone());
    }
}
