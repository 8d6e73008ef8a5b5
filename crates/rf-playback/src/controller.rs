//! Playback lifecycle for the single active video.
//!
//! One [`PlaybackController`] owns one media element. Activating a record
//! tears down the previous session (timers cancelled, source detached)
//! before the new source is assigned, so two loads never race. All
//! failure handling goes through [`RetryPolicy`]; the session's
//! [`RetryState`] is the only record of which candidate is loaded.

use parking_lot::Mutex;
use rf_core::{Tier, VideoId, VideoRecord, ViewerId};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::PlaybackError;
use crate::media::{MediaElement, MediaEvent, PlayRejection};
use crate::mute::{MuteStore, SubscriptionId};
use crate::retry::{RetryDecision, RetryPolicy, RetryState};
use crate::scheduler::{Scheduler, TimerKind, TimerToken, TokenIssuer};
use crate::source::{with_cache_buster, SourceCandidate, SourceResolver};
use crate::views::{ViewDeduper, ViewEvent, ViewSink};

// ---------------------------------------------------------------------------
// PlaybackStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of the active session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackStatus {
    Idle,
    Loading,
    Ready,
    Playing,
    Stalled,
    NeedsInteraction,
    Error,
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Loading => write!(f, "loading"),
            Self::Ready => write!(f, "ready"),
            Self::Playing => write!(f, "playing"),
            Self::Stalled => write!(f, "stalled"),
            Self::NeedsInteraction => write!(f, "needs_interaction"),
            Self::Error => write!(f, "error"),
        }
    }
}

// ---------------------------------------------------------------------------
// PlaybackEvent
// ---------------------------------------------------------------------------

/// Observable outcome queued by the controller for the host to drain.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlaybackEvent {
    StatusChanged {
        video_id: VideoId,
        from: PlaybackStatus,
        to: PlaybackStatus,
    },
    SourceSelected {
        video_id: VideoId,
        tier: Tier,
        url: String,
        attempt: u32,
    },
    /// First `playing` signal of the session.
    FirstFrame {
        video_id: VideoId,
        tier: Tier,
        ttff: Duration,
    },
    ViewReported {
        video_id: VideoId,
    },
    /// A failure, recovered or not.
    Failure {
        video_id: VideoId,
        attempt: u32,
        error: PlaybackError,
    },
}

// ---------------------------------------------------------------------------
// PlaybackSession
// ---------------------------------------------------------------------------

/// Ephemeral state for the one record being played.
#[derive(Debug)]
pub struct PlaybackSession {
    record: VideoRecord,
    candidates: Vec<SourceCandidate>,
    current_url: String,
    status: PlaybackStatus,
    retry: RetryState,
    last_error: Option<PlaybackError>,
    armed: Option<TimerToken>,
    source_assigned_at: Instant,
    stalled_at: Option<Instant>,
    first_frame: Option<Duration>,
    view_checked: bool,
}

impl PlaybackSession {
    pub fn video_id(&self) -> VideoId {
        self.record.id
    }

    pub fn record(&self) -> &VideoRecord {
        &self.record
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn candidates(&self) -> &[SourceCandidate] {
        &self.candidates
    }

    /// Index of the candidate currently loaded.
    pub fn tier_index(&self) -> usize {
        self.retry.index()
    }

    pub fn tier(&self) -> Tier {
        self.candidates[self.retry.index()].tier
    }

    pub fn current_url(&self) -> &str {
        &self.current_url
    }

    /// Failures so far.
    pub fn attempt(&self) -> u32 {
        self.retry.attempt()
    }

    pub fn last_error(&self) -> Option<&PlaybackError> {
        self.last_error.as_ref()
    }

    pub fn time_to_first_frame(&self) -> Option<Duration> {
        self.first_frame
    }
}

// ---------------------------------------------------------------------------
// PlaybackController
// ---------------------------------------------------------------------------

/// Collaborators shared by every controller on the playback surface.
#[derive(Clone)]
pub struct PlaybackContext {
    pub resolver: SourceResolver,
    pub policy: RetryPolicy,
    pub deduper: ViewDeduper,
    pub sink: Arc<dyn ViewSink>,
    pub mute: Arc<MuteStore>,
    pub viewer: Option<ViewerId>,
}

/// Drives one media element through load, stall, retry and fallback.
pub struct PlaybackController<M: MediaElement + 'static, S: Scheduler> {
    media: Arc<Mutex<M>>,
    scheduler: S,
    ctx: PlaybackContext,
    mute_subscription: SubscriptionId,
    tokens: TokenIssuer,
    session: Option<PlaybackSession>,
    events: Vec<PlaybackEvent>,
}

impl<M: MediaElement + 'static, S: Scheduler> PlaybackController<M, S> {
    pub fn new(media: M, scheduler: S, ctx: PlaybackContext) -> Self {
        let media = Arc::new(Mutex::new(media));
        media.lock().set_muted(ctx.mute.is_muted());

        let weak = Arc::downgrade(&media);
        let mute_subscription = ctx.mute.subscribe(move |muted| {
            if let Some(media) = weak.upgrade() {
                media.lock().set_muted(muted);
            }
        });

        Self {
            media,
            scheduler,
            ctx,
            mute_subscription,
            tokens: TokenIssuer::default(),
            session: None,
            events: Vec::new(),
        }
    }

    /// Shared handle to the media element.
    pub fn media(&self) -> &Arc<Mutex<M>> {
        &self.media
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    pub fn status(&self) -> PlaybackStatus {
        self.session
            .as_ref()
            .map_or(PlaybackStatus::Idle, |s| s.status)
    }

    pub fn active_video(&self) -> Option<VideoId> {
        self.session.as_ref().map(|s| s.record.id)
    }

    pub fn set_viewer(&mut self, viewer: Option<ViewerId>) {
        self.ctx.viewer = viewer;
    }

    /// Take every event queued since the last drain.
    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut self.events)
    }

    // -----------------------------------------------------------------------
    // Activation
    // -----------------------------------------------------------------------

    /// Make `record` the active video, replacing any existing session.
    pub fn activate(&mut self, record: VideoRecord) {
        if self.active_video() == Some(record.id) {
            tracing::debug!(video_id = %record.id, "Record already active");
            return;
        }
        self.deactivate();

        let candidates = self.ctx.resolver.candidates(&record, false);
        let first = candidates[0].url.clone();
        tracing::debug!(
            video_id = %record.id,
            candidates = candidates.len(),
            "Activating playback session"
        );

        self.session = Some(PlaybackSession {
            record,
            candidates,
            current_url: String::new(),
            status: PlaybackStatus::Idle,
            retry: RetryState::new(),
            last_error: None,
            armed: None,
            source_assigned_at: Instant::now(),
            stalled_at: None,
            first_frame: None,
            view_checked: false,
        });
        self.start_load(first);
    }

    /// Tear down the active session: cancel timers and detach the source.
    pub fn deactivate(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        if let Some(token) = session.armed.take() {
            self.scheduler.cancel(token);
        }
        {
            let mut media = self.media.lock();
            media.pause();
            media.clear_source();
        }

        tracing::debug!(
            video_id = %session.record.id,
            status = %session.status,
            "Playback session torn down"
        );
        if session.status != PlaybackStatus::Idle {
            self.events.push(PlaybackEvent::StatusChanged {
                video_id: session.record.id,
                from: session.status,
                to: PlaybackStatus::Idle,
            });
        }
    }

    // -----------------------------------------------------------------------
    // User actions
    // -----------------------------------------------------------------------

    /// Manual retry from the error state. Returns `false` if not in error.
    pub fn retry(&mut self) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if session.status != PlaybackStatus::Error {
            return false;
        }

        session.candidates = self.ctx.resolver.candidates(&session.record, true);
        session.retry = RetryState::new();
        session.last_error = None;
        let first = session.candidates[0].url.clone();
        tracing::info!(video_id = %session.record.id, "Manual playback retry");
        self.start_load(first);
        true
    }

    /// User tap while autoplay is blocked.
    pub fn resume(&mut self) -> bool {
        if self.status() != PlaybackStatus::NeedsInteraction {
            return false;
        }
        let result = self.media.lock().play();
        match result {
            Ok(()) => true,
            Err(rejection) => {
                tracing::debug!(?rejection, "Play still refused after user tap");
                false
            }
        }
    }

    /// Flip the shared mute flag; every subscribed surface updates.
    pub fn toggle_mute(&self) -> bool {
        self.ctx.mute.toggle()
    }

    // -----------------------------------------------------------------------
    // Host callbacks
    // -----------------------------------------------------------------------

    /// Feed a media element signal into the state machine.
    pub fn handle_media_event(&mut self, event: MediaEvent) {
        let Some(status) = self.session.as_ref().map(|s| s.status) else {
            tracing::trace!(?event, "Media event with no active session");
            return;
        };

        match (event, status) {
            (MediaEvent::CanPlay, PlaybackStatus::Loading | PlaybackStatus::Stalled) => {
                self.disarm();
                self.set_status(PlaybackStatus::Ready);
                self.try_autoplay();
            }
            (
                MediaEvent::Playing,
                PlaybackStatus::Loading
                | PlaybackStatus::Ready
                | PlaybackStatus::Stalled
                | PlaybackStatus::NeedsInteraction,
            ) => {
                self.disarm();
                self.set_status(PlaybackStatus::Playing);
                self.on_playing();
            }
            (MediaEvent::Waiting | MediaEvent::Stalled, PlaybackStatus::Ready | PlaybackStatus::Playing) => {
                self.enter_stall();
            }
            (MediaEvent::Waiting | MediaEvent::Stalled, PlaybackStatus::Loading) => {
                // The armed load timeout stays in charge of this attempt.
                tracing::debug!(?event, "Buffering while loading");
                if let Some(session) = self.session.as_mut() {
                    session.stalled_at = Some(Instant::now());
                }
                self.set_status(PlaybackStatus::Stalled);
            }
            (
                MediaEvent::Error(code),
                PlaybackStatus::Loading
                | PlaybackStatus::Ready
                | PlaybackStatus::Playing
                | PlaybackStatus::Stalled,
            ) => {
                let tier = self.current_tier();
                self.fail(PlaybackError::Media { tier, code });
            }
            (event, status) => {
                tracing::trace!(?event, %status, "Media event ignored in current state");
            }
        }
    }

    /// A scheduled timer fired. Tokens that are not the currently armed
    /// one belong to a torn-down session or an earlier load and are ignored.
    pub fn handle_timer(&mut self, token: TimerToken) {
        let Some(session) = self.session.as_mut() else {
            tracing::trace!(?token, "Timer fired with no active session");
            return;
        };
        if session.armed != Some(token) {
            tracing::trace!(?token, "Stale timer ignored");
            return;
        }
        session.armed = None;

        let tier = session.candidates[session.retry.index()].tier;
        match (token.kind(), session.status) {
            (TimerKind::LoadTimeout, PlaybackStatus::Loading | PlaybackStatus::Stalled) => {
                let after = session.source_assigned_at.elapsed();
                self.fail(PlaybackError::LoadTimeout { tier, after });
            }
            (TimerKind::StallWatchdog, PlaybackStatus::Stalled) => {
                let after = session
                    .stalled_at
                    .map_or(Duration::ZERO, |t| t.elapsed());
                self.fail(PlaybackError::Stall { tier, after });
            }
            (kind, status) => {
                tracing::trace!(?kind, %status, "Timer fired in unrelated state");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn current_tier(&self) -> Tier {
        self.session.as_ref().map_or(Tier::Original, |s| s.tier())
    }

    fn set_status(&mut self, to: PlaybackStatus) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let from = session.status;
        if from == to {
            return;
        }
        session.status = to;
        tracing::debug!(video_id = %session.record.id, %from, %to, "Playback status");
        self.events.push(PlaybackEvent::StatusChanged {
            video_id: session.record.id,
            from,
            to,
        });
    }

    fn arm(&mut self, kind: TimerKind, after: Duration) {
        self.disarm();
        let token = self.tokens.issue(kind);
        if let Some(session) = self.session.as_mut() {
            session.armed = Some(token);
            self.scheduler.schedule(token, after);
        }
    }

    fn disarm(&mut self) {
        if let Some(token) = self.session.as_mut().and_then(|s| s.armed.take()) {
            self.scheduler.cancel(token);
        }
    }

    fn start_load(&mut self, url: String) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let tier = session.tier();
        let attempt = session.retry.attempt();
        let video_id = session.record.id;
        session.current_url = url.clone();
        session.source_assigned_at = Instant::now();
        session.stalled_at = None;

        {
            let mut media = self.media.lock();
            media.set_source(&url);
            media.set_muted(self.ctx.mute.is_muted());
            media.load();
        }

        tracing::debug!(%video_id, %tier, attempt, url = %url, "Source assigned");
        self.events.push(PlaybackEvent::SourceSelected {
            video_id,
            tier,
            url,
            attempt,
        });
        self.set_status(PlaybackStatus::Loading);
        self.arm(TimerKind::LoadTimeout, self.ctx.policy.load_timeout(tier));
    }

    fn try_autoplay(&mut self) {
        let result = self.media.lock().play();
        match result {
            Ok(()) => {}
            Err(PlayRejection::NotAllowed) => {
                if let Some(session) = self.session.as_mut() {
                    session.last_error = Some(PlaybackError::AutoplayBlocked);
                    tracing::info!(video_id = %session.record.id, "Autoplay blocked");
                }
                self.set_status(PlaybackStatus::NeedsInteraction);
            }
            Err(PlayRejection::Aborted) => {
                tracing::debug!("Play request aborted");
            }
        }
    }

    fn enter_stall(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.stalled_at = Some(Instant::now());
        }
        self.set_status(PlaybackStatus::Stalled);
        self.arm(TimerKind::StallWatchdog, self.ctx.policy.stall_timeout());
    }

    fn on_playing(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.stalled_at = None;
        if session.first_frame.is_some() {
            return;
        }

        let ttff = session.source_assigned_at.elapsed();
        let video_id = session.record.id;
        let tier = session.tier();
        session.first_frame = Some(ttff);
        tracing::info!(
            %video_id,
            %tier,
            ttff_ms = ttff.as_millis() as u64,
            attempt = session.retry.attempt(),
            "First frame"
        );
        self.events.push(PlaybackEvent::FirstFrame {
            video_id,
            tier,
            ttff,
        });

        if !session.view_checked {
            session.view_checked = true;
            if self.ctx.deduper.should_report(video_id) {
                self.ctx.sink.record_view(ViewEvent {
                    video_id,
                    viewer_id: self.ctx.viewer,
                });
                self.events.push(PlaybackEvent::ViewReported { video_id });
            }
        }
    }

    fn fail(&mut self, error: PlaybackError) {
        self.disarm();
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let video_id = session.record.id;
        let decision = self
            .ctx
            .policy
            .on_failure(&mut session.retry, session.candidates.len());
        let attempt = session.retry.attempt();

        tracing::warn!(
            %video_id,
            attempt,
            elapsed_ms = session.retry.elapsed().as_millis() as u64,
            error = %error,
            "Playback failure"
        );
        session.last_error = Some(error.clone());
        self.events.push(PlaybackEvent::Failure {
            video_id,
            attempt,
            error,
        });
        self.set_status(PlaybackStatus::Stalled);

        match decision {
            RetryDecision::Escalate { index } => {
                let url = self.candidate_url(index);
                self.start_load(url);
            }
            RetryDecision::Reload { index, cache_bust } => {
                let url = with_cache_buster(&self.candidate_url(index), &cache_bust.to_string());
                self.start_load(url);
            }
            RetryDecision::Exhausted => {
                let exhausted = PlaybackError::TiersExhausted { attempts: attempt };
                tracing::warn!(%video_id, attempt, "All playback sources exhausted");
                self.media.lock().pause();
                if let Some(session) = self.session.as_mut() {
                    session.last_error = Some(exhausted.clone());
                }
                self.events.push(PlaybackEvent::Failure {
                    video_id,
                    attempt,
                    error: exhausted,
                });
                self.set_status(PlaybackStatus::Error);
            }
        }
    }

    fn candidate_url(&self, index: usize) -> String {
        self.session
            .as_ref()
            .map(|s| s.candidates[index].url.clone())
            .unwrap_or_default()
    }
}

impl<M: MediaElement + 'static, S: Scheduler> Drop for PlaybackController<M, S> {
    fn drop(&mut self) {
        self.deactivate();
        self.ctx.mute.unsubscribe(self.mute_subscription);
    }
}
