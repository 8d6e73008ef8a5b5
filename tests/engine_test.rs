//! Integration tests for the feed engine: one active session, gesture
//! navigation, paging, and view reporting across navigation.

mod common;

use std::time::{Duration, Instant};

use common::{records, EngineHarness};
use rf_core::{Error, FeedFilter};
use rf_feed::{NavKey, PageOutcome};
use rf_playback::testing::MediaCall;
use rf_playback::{MediaErrorCode, MediaEvent, PlayRejection, PlaybackStatus};

#[test]
fn first_page_activates_first_video() {
    let mut h = EngineHarness::new();
    let recs = records(3);
    let outcome = h.load_with(recs.clone());
    assert!(matches!(outcome, PageOutcome::Appended { added: 3, .. }));

    assert_eq!(h.engine.feed().active_index(), 0);
    assert_eq!(h.engine.playback().active_video(), Some(recs[0].id));
    assert_eq!(h.engine.status(), PlaybackStatus::Loading);
    assert_eq!(h.media_source().as_deref(), Some(recs[0].video_url.as_str()));
}

#[test]
fn empty_feed_leaves_playback_idle() {
    let mut h = EngineHarness::new();
    let outcome = h.load_with(Vec::new());
    assert!(matches!(outcome, PageOutcome::Appended { added: 0, .. }));
    assert_eq!(h.engine.status(), PlaybackStatus::Idle);
    assert_eq!(h.engine.playback().active_video(), None);
}

#[test]
fn navigation_moves_the_single_session() {
    let mut h = EngineHarness::new();
    let recs = records(3);
    h.load_with(recs.clone());
    let old_timer = h.armed().expect("load timeout armed");

    let t0 = Instant::now();
    h.engine.on_wheel(120.0, t0);
    assert_eq!(h.engine.feed().active_index(), 1);
    assert_eq!(h.engine.playback().active_video(), Some(recs[1].id));
    assert_eq!(h.active_id(), h.engine.playback().active_video());
    assert!(h.engine.playback().scheduler().was_cancelled(old_timer));

    // The previous session's timer firing late changes nothing.
    h.engine.handle_timer(old_timer);
    let session = h.engine.playback().session().unwrap();
    assert_eq!(session.attempt(), 0);
    assert_eq!(session.status(), PlaybackStatus::Loading);

    let media = h.engine.playback().media().lock();
    assert!(media.calls.contains(&MediaCall::ClearSource));
    assert_eq!(media.source.as_deref(), Some(recs[1].video_url.as_str()));
}

#[test]
fn gesture_lock_swallows_rapid_input() {
    let mut h = EngineHarness::new();
    h.load_with(records(5));

    let t0 = Instant::now();
    h.engine.on_key(NavKey::Down, t0);
    h.engine.on_wheel(300.0, t0 + Duration::from_millis(50));
    h.engine.on_touch_start(600.0);
    h.engine.on_touch_end(100.0, t0 + Duration::from_millis(100));
    assert_eq!(h.engine.feed().active_index(), 1);

    h.engine.on_key(NavKey::Down, t0 + Duration::from_millis(700));
    assert_eq!(h.engine.feed().active_index(), 2);
}

#[test]
fn navigation_clamps_at_both_ends() {
    let mut h = EngineHarness::new();
    let recs = records(2);
    h.load_with(recs.clone());

    let t0 = Instant::now();
    h.engine.on_key(NavKey::Up, t0);
    assert_eq!(h.engine.feed().active_index(), 0);
    assert_eq!(h.engine.playback().active_video(), Some(recs[0].id));

    h.engine.go_to(10);
    assert_eq!(h.engine.feed().active_index(), 1);
    h.engine.on_key(NavKey::Down, t0 + Duration::from_secs(5));
    assert_eq!(h.engine.feed().active_index(), 1);
}

#[test]
fn view_reported_once_per_video_until_reload() {
    let mut h = EngineHarness::new();
    let recs = records(3);
    h.load_with(recs.clone());

    h.play_active();
    assert_eq!(h.sink.events().len(), 1);

    h.engine.go_to(1);
    h.play_active();
    h.engine.go_to(0);
    h.play_active();
    h.engine.go_to(1);
    h.play_active();

    let events = h.sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].video_id, recs[0].id);
    assert_eq!(events[1].video_id, recs[1].id);

    // A reload is a new feed instance.
    h.load_with(recs.clone());
    h.play_active();
    assert_eq!(h.sink.events().len(), 3);
}

#[test]
fn load_stops_playback_immediately() {
    let mut h = EngineHarness::new();
    h.load_with(records(2));
    h.play_active();
    assert_eq!(h.engine.status(), PlaybackStatus::Playing);

    let req = h.engine.load(FeedFilter::tag("music"), None);
    assert_eq!(h.engine.status(), PlaybackStatus::Idle);
    assert_eq!(h.media_source(), None);

    let recs = records(2);
    h.answer(&req, recs.clone());
    assert_eq!(h.engine.playback().active_video(), Some(recs[0].id));
}

#[test]
fn stale_page_does_not_start_playback() {
    let mut h = EngineHarness::new();
    let old = h.engine.load(FeedFilter::default(), None);
    let fresh = h.engine.load(FeedFilter::query("cats"), None);

    assert_eq!(h.answer(&old, records(3)), PageOutcome::Stale);
    assert_eq!(h.engine.status(), PlaybackStatus::Idle);

    let recs = records(1);
    h.answer(&fresh, recs.clone());
    assert_eq!(h.engine.playback().active_video(), Some(recs[0].id));
}

#[test]
fn navigation_near_end_requests_next_page() {
    let mut h = EngineHarness::with_paging(4, 1);
    h.load_with(records(4));

    assert!(h.engine.go_to(1).is_none());
    let next = h.engine.go_to(2).expect("prefetch near the end");
    assert_eq!(next.page, 1);
    assert!(h.engine.go_to(3).is_none(), "already in flight");

    let more = records(4);
    h.answer(&next, more.clone());
    assert_eq!(h.engine.feed().len(), 8);
    // Appending does not move the active video.
    assert_eq!(h.engine.feed().active_index(), 3);
}

#[test]
fn failed_page_waits_for_manual_retry() {
    let mut h = EngineHarness::with_paging(3, 1);
    h.load_with(records(3));
    let next = h.engine.go_to(1).expect("prefetch");

    let outcome = h
        .engine
        .complete_page(&next, Err(Error::Http("connection reset".into())));
    assert!(matches!(outcome, PageOutcome::Failed(_)));
    assert!(h.engine.go_to(2).is_none());
    assert_eq!(h.engine.status(), PlaybackStatus::Loading, "playback unaffected");

    let again = h.engine.retry_feed().expect("retry issues the page again");
    assert_eq!(again.page, 1);
}

#[test]
fn tap_resumes_blocked_autoplay() {
    let mut h = EngineHarness::new();
    h.load_with(records(1));
    h.engine.playback().media().lock().reject_play = Some(PlayRejection::NotAllowed);

    h.engine.handle_media_event(MediaEvent::CanPlay);
    assert_eq!(h.engine.status(), PlaybackStatus::NeedsInteraction);
    let muted = h.mute.is_muted();

    h.engine.playback().media().lock().reject_play = None;
    h.engine.tap();
    assert_eq!(h.mute.is_muted(), muted, "tap resumes rather than toggling mute");
    h.engine.handle_media_event(MediaEvent::Playing);
    assert_eq!(h.engine.status(), PlaybackStatus::Playing);
}

#[test]
fn tap_toggles_shared_mute_while_playing() {
    let mut h = EngineHarness::new();
    h.load_with(records(2));
    h.play_active();
    assert!(h.mute.is_muted());

    h.engine.tap();
    assert!(!h.mute.is_muted());
    assert!(!h.engine.playback().media().lock().muted);

    // The next session starts with the shared state.
    h.engine.go_to(1);
    assert!(!h.engine.playback().media().lock().muted);
}

#[test]
fn playback_error_then_manual_retry_busts_transformed_cache() {
    let mut config = rf_core::config::Config::default();
    config.playback.max_attempts = 2;
    config.sources.transform_base_url = Some("https://media.example.com".into());
    let mut h = EngineHarness::with_config(config);
    let mut recs = records(1);
    recs[0].asset_id = Some("clips/abc".into());
    h.load_with(recs.clone());
    let transformed = h.media_source().unwrap();
    assert!(transformed.ends_with("/clips/abc.mp4"));

    h.engine
        .handle_media_event(MediaEvent::Error(MediaErrorCode::Network));
    assert_eq!(h.media_source().as_deref(), Some(recs[0].video_url.as_str()));
    h.engine
        .handle_media_event(MediaEvent::Error(MediaErrorCode::Network));
    assert_eq!(h.engine.status(), PlaybackStatus::Error);
    assert!(h.engine.retry_feed().is_none(), "feed is unaffected");

    assert!(h.engine.retry_playback());
    assert_eq!(h.engine.status(), PlaybackStatus::Loading);
    assert_eq!(
        h.media_source().as_deref(),
        Some(format!("{transformed}?_rf=fallback").as_str())
    );
}
