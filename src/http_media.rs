//! Headless media element that probes sources over HTTP.
//!
//! `load()` issues a ranged GET for the first bytes of the source. A
//! playable response produces `CanPlay`; a refused or non-video response
//! produces the matching media error. Each assigned source gets a new
//! epoch; events carry it so the driver can drop answers for a source
//! that has since been replaced.

use parking_lot::Mutex;
use reqwest::header::{CONTENT_TYPE, RANGE};
use reqwest::{Client, StatusCode};
use rf_playback::{MediaElement, MediaErrorCode, MediaEvent, NetworkState, PlayRejection, ReadyState};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::runtime::{EventSender, RuntimeEvent};

const PROBE_RANGE: &str = "bytes=0-65535";

#[derive(Debug, Default)]
struct ProbeState {
    ready: ReadyState,
    network: NetworkState,
    /// `play()` was called before the probe finished.
    play_requested: bool,
}

pub struct HttpMedia {
    client: Client,
    handle: Handle,
    tx: EventSender,
    source: Option<String>,
    epoch: Arc<AtomicU64>,
    state: Arc<Mutex<ProbeState>>,
    task: Option<JoinHandle<()>>,
    muted: bool,
}

impl HttpMedia {
    pub fn new(tx: EventSender, handle: Handle, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            });

        Self {
            client,
            handle,
            tx,
            source: None,
            epoch: Arc::new(AtomicU64::new(0)),
            state: Arc::new(Mutex::new(ProbeState::default())),
            task: None,
            muted: true,
        }
    }

    /// Epoch of the currently assigned source.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    fn reset(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.epoch.fetch_add(1, Ordering::SeqCst);
        *self.state.lock() = ProbeState::default();
    }

    fn emit(&self, event: MediaEvent) {
        let _ = self.tx.send(RuntimeEvent::Media {
            event,
            epoch: self.epoch(),
        });
    }
}

impl MediaElement for HttpMedia {
    fn set_source(&mut self, url: &str) {
        self.reset();
        self.source = Some(url.to_string());
    }

    fn clear_source(&mut self) {
        self.reset();
        self.source = None;
    }

    fn load(&mut self) {
        let Some(url) = self.source.clone() else {
            self.state.lock().network = NetworkState::NoSource;
            self.emit(MediaEvent::Error(MediaErrorCode::SrcNotSupported));
            return;
        };
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.state.lock().network = NetworkState::Loading;

        let client = self.client.clone();
        let tx = self.tx.clone();
        let state = self.state.clone();
        let epoch = self.epoch();
        self.task = Some(self.handle.spawn(async move {
            let outcome = probe(&client, &url).await;
            let mut events = Vec::new();
            {
                let mut state = state.lock();
                match outcome {
                    Ok(()) => {
                        state.ready = ReadyState::HaveEnoughData;
                        state.network = NetworkState::Idle;
                        events.push(MediaEvent::CanPlay);
                        if state.play_requested {
                            events.push(MediaEvent::Playing);
                        }
                    }
                    Err(code) => {
                        state.network = NetworkState::Idle;
                        events.push(MediaEvent::Error(code));
                    }
                }
            }
            for event in events {
                let _ = tx.send(RuntimeEvent::Media { event, epoch });
            }
        }));
    }

    fn play(&mut self) -> Result<(), PlayRejection> {
        if self.source.is_none() {
            return Err(PlayRejection::Aborted);
        }
        let ready = {
            let mut state = self.state.lock();
            state.play_requested = true;
            state.ready >= ReadyState::HaveFutureData
        };
        if ready {
            self.emit(MediaEvent::Playing);
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.state.lock().play_requested = false;
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn ready_state(&self) -> ReadyState {
        self.state.lock().ready
    }

    fn network_state(&self) -> NetworkState {
        self.state.lock().network
    }
}

impl Drop for HttpMedia {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Fetch the head of `url` and decide whether it looks playable.
async fn probe(client: &Client, url: &str) -> Result<(), MediaErrorCode> {
    let resp = client
        .get(url)
        .header(RANGE, PROBE_RANGE)
        .send()
        .await
        .map_err(|e| {
            tracing::debug!(url, error = %e, "Media probe request failed");
            MediaErrorCode::Network
        })?;

    let status = resp.status();
    if status.is_server_error() {
        tracing::debug!(url, %status, "Media probe server error");
        return Err(MediaErrorCode::Network);
    }
    if !(status.is_success() || status == StatusCode::PARTIAL_CONTENT) {
        tracing::debug!(url, %status, "Media probe refused");
        return Err(MediaErrorCode::SrcNotSupported);
    }

    let content_type = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();
    if !is_playable_content_type(&content_type) {
        tracing::debug!(url, content_type = %content_type, "Media probe returned non-video content");
        return Err(MediaErrorCode::SrcNotSupported);
    }

    resp.bytes().await.map_err(|e| {
        tracing::debug!(url, error = %e, "Media probe body failed");
        MediaErrorCode::Network
    })?;
    Ok(())
}

fn is_playable_content_type(content_type: &str) -> bool {
    let mime = content_type.split(';').next().unwrap_or("").trim();
    mime.starts_with("video/")
        || mime == "application/octet-stream"
        || mime == "application/vnd.apple.mpegurl"
        || mime == "application/x-mpegurl"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{channel, EventReceiver};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn media() -> (HttpMedia, EventReceiver) {
        let (tx, rx) = channel();
        (HttpMedia::new(tx, Handle::current(), Duration::from_secs(2)), rx)
    }

    async fn next_media_event(rx: &mut EventReceiver) -> (MediaEvent, u64) {
        match rx.recv().await {
            Some(RuntimeEvent::Media { event, epoch }) => (event, epoch),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn content_type_filter() {
        assert!(is_playable_content_type("video/mp4"));
        assert!(is_playable_content_type("application/vnd.apple.mpegurl; charset=utf-8"));
        assert!(!is_playable_content_type("text/html"));
        assert!(!is_playable_content_type(""));
    }

    #[tokio::test]
    async fn playable_source_reports_can_play_then_playing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/clip.mp4"))
            .and(header("range", PROBE_RANGE))
            .respond_with(
                ResponseTemplate::new(206)
                    .insert_header("content-type", "video/mp4")
                    .set_body_bytes(vec![0u8; 32]),
            )
            .mount(&server)
            .await;

        let (mut media, mut rx) = media();
        media.set_source(&format!("{}/clip.mp4", server.uri()));
        media.load();
        let (event, epoch) = next_media_event(&mut rx).await;
        assert_eq!(event, MediaEvent::CanPlay);
        assert_eq!(epoch, media.epoch());
        assert_eq!(media.ready_state(), ReadyState::HaveEnoughData);

        media.play().unwrap();
        assert_eq!(next_media_event(&mut rx).await.0, MediaEvent::Playing);
    }

    #[tokio::test]
    async fn html_response_is_not_supported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string("<html></html>"),
            )
            .mount(&server)
            .await;

        let (mut media, mut rx) = media();
        media.set_source(&format!("{}/clip.mp4", server.uri()));
        media.load();
        assert_eq!(
            next_media_event(&mut rx).await.0,
            MediaEvent::Error(MediaErrorCode::SrcNotSupported)
        );
    }

    #[tokio::test]
    async fn server_error_is_a_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let (mut media, mut rx) = media();
        media.set_source(&format!("{}/clip.mp4", server.uri()));
        media.load();
        assert_eq!(
            next_media_event(&mut rx).await.0,
            MediaEvent::Error(MediaErrorCode::Network)
        );
    }

    #[tokio::test]
    async fn replacing_source_bumps_epoch() {
        let (tx, _rx) = channel();
        let mut media = HttpMedia::new(tx, Handle::current(), Duration::from_secs(1));
        media.set_source("http://127.0.0.1:9/a.mp4");
        let first = media.epoch();
        media.set_source("http://127.0.0.1:9/b.mp4");
        assert!(media.epoch() > first);
        media.clear_source();
        assert_eq!(media.source(), None);
        assert_eq!(media.network_state(), NetworkState::Empty);
    }
}
