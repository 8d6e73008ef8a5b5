//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries the
//! backend connection, source-tier settings, playback tuning, gesture
//! thresholds, and feed paging. Every section defaults sensibly so a
//! completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::video::Tier;
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub sources: SourcesConfig,
    pub playback: PlaybackConfig,
    pub gestures: GestureConfig,
    pub feed: FeedConfig,
    pub device: DeviceConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.backend.base_url.trim().is_empty() {
            warnings.push("backend.base_url is empty; feed fetches will fail".into());
        }
        if self.backend.request_timeout_secs == 0 {
            warnings.push("backend.request_timeout_secs is 0".into());
        }

        let p = &self.playback;
        for tier in Tier::ALL {
            if p.load_timeout_ms(tier) == 0 {
                warnings.push(format!("playback timeout for tier '{tier}' is 0"));
            }
        }
        if p.stall_timeout_ms == 0 {
            warnings.push("playback.stall_timeout_ms is 0".into());
        }
        if p.transformed_timeout_ms > p.original_timeout_ms {
            warnings.push(
                "playback.transformed_timeout_ms exceeds original_timeout_ms; \
                 a slow transform will hold the feed longer than the upload would"
                    .into(),
            );
        }
        if p.max_attempts == 0 {
            warnings.push("playback.max_attempts is 0; every failure becomes terminal".into());
        }

        if self.gestures.wheel_threshold <= 0.0 {
            warnings.push("gestures.wheel_threshold must be positive".into());
        }
        if self.gestures.touch_min_distance <= 0.0 {
            warnings.push("gestures.touch_min_distance must be positive".into());
        }

        if self.feed.page_size == 0 {
            warnings.push("feed.page_size is 0".into());
        } else if self.feed.prefetch_lookahead >= self.feed.page_size {
            warnings.push(format!(
                "feed.prefetch_lookahead ({}) is not smaller than feed.page_size ({})",
                self.feed.prefetch_lookahead, self.feed.page_size
            ));
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Remote data service connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Ranking endpoint for the personalized feed.
    pub feed_path: String,
    /// Listing/query endpoint for the videos table.
    pub videos_path: String,
    /// Insert endpoint for view events.
    pub views_path: String,
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: None,
            feed_path: "/functions/v1/feed".into(),
            videos_path: "/rest/v1/videos".into(),
            views_path: "/rest/v1/video_views".into(),
            request_timeout_secs: 10,
        }
    }
}

/// Inputs to source resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Root of the transcoding service. `None` disables the transformed tier.
    pub transform_base_url: Option<String>,
    pub video_transformation: String,
    pub poster_transformation: String,
    /// Client can play streaming manifests natively.
    pub native_hls: bool,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            transform_base_url: None,
            video_transformation: "q_auto,f_auto,w_720".into(),
            poster_transformation: "so_0,q_auto,w_480".into(),
            native_hls: false,
        }
    }
}

/// Load/stall budgets and retry limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub transformed_timeout_ms: u64,
    pub optimized_timeout_ms: u64,
    pub stream_timeout_ms: u64,
    pub original_timeout_ms: u64,
    /// Grace period for a buffering signal after playback has started.
    pub stall_timeout_ms: u64,
    /// Total failures tolerated per session before the error state.
    pub max_attempts: u32,
    pub start_muted: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            transformed_timeout_ms: 4_000,
            optimized_timeout_ms: 6_000,
            stream_timeout_ms: 8_000,
            original_timeout_ms: 8_000,
            stall_timeout_ms: 5_000,
            max_attempts: 4,
            start_muted: true,
        }
    }
}

impl PlaybackConfig {
    pub fn load_timeout_ms(&self, tier: Tier) -> u64 {
        match tier {
            Tier::Transformed => self.transformed_timeout_ms,
            Tier::Optimized => self.optimized_timeout_ms,
            Tier::Stream => self.stream_timeout_ms,
            Tier::Original => self.original_timeout_ms,
        }
    }

    pub fn load_timeout(&self, tier: Tier) -> Duration {
        Duration::from_millis(self.load_timeout_ms(tier))
    }

    pub fn stall_timeout(&self) -> Duration {
        Duration::from_millis(self.stall_timeout_ms)
    }
}

/// Wheel/touch to discrete-navigation thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Accumulated wheel delta that fires one navigation step.
    pub wheel_threshold: f64,
    /// Quiet period after which a partial wheel accumulation is dropped.
    pub wheel_idle_reset_ms: u64,
    /// Input is ignored for this long after a navigation step.
    pub lock_ms: u64,
    /// Minimum vertical travel for a swipe.
    pub touch_min_distance: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            wheel_threshold: 50.0,
            wheel_idle_reset_ms: 200,
            lock_ms: 600,
            touch_min_distance: 50.0,
        }
    }
}

/// Paging and prefetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub page_size: usize,
    /// Fetch the next page once the active index is this close to the end.
    pub prefetch_lookahead: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            prefetch_lookahead: 3,
        }
    }
}

/// Device-local persisted flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub state_path: PathBuf,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            state_path: PathBuf::from("./data/reelfeed-device.json"),
        }
    }
}
