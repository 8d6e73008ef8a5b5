//! Source resolution: video record to ordered candidate URLs.
//!
//! Pure mapping, no I/O. The candidate list is ordered highest preference
//! first and always ends with the original upload.

use rf_core::config::SourcesConfig;
use rf_core::{Tier, VideoRecord};
use serde::Serialize;

/// Query parameter appended to force a fresh fetch.
pub const CACHE_BUSTER_PARAM: &str = "_rf";

/// One playable URL and the tier it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceCandidate {
    pub tier: Tier,
    pub url: String,
}

/// Maps records to candidate lists and poster URLs.
#[derive(Debug, Clone)]
pub struct SourceResolver {
    transform_base: Option<String>,
    video_transformation: String,
    poster_transformation: String,
    native_hls: bool,
}

impl SourceResolver {
    pub fn new(config: &SourcesConfig) -> Self {
        Self {
            transform_base: config
                .transform_base_url
                .as_deref()
                .map(|u| u.trim().trim_end_matches('/').to_string())
                .filter(|u| !u.is_empty()),
            video_transformation: config.video_transformation.clone(),
            poster_transformation: config.poster_transformation.clone(),
            native_hls: config.native_hls,
        }
    }

    /// Resolve the ordered candidate list for `record`.
    ///
    /// When `fallback_requested` is set the transformed URL carries a
    /// cache-busting suffix, since the caller has already seen it fail.
    /// Tiers whose field is absent are skipped, as are tiers that point at
    /// the original upload itself.
    pub fn candidates(&self, record: &VideoRecord, fallback_requested: bool) -> Vec<SourceCandidate> {
        let original = record.original_url();
        let mut out = Vec::with_capacity(Tier::ALL.len());

        let mut push = |tier: Tier, url: String| {
            if url != original && !out.iter().any(|c: &SourceCandidate| c.url == url) {
                out.push(SourceCandidate { tier, url });
            }
        };

        if let Some(url) = self.transformed_video_url(record) {
            let url = if fallback_requested {
                with_cache_buster(&url, "fallback")
            } else {
                url
            };
            push(Tier::Transformed, url);
        }
        if let Some(url) = record.optimized_url() {
            push(Tier::Optimized, url.to_string());
        }
        if self.native_hls {
            if let Some(url) = record.stream_url() {
                push(Tier::Stream, url.to_string());
            }
        }

        out.push(SourceCandidate {
            tier: Tier::Original,
            url: original.to_string(),
        });
        out
    }

    /// Resolve the poster image with the same tier preference.
    pub fn poster(&self, record: &VideoRecord) -> Option<String> {
        self.transformed_poster_url(record)
            .or_else(|| record.optimized_thumbnail_url().map(str::to_string))
            .or_else(|| record.thumbnail_url().map(str::to_string))
    }

    fn transformed_video_url(&self, record: &VideoRecord) -> Option<String> {
        let base = self.transform_base.as_deref()?;
        let asset = record.asset_id()?;
        Some(format!(
            "{base}/video/upload/{}/{asset}.mp4",
            self.video_transformation
        ))
    }

    fn transformed_poster_url(&self, record: &VideoRecord) -> Option<String> {
        let base = self.transform_base.as_deref()?;
        let asset = record.asset_id()?;
        Some(format!(
            "{base}/video/upload/{}/{asset}.jpg",
            self.poster_transformation
        ))
    }
}

/// Append a uniquifying query parameter, respecting any existing query
/// string and fragment.
pub fn with_cache_buster(url: &str, token: &str) -> String {
    let (head, fragment) = match url.split_once('#') {
        Some((h, f)) => (h, Some(f)),
        None => (url, None),
    };
    let sep = if head.contains('?') { '&' } else { '?' };
    let mut out = format!("{head}{sep}{CACHE_BUSTER_PARAM}={token}");
    if let Some(f) = fragment {
        out.push('#');
        out.push_str(f);
    }
    out
}
