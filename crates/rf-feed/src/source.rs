//! Remote feed backend.
//!
//! [`FeedSource`] is the seam the runtime fetches pages through.
//! [`HttpFeedSource`] talks to the managed data service: the ranking
//! endpoint for the personalized feed, the videos table for the
//! reverse-chronological fallback and for filtered queries, and the views
//! table for telemetry.

use reqwest::{Client, RequestBuilder};
use rf_core::config::BackendConfig;
use rf_core::{Error, FeedPage, Result, UserId, VideoRecord};
use rf_playback::ViewEvent;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::controller::PageRequest;

/// Fetches feed pages and records views.
#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_page(&self, request: &PageRequest) -> Result<FeedPage>;

    async fn record_view(&self, event: &ViewEvent) -> Result<()>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RankedRequest {
    user_id: Option<UserId>,
    page: u32,
    limit: usize,
}

#[derive(Debug, Deserialize)]
struct RankedResponse {
    videos: Option<Vec<VideoRecord>>,
}

pub struct HttpFeedSource {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    feed_path: String,
    videos_path: String,
    views_path: String,
}

impl HttpFeedSource {
    pub fn new(config: &BackendConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            });

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            feed_path: config.feed_path.clone(),
            videos_path: config.videos_path.clone(),
            views_path: config.views_path.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder
                .header("apikey", key)
                .header("Authorization", format!("Bearer {key}")),
            None => builder,
        }
    }

    async fn send_json<T: serde::de::DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let resp = self
            .authorized(builder)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::backend(status, body));
        }

        resp.json::<T>()
            .await
            .map_err(|e| Error::Decode(e.to_string()))
    }

    /// Personalized ranking; `None` when the service gave no ranking.
    async fn fetch_ranked(&self, request: &PageRequest) -> Result<Option<Vec<VideoRecord>>> {
        let body = RankedRequest {
            user_id: request.user_id,
            page: request.page,
            limit: request.limit,
        };
        let resp: RankedResponse = self
            .send_json(self.client.post(self.url(&self.feed_path)).json(&body))
            .await?;
        Ok(resp.videos)
    }

    /// Reverse-chronological listing.
    async fn fetch_recent(&self, request: &PageRequest) -> Result<Vec<VideoRecord>> {
        let offset = (request.page as usize * request.limit).to_string();
        let limit = request.limit.to_string();
        let builder = self.client.get(self.url(&self.videos_path)).query(&[
            ("select", "*"),
            ("order", "created_at.desc"),
            ("offset", offset.as_str()),
            ("limit", limit.as_str()),
        ]);
        self.send_json(builder).await
    }

    /// Free-text and/or tag query.
    async fn fetch_filtered(&self, request: &PageRequest) -> Result<Vec<VideoRecord>> {
        let offset = (request.page as usize * request.limit).to_string();
        let limit = request.limit.to_string();
        let mut params: Vec<(&str, String)> = vec![
            ("select", "*".into()),
            ("order", "created_at.desc".into()),
            ("offset", offset),
            ("limit", limit),
        ];
        if let Some(q) = request.filter.query_text() {
            params.push(("caption", format!("ilike.*{q}*")));
        }
        let tags: Vec<&str> = request
            .filter
            .tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect();
        if !tags.is_empty() {
            params.push(("tags", format!("cs.{{{}}}", tags.join(","))));
        }
        let builder = self.client.get(self.url(&self.videos_path)).query(&params);
        self.send_json(builder).await
    }
}

#[async_trait::async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch_page(&self, request: &PageRequest) -> Result<FeedPage> {
        let records = if request.filter.is_empty() {
            match self.fetch_ranked(request).await {
                Ok(Some(videos)) => videos,
                Ok(None) => {
                    tracing::info!(page = request.page, "No ranking returned; using recent listing");
                    self.fetch_recent(request).await?
                }
                Err(e) => {
                    tracing::warn!(page = request.page, error = %e, "Ranking failed; using recent listing");
                    self.fetch_recent(request).await?
                }
            }
        } else {
            self.fetch_filtered(request).await?
        };

        Ok(FeedPage::from_records(records, request.page, request.limit))
    }

    async fn record_view(&self, event: &ViewEvent) -> Result<()> {
        let builder = self
            .client
            .post(self.url(&self.views_path))
            .header("Prefer", "return=minimal")
            .json(event);
        let resp = self
            .authorized(builder)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::backend(status, body));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rf_core::{FeedFilter, VideoId};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source(server: &MockServer) -> HttpFeedSource {
        HttpFeedSource::new(&BackendConfig {
            base_url: server.uri(),
            api_key: Some("anon-key".into()),
            ..BackendConfig::default()
        })
    }

    fn request(page: u32, limit: usize, filter: FeedFilter) -> PageRequest {
        PageRequest {
            generation: 1,
            page,
            limit,
            filter,
            user_id: None,
        }
    }

    fn rows(n: usize) -> serde_json::Value {
        let rows: Vec<serde_json::Value> = (0..n)
            .map(|i| {
                json!({
                    "id": VideoId::new().to_string(),
                    "video_url": format!("https://store.example.com/u/{i}.mp4"),
                })
            })
            .collect();
        json!(rows)
    }

    #[tokio::test]
    async fn ranked_feed_is_used_when_available() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/functions/v1/feed"))
            .and(header("apikey", "anon-key"))
            .and(body_partial_json(json!({"page": 0, "limit": 2, "userId": null})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"videos": rows(2)})))
            .expect(1)
            .mount(&server)
            .await;

        let page = source(&server)
            .fetch_page(&request(0, 2, FeedFilter::default()))
            .await
            .unwrap();
        assert_eq!(page.records.len(), 2);
        assert!(!page.exhausted);
    }

    #[tokio::test]
    async fn ranking_error_falls_back_to_recent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/functions/v1/feed"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/videos"))
            .and(query_param("order", "created_at.desc"))
            .and(query_param("offset", "4"))
            .and(query_param("limit", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(rows(1)))
            .expect(1)
            .mount(&server)
            .await;

        let page = source(&server)
            .fetch_page(&request(2, 2, FeedFilter::default()))
            .await
            .unwrap();
        assert_eq!(page.records.len(), 1);
        assert!(page.exhausted);
        assert_eq!(page.page, 2);
    }

    #[tokio::test]
    async fn missing_ranking_falls_back_to_recent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/functions/v1/feed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/videos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(rows(3)))
            .expect(1)
            .mount(&server)
            .await;

        let page = source(&server)
            .fetch_page(&request(0, 3, FeedFilter::default()))
            .await
            .unwrap();
        assert_eq!(page.records.len(), 3);
    }

    #[tokio::test]
    async fn filtered_query_tolerates_zero_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/videos"))
            .and(query_param("caption", "ilike.*cats*"))
            .and(query_param("tags", "cs.{funny,pets}"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let filter = FeedFilter {
            query: Some("cats".into()),
            tags: vec!["funny".into(), " ".into(), "pets".into()],
        };
        let page = source(&server).fetch_page(&request(0, 10, filter)).await.unwrap();
        assert!(page.records.is_empty());
        assert!(page.exhausted);
    }

    #[tokio::test]
    async fn filtered_backend_error_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/videos"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = source(&server)
            .fetch_page(&request(0, 10, FeedFilter::tag("music")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Backend { status: 503, .. }));
    }

    #[tokio::test]
    async fn record_view_posts_event() {
        let server = MockServer::start().await;
        let video_id = VideoId::new();
        Mock::given(method("POST"))
            .and(path("/rest/v1/video_views"))
            .and(body_partial_json(json!({"video_id": video_id.to_string()})))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        source(&server)
            .record_view(&ViewEvent {
                video_id,
                viewer_id: None,
            })
            .await
            .unwrap();
    }
}
