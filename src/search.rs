use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::config::SearchConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Web,
    Image,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub count: u8,
    pub mode: SearchMode,
}

/// One raw item as returned by the search API, before any cleanup
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
}

/// A keyed web/image search service.
/// Quota and auth failures come back as `Err`; an empty hit list is `Ok`.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>>;
}

#[derive(Debug, Deserialize)]
struct CseResponse {
    #[serde(default)]
    items: Option<Vec<SearchHit>>,
    #[serde(default)]
    error: Option<CseError>,
}

#[derive(Debug, Deserialize)]
struct CseError {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
}

/// Google Custom Search JSON API client
pub struct GoogleSearchClient {
    client: reqwest::Client,
    config: SearchConfig,
}

impl GoogleSearchClient {
    pub fn new(config: SearchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build search HTTP client")?;
        Ok(Self { client, config })
    }

    fn query_params(&self, request: &SearchRequest) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("key", self.config.api_key.clone()),
            ("cx", self.config.engine_id.clone()),
            ("q", request.query.clone()),
            ("num", request.count.to_string()),
        ];
        if request.mode == SearchMode::Image {
            params.push(("searchType", "image".to_string()));
            params.push(("imgSize", "large".to_string()));
            params.push(("safe", "active".to_string()));
        }
        params
    }
}

#[async_trait]
impl SearchBackend for GoogleSearchClient {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        debug!("Search ({:?}, {}): {}", request.mode, request.count, request.query);

        let response = self
            .client
            .get(&self.config.base_url)
            .query(&self.query_params(request))
            .send()
            .await
            .context("Failed to send search request")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read search response")?;

        // Error bodies carry a JSON `error` object; prefer its message over the bare status
        let parsed: Option<CseResponse> = serde_json::from_str(&body).ok();

        if let Some(error) = parsed.as_ref().and_then(|r| r.error.as_ref()) {
            anyhow::bail!("Search API error ({}): {}", error.code, error.message);
        }
        if !status.is_success() {
            anyhow::bail!("Search API error ({}): {}", status, body);
        }

        let parsed = parsed.context("Failed to parse search response")?;
        Ok(parsed.items.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GoogleSearchClient {
        GoogleSearchClient::new(SearchConfig {
            api_key: "key".to_string(),
            engine_id: "cx".to_string(),
            base_url: format!("{}/customsearch/v1", server.uri()),
            timeout_secs: 2,
        })
        .unwrap()
    }

    fn web(query: &str) -> SearchRequest {
        SearchRequest {
            query: query.to_string(),
            count: 5,
            mode: SearchMode::Web,
        }
    }

    #[tokio::test]
    async fn test_web_search_parses_items() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "Naruto Hindi Dubbed"))
            .and(query_param("num", "5"))
            .and(query_param("cx", "cx"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    { "title": "Telegram: Contact @naruto", "link": "https://t.me/naruto" },
                    { "title": "Naruto Hindi", "link": "https://t.me/s/naruto_hd?q=1" }
                ]
            })))
            .mount(&server)
            .await;

        let hits = client_for(&server)
            .search(&web("Naruto Hindi Dubbed"))
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].link, "https://t.me/naruto");
        assert_eq!(hits[1].title, "Naruto Hindi");
    }

    #[tokio::test]
    async fn test_image_search_sends_image_filters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("searchType", "image"))
            .and(query_param("imgSize", "large"))
            .and(query_param("safe", "active"))
            .and(query_param("num", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{ "title": "poster", "link": "https://img.example/naruto.jpg" }]
            })))
            .mount(&server)
            .await;

        let request = SearchRequest {
            query: "Naruto poster wallpaper hd".to_string(),
            count: 1,
            mode: SearchMode::Image,
        };
        let hits = client_for(&server).search(&request).await.unwrap();
        assert_eq!(hits[0].link, "https://img.example/naruto.jpg");
    }

    #[tokio::test]
    async fn test_missing_items_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "searchInformation": { "totalResults": "0" }
            })))
            .mount(&server)
            .await;

        let hits = client_for(&server).search(&web("zzzz")).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_quota_error_object_is_err() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": { "code": 429, "message": "Quota exceeded for quota metric" }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).search(&web("Naruto")).await.unwrap_err();
        assert!(err.to_string().contains("Quota exceeded"));
    }

    #[tokio::test]
    async fn test_non_json_error_status_is_err() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        assert!(client_for(&server).search(&web("Naruto")).await.is_err());
    }
}
