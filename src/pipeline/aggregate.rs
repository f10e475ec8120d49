use tracing::{debug, warn};

use crate::search::{SearchBackend, SearchHit, SearchMode, SearchRequest};

pub const MAX_RESULTS: u8 = 5;
pub const TITLE_LIMIT: usize = 30;
pub const ELLIPSIS: &str = "...";

/// Substrings search engines put into titles of channel pages
const TITLE_BOILERPLATE: &[&str] = &["Telegram:", "Channel"];

/// Web-preview path segments rewritten to the direct link
const REDIRECT_SEGMENTS: &[(&str, &str)] = &[("t.me/s/", "t.me/"), ("telegram.me/s/", "telegram.me/")];

/// A link ready to be shown as a result button
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCandidate {
    pub url: String,
}

/// Strip query string, fragment and known redirect segments.
pub fn clean_url(raw: &str) -> String {
    let end = raw.find(['?', '#']).unwrap_or(raw.len());
    let mut url = raw[..end].trim().to_string();
    for (from, to) in REDIRECT_SEGMENTS {
        url = url.replacen(from, to, 1);
    }
    url
}

/// Remove boilerplate, collapse whitespace and cut to [`TITLE_LIMIT`]
/// characters plus an ellipsis.
pub fn clean_title(raw: &str, url: &str) -> String {
    let mut title = raw.to_string();
    for noise in TITLE_BOILERPLATE {
        title = title.replace(noise, " ");
    }
    let title = title.split_whitespace().collect::<Vec<_>>().join(" ");

    let title = if title.is_empty() {
        reqwest::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| "Open".to_string())
    } else {
        title
    };

    if title.chars().count() > TITLE_LIMIT {
        let cut: String = title.chars().take(TITLE_LIMIT).collect();
        format!("{}{}", cut.trim_end(), ELLIPSIS)
    } else {
        title
    }
}

fn to_result(hit: &SearchHit) -> Option<SearchResult> {
    let url = clean_url(&hit.link);
    if url.is_empty() {
        return None;
    }
    Some(SearchResult {
        title: clean_title(&hit.title, &url),
        url,
    })
}

/// Top links for `query`, in the order the backend ranked them. Any backend
/// failure yields an empty list.
pub async fn search_links(backend: &dyn SearchBackend, query: &str) -> Vec<SearchResult> {
    let request = SearchRequest {
        query: query.to_string(),
        count: MAX_RESULTS,
        mode: SearchMode::Web,
    };

    match backend.search(&request).await {
        Ok(hits) => {
            let results: Vec<SearchResult> = hits
                .iter()
                .filter_map(to_result)
                .take(MAX_RESULTS as usize)
                .collect();
            debug!("{} link result(s) for {:?}", results.len(), query);
            results
        }
        Err(e) => {
            warn!("Link search failed, reporting no results: {:#}", e);
            Vec::new()
        }
    }
}

/// One large, safe-search image for the original text.
pub async fn search_image(
    backend: &dyn SearchBackend,
    text: &str,
    image_suffix: &str,
) -> Option<ImageCandidate> {
    let request = SearchRequest {
        query: format!("{} {}", text.trim(), image_suffix.trim())
            .trim()
            .to_string(),
        count: 1,
        mode: SearchMode::Image,
    };

    match backend.search(&request).await {
        Ok(hits) => hits
            .into_iter()
            .map(|h| h.link.trim().to_string())
            .find(|link| !link.is_empty())
            .map(|url| ImageCandidate { url }),
        Err(e) => {
            warn!("Image search failed: {:#}", e);
            None
        }
    }
}
