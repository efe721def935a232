//! SearXNG-backed fetcher.
//!
//! One `GET /search?format=json` for the topic, then one `GET` per result URL
//! with the page converted to text. The instance must have the JSON output
//! format enabled. A page that cannot be fetched still becomes a document,
//! with no content; only a failed search fails the fetch.

use std::time::Duration;

use async_trait::async_trait;
use distill_config::SearchConfig;
use distill_core::entities::FetchedDocument;
use serde::Deserialize;

use crate::ContentFetcher;
use crate::error::FetchError;
use crate::extract::{extract_text, truncate_chars};
use crate::http::check_response;

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

/// One search result as returned by SearXNG.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchHit {
    pub url: String,
    #[serde(default)]
    pub title: String,
    /// The engine's snippet.
    #[serde(default)]
    pub content: String,
}

pub struct SearxngFetcher {
    http: reqwest::Client,
    base_url: String,
    max_content_chars: usize,
    crawl_delay: Duration,
}

impl SearxngFetcher {
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &SearchConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            http,
            base_url: config.searxng_url.trim_end_matches('/').to_string(),
            max_content_chars: config.max_content_chars,
            crawl_delay: config.crawl_delay(),
        })
    }

    /// Run the search alone, returning at most `max_results` hits.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the request fails, SearXNG answers with an
    /// error status, or the body is not SearXNG JSON.
    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, FetchError> {
        let url = format!(
            "{}/search?q={}&format=json&categories=general&language=auto&safesearch=0&pageno=1",
            self.base_url,
            urlencoding::encode(query)
        );
        let resp = check_response(
            self.http
                .get(&url)
                .header(reqwest::header::ACCEPT, "application/json")
                .send()
                .await?,
        )
        .await?;
        let body = resp.text().await?;
        let mut hits = parse_search_response(&body)?;
        hits.retain(|hit| !hit.url.is_empty());
        hits.truncate(max_results);
        Ok(hits)
    }

    /// Fetch one page and extract its text, capped at `max_content_chars`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on transport errors or a non-success status.
    pub async fn fetch_page(&self, url: &str) -> Result<Option<String>, FetchError> {
        let resp = check_response(self.http.get(url).send().await?).await?;
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let body = resp.bytes().await?;
        Ok(extract_text(&content_type, &body).map(|text| truncate_chars(text, self.max_content_chars)))
    }
}

#[async_trait]
impl ContentFetcher for SearxngFetcher {
    async fn fetch(&self, topic: &str, max_results: usize) -> Result<Vec<FetchedDocument>, FetchError> {
        let hits = self.search(topic, max_results).await?;
        tracing::info!(topic, hits = hits.len(), "search returned");

        let mut documents = Vec::with_capacity(hits.len());
        for (i, hit) in hits.into_iter().enumerate() {
            if i > 0 && !self.crawl_delay.is_zero() {
                tokio::time::sleep(self.crawl_delay).await;
            }
            let content = match self.fetch_page(&hit.url).await {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!(url = %hit.url, %e, "page fetch failed");
                    None
                }
            };
            let title = (!hit.title.trim().is_empty()).then(|| hit.title.trim().to_string());
            documents.push(FetchedDocument::new(hit.url, title, content));
        }
        Ok(documents)
    }
}

/// Parse a SearXNG JSON response body.
///
/// # Errors
///
/// Returns [`FetchError::Parse`] if the body is not SearXNG JSON, which
/// usually means the instance has the JSON format disabled.
pub fn parse_search_response(body: &str) -> Result<Vec<SearchHit>, FetchError> {
    serde_json::from_str::<SearchResponse>(body)
        .map(|r| r.results)
        .map_err(|e| FetchError::Parse(format!("SearXNG response (is format=json enabled?): {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FIXTURE: &str = r#"{
        "query": "rust ownership",
        "number_of_results": 0,
        "results": [
            {
                "url": "https://doc.rust-lang.org/book/ch04-01-what-is-ownership.html",
                "title": "What is Ownership? - The Rust Programming Language",
                "content": "Ownership is a set of rules that govern how a Rust program manages memory.",
                "engine": "duckduckgo",
                "score": 3.0
            },
            {
                "url": "https://en.wikipedia.org/wiki/Rust_(programming_language)",
                "title": "Rust (programming language)",
                "engine": "wikipedia"
            }
        ],
        "answers": [],
        "suggestions": []
    }"#;

    #[test]
    fn parse_fixture() {
        let hits = parse_search_response(FIXTURE).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "What is Ownership? - The Rust Programming Language");
        assert!(hits[0].content.starts_with("Ownership is a set of rules"));
        assert_eq!(hits[1].content, "");
    }

    #[test]
    fn html_error_page_is_parse_error() {
        let err = parse_search_response("<html>403 Forbidden</html>").unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[test]
    fn missing_results_is_empty() {
        assert!(parse_search_response(r#"{"query": "x"}"#).unwrap().is_empty());
    }
}
