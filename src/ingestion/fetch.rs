//! HTTP retrieval and content-region isolation for single documents.
//!
//! One request per document with a fixed identifying header set and a hard
//! request timeout.  Transient transport failures are retried with bounded
//! exponential backoff; a missing content container is a structural
//! failure, distinct from a network failure so callers can tell "the site
//! is down" apart from "the page changed shape".

use std::time::Duration;

use reqwest::Client;
use reqwest::header::{ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use scraper::{Html, Selector};
use tracing::warn;

use crate::anchors::{self, ParsedFields};
use crate::normalize;
use crate::types::FatwaError;

/// The single designated container holding a fatwa's text.
pub const CONTENT_SELECTOR: &str = "div#captureDiv";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";
const ACCEPT_LANGUAGE_VALUE: &str = "ur,en;q=0.9";

/// Per-request timeout configured on the shared client.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds the shared HTTP client with the fixed header set.
pub fn build_client() -> Result<Client, FatwaError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE));
    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .timeout(REQUEST_TIMEOUT)
        .use_rustls_tls()
        .build()?)
}

/// Bounded retry applied to transient failures at the fetch boundary.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub attempts: u32,
    /// Backoff before the second attempt; doubles per retry.
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

/// Fetches one document and hands its content region to the anchor parser.
#[derive(Clone, Debug)]
pub struct CrawlClient {
    client: Client,
    retry: RetryPolicy,
}

impl CrawlClient {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Fetches, isolates, normalizes, and parses one document.
    pub async fn scrape(&self, url: &str) -> Result<ParsedFields, FatwaError> {
        let region = self.fetch_content_region(url).await?;
        let text = normalize::normalize(&region);
        anchors::parse(&text)
    }

    /// Retrieves the page and returns the text of the designated content
    /// container, or a structural failure when the container is absent.
    pub async fn fetch_content_region(&self, url: &str) -> Result<String, FatwaError> {
        let body = self.fetch_with_backoff(url).await?;
        extract_content_region(&body)
    }

    async fn fetch_with_backoff(&self, url: &str) -> Result<String, FatwaError> {
        let mut backoff = self.retry.initial_backoff;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.fetch_once(url).await {
                Ok(body) => return Ok(body),
                Err(err) if attempt < self.retry.attempts && err.is_transient() => {
                    warn!(%url, attempt, error = %err, "transient fetch failure, backing off");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<String, FatwaError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FatwaError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.text().await?)
    }
}

/// Flattens the text of the content container, failing structurally when
/// the container is missing.
pub fn extract_content_region(html: &str) -> Result<String, FatwaError> {
    let selector =
        Selector::parse(CONTENT_SELECTOR).map_err(|err| FatwaError::Config(err.to_string()))?;
    let document = Html::parse_document(html);
    let region = document
        .select(&selector)
        .next()
        .ok_or(FatwaError::ContentRegion {
            selector: CONTENT_SELECTOR,
        })?;
    Ok(region.text().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_designated_container_text() {
        let html = r#"<html><body>
            <div id="nav">menu</div>
            <div id="captureDiv"><h1>عنوان</h1><p>متن</p></div>
        </body></html>"#;
        let text = extract_content_region(html).unwrap();
        assert!(text.contains("عنوان"));
        assert!(text.contains("متن"));
        assert!(!text.contains("menu"));
    }

    #[test]
    fn missing_container_is_structural_failure() {
        let html = "<html><body><div id='other'>x</div></body></html>";
        match extract_content_region(html) {
            Err(FatwaError::ContentRegion { selector }) => {
                assert_eq!(selector, CONTENT_SELECTOR);
            }
            other => panic!("expected structural failure, got {other:?}"),
        }
    }

    #[test]
    fn structural_failures_are_not_transient() {
        let err = FatwaError::ContentRegion {
            selector: CONTENT_SELECTOR,
        };
        assert!(!err.is_transient());
        assert!(
            FatwaError::Status {
                status: 503,
                url: "https://example.com".into()
            }
            .is_transient()
        );
        assert!(
            !FatwaError::Status {
                status: 404,
                url: "https://example.com".into()
            }
            .is_transient()
        );
    }
}
