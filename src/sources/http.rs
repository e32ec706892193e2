//! HTTP plumbing shared by the web-backed source adapters

use crate::network::HttpClient;
use crate::records::SourceError;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use scraper::Selector;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// HTTP request to be made by an adapter
#[derive(Debug, Clone)]
pub struct SourceRequest {
    pub url: String,
    pub method: HttpMethod,
    pub headers: HashMap<String, String>,
    pub params: HashMap<String, String>,
    pub data: Option<RequestBody>,
}

impl SourceRequest {
    /// Create a GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: HttpMethod::Get,
            headers: HashMap::new(),
            params: HashMap::new(),
            data: None,
        }
    }

    /// Create a POST request
    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Post,
            ..Self::get(url)
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn json(mut self, data: serde_json::Value) -> Self {
        self.data = Some(RequestBody::Json(data));
        self
    }
}

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Request body types
#[derive(Debug, Clone)]
pub enum RequestBody {
    Json(serde_json::Value),
}

/// HTTP response to an adapter request
#[derive(Debug)]
pub struct SourceResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub text: String,
    /// Final URL after redirects
    pub url: String,
}

impl SourceResponse {
    /// Parse response as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, SourceError> {
        serde_json::from_str(&self.text).map_err(|e| SourceError::Parse(e.to_string()))
    }

    /// Check if the body is a CAPTCHA or bot-check interstitial
    pub fn is_captcha(&self) -> bool {
        let text = self.text.to_lowercase();
        text.contains("g-recaptcha")
            || text.contains("captcha-form")
            || text.contains("unusual traffic")
            || text.contains("automated requests")
    }

    /// Map status and body to the adapter error taxonomy
    pub fn check(self) -> Result<Self, SourceError> {
        match self.status {
            429 => Err(SourceError::TooManyRequests),
            401 | 403 | 999 => Err(SourceError::AccessDenied),
            status if !(200..300).contains(&status) => Err(SourceError::Http(status)),
            _ if self.is_captcha() => Err(SourceError::Captcha),
            _ => Ok(self),
        }
    }
}

/// Fetches pages for one source: shared client, optional rate limit,
/// per-request cancellation.
#[derive(Clone)]
pub struct SourceHttp {
    client: HttpClient,
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
    timeout: Duration,
}

impl SourceHttp {
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            limiter: None,
            timeout: Duration::from_secs(10),
        }
    }

    /// Allow at most `per_second` requests per second
    pub fn with_rate_limit(mut self, per_second: u32) -> Self {
        self.limiter = NonZeroU32::new(per_second)
            .map(|n| Arc::new(RateLimiter::direct(Quota::per_second(n))));
        self
    }

    /// Per-request timeout
    pub fn with_timeout(mut self, seconds: f64) -> Self {
        if seconds.is_finite() && seconds > 0.0 {
            self.timeout = Duration::from_secs_f64(seconds);
        }
        self
    }

    /// Execute a request, honouring the rate limit and `cancel`.
    ///
    /// Non-success responses are mapped to [`SourceError`] via
    /// [`SourceResponse::check`].
    pub async fn fetch(
        &self,
        request: SourceRequest,
        cancel: &CancellationToken,
    ) -> Result<SourceResponse, SourceError> {
        if let Some(limiter) = &self.limiter {
            tokio::select! {
                _ = cancel.cancelled() => return Err(SourceError::Cancelled),
                _ = limiter.until_ready() => {}
            }
        }

        debug!("Fetching {}", request.url);

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(SourceError::Cancelled),
            response = self.client.execute_with_timeout(request, self.timeout) => response,
        };

        response.map_err(classify_error)?.check()
    }
}

/// Map a client failure to the adapter error taxonomy
fn classify_error(err: anyhow::Error) -> SourceError {
    match err.downcast_ref::<reqwest::Error>() {
        Some(e) if e.is_timeout() => SourceError::Timeout,
        Some(e) => match e.status() {
            Some(status) => SourceError::Http(status.as_u16()),
            None => SourceError::Network(e.to_string()),
        },
        None => SourceError::Network(err.to_string()),
    }
}

/// Parse a CSS selector
pub fn selector(css: &str) -> Result<Selector, SourceError> {
    Selector::parse(css).map_err(|e| SourceError::Parse(format!("selector {}: {}", css, e)))
}

/// Collapse whitespace in extracted text
pub fn clean_text<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn response(status: u16, text: &str) -> SourceResponse {
        SourceResponse {
            status,
            headers: HashMap::new(),
            text: text.to_string(),
            url: "https://example.com".to_string(),
        }
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(response(429, "").check().unwrap_err(), SourceError::TooManyRequests);
        assert_eq!(response(403, "").check().unwrap_err(), SourceError::AccessDenied);
        assert_eq!(response(500, "").check().unwrap_err(), SourceError::Http(500));
        assert_eq!(
            response(200, "<form id=\"captcha-form\">").check().unwrap_err(),
            SourceError::Captcha
        );
        assert!(response(200, "<html></html>").check().is_ok());
    }

    #[test]
    fn test_clean_text() {
        let parts = ["  Acme\n  ", "Ltd  "];
        assert_eq!(clean_text(parts.iter().copied()), "Acme Ltd");
    }

    #[test]
    fn test_bad_selector_is_parse_error() {
        assert!(matches!(selector("div[").unwrap_err(), SourceError::Parse(_)));
    }

    #[tokio::test]
    async fn test_fetch_maps_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/busy"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let http = SourceHttp::new(HttpClient::new().unwrap()).with_rate_limit(10);
        let err = http
            .fetch(
                SourceRequest::get(format!("{}/busy", server.uri())),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(err, SourceError::TooManyRequests);
    }

    #[tokio::test]
    async fn test_fetch_honours_cancellation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
            .mount(&server)
            .await;

        let http = SourceHttp::new(HttpClient::new().unwrap()).with_timeout(60.0);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = http
            .fetch(SourceRequest::get(server.uri()), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err, SourceError::Cancelled);
    }
}
