//! HTTP client for making requests to company data sources

use super::user_agent::{accept_html, accept_json, accept_language, generate_user_agent};
use crate::config::OutgoingSettings;
use crate::sources::{HttpMethod, RequestBody, SourceRequest, SourceResponse};
use anyhow::Result;
use reqwest::{Client, Response};
use std::collections::HashMap;
use std::time::Duration;

/// HTTP client wrapper shared by every source adapter
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    default_timeout: Duration,
    user_agent: String,
    extra_headers: HashMap<String, String>,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self> {
        Self::with_settings(&OutgoingSettings::default())
    }

    /// Create a new HTTP client with custom settings
    pub fn with_settings(settings: &OutgoingSettings) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs_f64(settings.request_timeout))
            .pool_max_idle_per_host(settings.pool_maxsize)
            .cookie_store(true)
            .gzip(true)
            .brotli(true);

        // SSL verification
        if !settings.verify_ssl {
            builder = builder.danger_accept_invalid_certs(true);
        }

        // Proxy settings
        if let Some(ref proxy_url) = settings.proxies.all {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        } else {
            if let Some(ref http) = settings.proxies.http {
                builder = builder.proxy(reqwest::Proxy::http(http)?);
            }
            if let Some(ref https) = settings.proxies.https {
                builder = builder.proxy(reqwest::Proxy::https(https)?);
            }
        }

        let client = builder.build()?;

        Ok(Self {
            client,
            default_timeout: Duration::from_secs_f64(settings.request_timeout),
            user_agent: generate_user_agent(),
            extra_headers: settings.extra_headers.clone(),
        })
    }

    /// Execute a source request
    pub async fn execute(&self, request: SourceRequest) -> Result<SourceResponse> {
        self.execute_with_timeout(request, self.default_timeout).await
    }

    /// Execute a source request with custom timeout
    pub async fn execute_with_timeout(
        &self,
        request: SourceRequest,
        timeout: Duration,
    ) -> Result<SourceResponse> {
        let mut req_builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };

        req_builder = req_builder.timeout(timeout);

        let accept = match request.data {
            Some(RequestBody::Json(_)) => accept_json(),
            _ => accept_html(),
        };

        req_builder = req_builder
            .header("User-Agent", &self.user_agent)
            .header("Accept", accept)
            .header("Accept-Language", accept_language("en-GB"))
            .header("DNT", "1");

        for (key, value) in self.extra_headers.iter().chain(&request.headers) {
            req_builder = req_builder.header(key, value);
        }

        if !request.params.is_empty() {
            req_builder = req_builder.query(&request.params);
        }

        if let Some(RequestBody::Json(json)) = request.data {
            req_builder = req_builder.json(&json);
        }

        let response = req_builder.send().await?;

        Self::parse_response(response).await
    }

    /// Parse response into SourceResponse
    async fn parse_response(response: Response) -> Result<SourceResponse> {
        let status = response.status().as_u16();
        let url = response.url().to_string();

        let mut headers = HashMap::new();
        for (key, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(key.to_string(), v.to_string());
            }
        }

        let text = response.text().await?;

        Ok(SourceResponse {
            status,
            headers,
            text,
            url,
        })
    }

    /// Get current user agent
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_client_creation() {
        let client = HttpClient::new().unwrap();
        assert!(client.user_agent().starts_with("Mozilla/5.0"));
    }

    #[tokio::test]
    async fn test_execute_sends_params_and_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "acme"))
            .and(header_exists("user-agent"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let request = SourceRequest::get(format!("{}/search", server.uri())).param("q", "acme");
        let response = client.execute(request).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.text, "ok");
    }
}
