//! LinkedIn company search adapter

use super::http::{clean_text, selector, SourceHttp, SourceRequest};
use super::traits::*;
use crate::records::{SourceError, SourceKind};
use async_trait::async_trait;
use scraper::Html;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_BASE_URL: &str = "https://www.linkedin.com";

/// Professional network company search
pub struct LinkedIn {
    base_url: String,
    http: SourceHttp,
}

impl LinkedIn {
    pub fn new(http: SourceHttp) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            http,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn request(&self, query: &SourceQuery) -> SourceRequest {
        SourceRequest::get(format!("{}/search/results/companies/", self.base_url))
            .param("keywords", query.company_name.as_str())
            .param("origin", "GLOBAL_SEARCH_HEADER")
    }

    /// Parse the company search results page.
    ///
    /// Each result container carries the company link plus a subtitle of
    /// the form `Industry • Location` and an optional size line.
    pub fn parse_results(&self, html: &str, max_results: usize) -> Result<Vec<RawRecord>, SourceError> {
        let document = Html::parse_document(html);
        let item_selector = selector("li.reusable-search__result-container, div.search-result__info")?;
        let link_selector = selector(r#"a[href*="/company/"]"#)?;
        let subtitle_selector = selector(".entity-result__primary-subtitle")?;
        let size_selector = selector(".entity-result__secondary-subtitle")?;

        let mut seen = HashSet::new();
        let mut records = Vec::new();

        for item in document.select(&item_selector) {
            if records.len() >= max_results {
                break;
            }

            let Some(link) = item
                .select(&link_selector)
                .find(|a| !clean_text(a.text()).is_empty())
            else {
                continue;
            };

            let url = profile_url(&self.base_url, link.value().attr("href").unwrap_or_default());
            if !seen.insert(url.clone()) {
                continue;
            }

            let mut record = RawRecord::new()
                .with("name", clean_text(link.text()))
                .with("url", url);

            if let Some(subtitle) = item.select(&subtitle_selector).next() {
                let subtitle = clean_text(subtitle.text());
                let mut parts = subtitle.split('•').map(str::trim);
                record.insert_opt("industry", parts.next().map(str::to_string));
                record.insert_opt("location", parts.next().map(str::to_string));
            }

            record.insert_opt(
                "employees",
                item.select(&size_selector)
                    .next()
                    .map(|s| clean_text(s.text()))
                    .filter(|s| s.to_lowercase().contains("employee")),
            );

            records.push(record);
        }

        Ok(records)
    }
}

/// Canonical company profile URL without tracking parameters
fn profile_url(base_url: &str, href: &str) -> String {
    let path = href.split(['?', '#']).next().unwrap_or(href);
    let absolute = if path.starts_with("http") {
        path.to_string()
    } else {
        format!("{}{}", base_url, path)
    };
    absolute.trim_end_matches('/').to_string()
}

/// Whether the final URL is a sign-in wall rather than results
fn is_auth_wall(url: &str) -> bool {
    ["/authwall", "/login", "/checkpoint", "/uas/login"]
        .iter()
        .any(|marker| url.contains(marker))
}

#[async_trait]
impl SourceAdapter for LinkedIn {
    fn engine(&self) -> &str {
        "linkedin"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Network
    }

    fn about(&self) -> SourceAbout {
        SourceAbout::new()
            .website("https://www.linkedin.com")
            .official_api(false)
            .results_format("HTML")
    }

    fn default_max_results(&self) -> usize {
        5
    }

    async fn search(
        &self,
        query: &SourceQuery,
        cancel: &CancellationToken,
    ) -> Result<RawRecordStream, SourceError> {
        let response = self.http.fetch(self.request(query), cancel).await?;

        if is_auth_wall(&response.url) {
            return Err(SourceError::AccessDenied);
        }

        let records = self.parse_results(&response.text, query.max_results)?;
        Ok(record_stream(records, query.max_results))
    }
}
