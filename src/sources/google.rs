//! Google web search adapter

use super::http::{clean_text, selector, SourceHttp, SourceRequest};
use super::traits::*;
use crate::normalize::keys;
use crate::records::{SourceError, SourceKind};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_BASE_URL: &str = "https://www.google.com";

static COMPANY_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)company\s+(?:number|no\.?|registration number)[:\s]*([A-Z]{0,2}\d{6,8})")
        .expect("company number pattern is valid")
});

/// Title separators after which a site name or page label follows
const TITLE_SEPARATORS: &[&str] = &[" - ", " | ", " \u{2013} ", " \u{2014} ", " \u{b7} "];

/// Page labels trailing a company name in directory titles
const TITLE_LABELS: &[&str] = &[" overview", " people", " filing history", " officers"];

/// Hosts that describe companies rather than being their website
const DIRECTORY_HOSTS: &[&str] = &[
    "company-information.service.gov.uk",
    "gov.uk",
    "linkedin.com",
    "crunchbase.com",
    "dnb.com",
    "opencorporates.com",
    "endole.co.uk",
    "companycheck.co.uk",
    "bloomberg.com",
    "facebook.com",
    "twitter.com",
    "x.com",
    "instagram.com",
    "wikipedia.org",
    "yell.com",
    "glassdoor.co.uk",
    "indeed.com",
];

/// General web search, used to find websites and corroborate names
pub struct Google {
    base_url: String,
    http: SourceHttp,
}

impl Google {
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
        SourceRequest::get(format!("{}/search", self.base_url))
            .param("q", format!("\"{}\" company UK", query.company_name))
            .param("hl", "en")
            .param("gl", "uk")
            .param("num", query.max_results.clamp(1, 100).to_string())
    }

    /// Parse organic results (`div.g`) from a results page
    pub fn parse_results(&self, html: &str, max_results: usize) -> Result<Vec<RawRecord>, SourceError> {
        let document = Html::parse_document(html);
        let result_selector = selector("div.g")?;
        let title_selector = selector("h3")?;
        let link_selector = selector("a")?;
        let snippet_selector = selector("div.VwiC3b, span.aCOpRe, div.IsZvec")?;

        let mut records = Vec::new();

        for element in document.select(&result_selector) {
            if records.len() >= max_results {
                break;
            }

            let title = element
                .select(&title_selector)
                .next()
                .map(|t| clean_text(t.text()))
                .unwrap_or_default();

            let url = element
                .select(&link_selector)
                .next()
                .and_then(|a| a.value().attr("href"))
                .and_then(result_url);

            let (Some(url), Some(name)) = (url, company_name_from_title(&title)) else {
                continue;
            };

            let mut record = RawRecord::new().with("name", name).with("url", url.clone());

            let snippet = element
                .select(&snippet_selector)
                .next()
                .map(|s| clean_text(s.text()));

            if let Some(snippet) = &snippet {
                record.insert_opt(
                    "company_number",
                    COMPANY_NUMBER.captures(snippet).map(|c| c[1].to_string()),
                );
            }
            record.insert_opt("description", snippet);

            if let Some(domain) = keys::domain_of(&url).filter(|d| !is_directory_host(d)) {
                record.insert("website", domain);
            }

            records.push(record);
        }

        Ok(records)
    }
}

/// Resolve a result href, unwrapping `/url?q=` redirects
fn result_url(href: &str) -> Option<String> {
    if href.starts_with("http") {
        return Some(href.to_string());
    }

    let query = href.strip_prefix("/url?")?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == "q" || k == "url")
        .map(|(_, v)| v.into_owned())
        .filter(|v| v.starts_with("http"))
}

/// Company name part of a result title
fn company_name_from_title(title: &str) -> Option<String> {
    let mut name = title;

    for separator in TITLE_SEPARATORS {
        if let Some((head, _)) = name.split_once(separator) {
            name = head;
        }
    }
    let mut name = name.trim();

    let lower = name.to_lowercase();
    for label in TITLE_LABELS {
        if lower.ends_with(label) {
            if let Some(head) = name
                .len()
                .checked_sub(label.len())
                .and_then(|end| name.get(..end))
            {
                name = head.trim_end();
            }
            break;
        }
    }

    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

fn is_directory_host(domain: &str) -> bool {
    DIRECTORY_HOSTS
        .iter()
        .any(|host| domain == *host || domain.ends_with(&format!(".{}", host)))
}

#[async_trait]
impl SourceAdapter for Google {
    fn engine(&self) -> &str {
        "google"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Search
    }

    fn about(&self) -> SourceAbout {
        SourceAbout::new()
            .website("https://www.google.com")
            .official_api(false)
            .results_format("HTML")
    }

    fn timeout(&self) -> f64 {
        6.0
    }

    async fn search(
        &self,
        query: &SourceQuery,
        cancel: &CancellationToken,
    ) -> Result<RawRecordStream, SourceError> {
        let response = self.http.fetch(self.request(query), cancel).await?;
        let records = self.parse_results(&response.text, query.max_results)?;
        Ok(record_stream(records, query.max_results))
    }
}
