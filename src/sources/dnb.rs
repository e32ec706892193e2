//! Dun & Bradstreet business directory adapter

use super::http::{clean_text, selector, SourceHttp, SourceRequest};
use super::traits::*;
use crate::records::{SourceError, SourceKind};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_BASE_URL: &str = "https://www.dnb.com";

/// Business-data provider backed by the D&B business directory
pub struct Dnb {
    base_url: String,
    http: SourceHttp,
}

impl Dnb {
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
        SourceRequest::get(format!("{}/business-directory/company-search.html", self.base_url))
            .param("term", query.company_name.as_str())
            .param("page", "1")
    }

    /// Parse directory search results
    pub fn parse_results(&self, html: &str, max_results: usize) -> Result<Vec<RawRecord>, SourceError> {
        let document = Html::parse_document(html);
        let result_selector = selector("div.search-result, li.search-result")?;
        let name_selector = selector("a.company-name, .company-name a")?;
        let website_selector = selector(".company-website a, a.company-website")?;
        let fields: [(&str, Selector); 5] = [
            ("address", selector(".company-address")?),
            ("phone", selector(".company-phone")?),
            ("employees", selector(".company-employees")?),
            ("revenue", selector(".company-revenue")?),
            ("industry", selector(".company-industry")?),
        ];

        let mut records = Vec::new();

        for result in document.select(&result_selector).take(max_results) {
            let Some(link) = result.select(&name_selector).next() else {
                continue;
            };

            let name = clean_text(link.text());
            if name.is_empty() {
                continue;
            }

            let mut record = RawRecord::new().with("name", name);
            record.insert_opt(
                "profile_url",
                link.value().attr("href").map(|h| self.absolute(h)),
            );

            for (key, field_selector) in &fields {
                record.insert_opt(*key, field_text(result, field_selector));
            }

            record.insert_opt(
                "website",
                result
                    .select(&website_selector)
                    .next()
                    .and_then(|a| a.value().attr("href").map(str::to_string)),
            );

            records.push(record);
        }

        Ok(records)
    }

    fn absolute(&self, href: &str) -> String {
        if href.starts_with("http") {
            href.to_string()
        } else {
            format!("{}{}", self.base_url, href)
        }
    }
}

/// Field text with any leading `Label:` removed
fn field_text(element: ElementRef<'_>, selector: &Selector) -> Option<String> {
    let text = clean_text(element.select(selector).next()?.text());
    let value = match text.split_once(':') {
        Some((label, value)) if label.len() < 20 && !label.chars().any(|c| c.is_ascii_digit()) => {
            value.trim().to_string()
        }
        _ => text,
    };
    Some(value).filter(|v| !v.is_empty())
}

#[async_trait]
impl SourceAdapter for Dnb {
    fn engine(&self) -> &str {
        "dnb"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::BusinessData
    }

    fn about(&self) -> SourceAbout {
        SourceAbout::new()
            .website("https://www.dnb.com/business-directory.html")
            .official_api(false)
            .results_format("HTML")
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
