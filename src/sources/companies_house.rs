//! Companies House (UK company register) adapter
//!
//! Searches the public register and, for each hit, reads the company's
//! officers page so directors arrive with their appointment history.
//! Officers pages are fetched a few at a time; the source's rate limit is
//! the only throttle.

use super::http::{clean_text, selector, SourceHttp, SourceRequest};
use super::traits::*;
use crate::records::{SourceError, SourceKind};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://find-and-update.company-information.service.gov.uk";

/// Officers pages in flight at once
const OFFICER_FETCHES: usize = 4;

static COMPANY_HREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/company/([0-9A-Za-z]{6,10})").expect("company href pattern is valid"));

static LIFECYCLE_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(incorporated|dissolved) on\s+(\d{1,2} \w+ \d{4})")
        .expect("lifecycle date pattern is valid")
});

/// UK company register
pub struct CompaniesHouse {
    base_url: String,
    http: SourceHttp,
}

impl CompaniesHouse {
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

    fn search_request(&self, query: &SourceQuery) -> SourceRequest {
        SourceRequest::get(format!("{}/search/companies", self.base_url))
            .param("q", query.company_name.as_str())
    }

    /// Parse the company search results page
    pub fn parse_search(&self, html: &str, max_results: usize) -> Result<Vec<RawRecord>, SourceError> {
        let document = Html::parse_document(html);
        let item_selector = selector("li.type-company")?;
        let link_selector = selector("a")?;
        let status_selector = selector("span.status")?;
        let paragraph_selector = selector("p")?;

        let mut records = Vec::new();

        for item in document.select(&item_selector).take(max_results) {
            let Some(link) = item.select(&link_selector).next() else {
                continue;
            };

            let name = clean_text(link.text());
            let href = link.value().attr("href").unwrap_or_default();
            if name.is_empty() {
                continue;
            }

            let mut record = RawRecord::new().with("name", name);
            record.insert_opt(
                "company_number",
                COMPANY_HREF.captures(href).map(|c| c[1].to_uppercase()),
            );
            record.insert("url", absolute_url(&self.base_url, href));
            record.insert_opt(
                "status",
                item.select(&status_selector).next().map(|s| clean_text(s.text())),
            );

            for paragraph in item.select(&paragraph_selector) {
                let text = clean_text(paragraph.text());
                let is_meta = paragraph
                    .value()
                    .classes()
                    .any(|c| c == "meta" || c == "crumbtrail");

                if is_meta {
                    apply_lifecycle(&mut record, &text);
                } else if !record.contains("address") {
                    record.insert_opt("address", Some(text));
                }
            }

            records.push(record);
        }

        Ok(records)
    }

    /// Parse a company's officers page into nested director records
    pub fn parse_officers(html: &str) -> Result<Vec<Value>, SourceError> {
        let document = Html::parse_document(html);
        let block_selector = selector(r#"div[class^="appointment-"]"#)?;
        let fields = [
            ("name", selector(r#"[id^="officer-name-"]"#)?),
            ("officer_role", selector(r#"[id^="officer-role-"]"#)?),
            ("appointed_on", selector(r#"[id^="officer-appointed-on-"]"#)?),
            ("resigned_on", selector(r#"[id^="officer-resigned-on-"]"#)?),
            ("officer_status", selector(r#"[id^="officer-status-tag-"]"#)?),
            ("nationality", selector(r#"[id^="officer-nationality-"]"#)?),
            ("occupation", selector(r#"[id^="officer-occupation-"]"#)?),
        ];

        let officers = document
            .select(&block_selector)
            .filter_map(|block| {
                let mut officer = RawRecord::new();
                for (key, field_selector) in &fields {
                    officer.insert_opt(*key, first_text(block, field_selector));
                }
                officer.contains("name").then(|| Value::from(officer))
            })
            .collect();

        Ok(officers)
    }
}

fn first_text(element: ElementRef<'_>, selector: &scraper::Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(|e| clean_text(e.text()))
        .filter(|t| !t.is_empty())
}

fn apply_lifecycle(record: &mut RawRecord, meta: &str) {
    for capture in LIFECYCLE_DATE.captures_iter(meta) {
        let date = capture[2].to_string();
        if capture[1].eq_ignore_ascii_case("incorporated") {
            record.insert("incorporation_date", date);
        } else {
            record.insert("dissolved_date", date);
            if !record.contains("status") {
                record.insert("status", "Dissolved");
            }
        }
    }
}

fn absolute_url(base_url: &str, href: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else {
        format!("{}{}", base_url, href)
    }
}

#[async_trait]
impl SourceAdapter for CompaniesHouse {
    fn engine(&self) -> &str {
        "companies_house"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Registry
    }

    fn about(&self) -> SourceAbout {
        SourceAbout::new()
            .website("https://find-and-update.company-information.service.gov.uk")
            .official_api(false)
            .results_format("HTML")
    }

    fn timeout(&self) -> f64 {
        10.0
    }

    fn default_max_results(&self) -> usize {
        15
    }

    async fn search(
        &self,
        query: &SourceQuery,
        cancel: &CancellationToken,
    ) -> Result<RawRecordStream, SourceError> {
        let response = self.http.fetch(self.search_request(query), cancel).await?;
        let hits = self.parse_search(&response.text, query.max_results)?;
        debug!("companies_house: {} search hits", hits.len());

        let http = self.http.clone();
        let base_url = self.base_url.clone();
        let token = cancel.clone();

        let records = stream::iter(hits)
            .map(move |mut hit| {
                let http = http.clone();
                let base_url = base_url.clone();
                let token = token.clone();
                async move {
                    let Some(number) = hit.text("company_number") else {
                        return hit;
                    };

                    let request = SourceRequest::get(format!("{}/company/{}/officers", base_url, number));
                    match http.fetch(request, &token).await {
                        Ok(page) => match Self::parse_officers(&page.text) {
                            Ok(officers) => hit.insert("directors", officers),
                            Err(e) => warn!("companies_house: officers for {}: {}", number, e),
                        },
                        Err(e) => debug!("companies_house: officers for {} unavailable: {}", number, e),
                    }
                    hit
                }
            })
            .buffered(OFFICER_FETCHES)
            .take_until(cancel.clone().cancelled_owned());

        Ok(records.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::HttpClient;

    const SEARCH_HTML: &str = r#"
        <ul id="results">
          <li class="type-company">
            <h3><a class="govuk-link" href="/company/01234567">ACME LIMITED</a></h3>
            <p class="meta crumbtrail">01234567 - Incorporated on 1 January 2000</p>
            <p>1 High Street, London, EC1A 1AA</p>
          </li>
          <li class="type-company">
            <h3><a class="govuk-link" href="/company/SC123456">ACME SERVICES LTD</a></h3>
            <p class="meta crumbtrail">SC123456 - Incorporated on 2 May 2005 - Dissolved on 9 June 2015</p>
            <p>2 Low Road, Glasgow</p>
          </li>
          <li class="type-company"><h3>No link here</h3></li>
        </ul>
    "#;

    const OFFICERS_HTML: &str = r#"
        <div class="appointments-list">
          <div class="appointment-1">
            <h2><span id="officer-name-1"><a href="/officers/x">DOE, Jane</a></span>
              <span id="officer-status-tag-1">Resigned</span></h2>
            <dl><dd id="officer-role-1">Director</dd>
                <dd id="officer-appointed-on-1">3 March 2019</dd>
                <dd id="officer-resigned-on-1">1 January 2020</dd>
                <dd id="officer-nationality-1">British</dd></dl>
          </div>
          <div class="appointment-2">
            <h2><span id="officer-name-2"><a href="/officers/y">SMITH, John</a></span>
              <span id="officer-status-tag-2">Active</span></h2>
            <dl><dd id="officer-role-2">Director</dd>
                <dd id="officer-appointed-on-2">5 April 2018</dd>
                <dd id="officer-occupation-2">Engineer</dd></dl>
          </div>
        </div>
    "#;

    fn adapter() -> CompaniesHouse {
        CompaniesHouse::new(SourceHttp::new(HttpClient::new().unwrap()))
    }

    #[test]
    fn test_parse_search() {
        let records = adapter().parse_search(SEARCH_HTML, 10).unwrap();
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].text("name").as_deref(), Some("ACME LIMITED"));
        assert_eq!(records[0].text("company_number").as_deref(), Some("01234567"));
        assert_eq!(records[0].text("incorporation_date").as_deref(), Some("1 January 2000"));
        assert_eq!(records[0].text("address").as_deref(), Some("1 High Street, London, EC1A 1AA"));
        assert_eq!(
            records[0].text("url").as_deref(),
            Some("https://find-and-update.company-information.service.gov.uk/company/01234567")
        );

        assert_eq!(records[1].text("status").as_deref(), Some("Dissolved"));
        assert_eq!(records[1].text("dissolved_date").as_deref(), Some("9 June 2015"));
    }

    #[test]
    fn test_parse_search_respects_max() {
        let records = adapter().parse_search(SEARCH_HTML, 1).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_parse_officers() {
        let officers = CompaniesHouse::parse_officers(OFFICERS_HTML).unwrap();
        assert_eq!(officers.len(), 2);

        let jane = RawRecord::from(officers[0].as_object().unwrap().clone());
        assert_eq!(jane.text("name").as_deref(), Some("DOE, Jane"));
        assert_eq!(jane.text("resigned_on").as_deref(), Some("1 January 2020"));
        assert_eq!(jane.text("officer_status").as_deref(), Some("Resigned"));

        let john = RawRecord::from(officers[1].as_object().unwrap().clone());
        assert_eq!(john.text("occupation").as_deref(), Some("Engineer"));
        assert!(!john.contains("resigned_on"));
    }

    #[test]
    fn test_empty_page_is_no_results() {
        assert!(adapter().parse_search("<html><body></body></html>", 10).unwrap().is_empty());
    }
}
