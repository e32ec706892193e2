//! Crunchbase organization search adapter
//!
//! Uses the official v4 search API, which requires a user key.

use super::http::{SourceHttp, SourceRequest};
use super::traits::*;
use crate::records::{SourceError, SourceKind};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_BASE_URL: &str = "https://api.crunchbase.com/api/v4";

const PROFILE_BASE_URL: &str = "https://www.crunchbase.com/organization";

/// Business-data provider backed by the Crunchbase API
pub struct Crunchbase {
    base_url: String,
    api_key: Option<String>,
    http: SourceHttp,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    entities: Vec<Entity>,
}

#[derive(Debug, Deserialize)]
struct Entity {
    #[serde(default)]
    properties: Properties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Properties {
    identifier: Option<Identifier>,
    short_description: Option<String>,
    website_url: Option<String>,
    num_employees_enum: Option<String>,
    operating_status: Option<String>,
    founded_on: Option<FoundedOn>,
    categories: Vec<Identifier>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Identifier {
    value: String,
    permalink: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FoundedOn {
    value: String,
}

impl Crunchbase {
    pub fn new(http: SourceHttp, api_key: Option<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
            http,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn request(&self, api_key: &str, query: &SourceQuery) -> SourceRequest {
        SourceRequest::post(format!("{}/searches/organizations", self.base_url))
            .header("X-cb-user-key", api_key)
            .json(json!({
                "field_ids": [
                    "identifier",
                    "short_description",
                    "website_url",
                    "num_employees_enum",
                    "operating_status",
                    "founded_on",
                    "categories"
                ],
                "query": [{
                    "type": "predicate",
                    "field_id": "identifier",
                    "operator_id": "contains",
                    "values": [query.company_name]
                }],
                "limit": query.max_results.clamp(1, 1000)
            }))
    }

    /// Parse a search response body
    pub fn parse_results(&self, body: &str, max_results: usize) -> Result<Vec<RawRecord>, SourceError> {
        let response: SearchResponse =
            serde_json::from_str(body).map_err(|e| SourceError::Parse(e.to_string()))?;

        let records = response
            .entities
            .into_iter()
            .filter_map(|entity| {
                let props = entity.properties;
                let identifier = props.identifier?;

                let mut record = RawRecord::new().with("name", identifier.value);
                record.insert_opt(
                    "profile_url",
                    identifier
                        .permalink
                        .map(|p| format!("{}/{}", PROFILE_BASE_URL, p)),
                );
                record.insert_opt("short_description", props.short_description);
                record.insert_opt("website", props.website_url);
                record.insert_opt("employees", props.num_employees_enum.map(|e| employee_range(&e)));
                record.insert_opt("status", props.operating_status);
                record.insert_opt("founded_on", props.founded_on.map(|f| f.value));

                let industry = props
                    .categories
                    .into_iter()
                    .map(|c| c.value)
                    .filter(|c| !c.is_empty())
                    .collect::<Vec<_>>()
                    .join(", ");
                record.insert_opt("industry", Some(industry));

                Some(record)
            })
            .take(max_results)
            .collect();

        Ok(records)
    }
}

/// `c_0051_0100` -> `51-100`
fn employee_range(code: &str) -> String {
    let bounds: Vec<String> = code
        .trim_start_matches("c_")
        .split('_')
        .map(|n| n.trim_start_matches('0').to_string())
        .collect();

    match bounds.as_slice() {
        [low, high] if high == "max" => format!("{}+", low),
        [low, high] if !low.is_empty() && !high.is_empty() => format!("{}-{}", low, high),
        _ => code.to_string(),
    }
}

#[async_trait]
impl SourceAdapter for Crunchbase {
    fn engine(&self) -> &str {
        "crunchbase"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::BusinessData
    }

    fn about(&self) -> SourceAbout {
        SourceAbout::new()
            .website("https://www.crunchbase.com")
            .official_api(true)
            .api_key_required(true)
            .results_format("JSON")
    }

    async fn search(
        &self,
        query: &SourceQuery,
        cancel: &CancellationToken,
    ) -> Result<RawRecordStream, SourceError> {
        let api_key = self.api_key.as_deref().ok_or(SourceError::MissingApiKey)?;

        let response = self.http.fetch(self.request(api_key, query), cancel).await?;
        let records = self.parse_results(&response.text, query.max_results)?;
        Ok(record_stream(records, query.max_results))
    }
}
