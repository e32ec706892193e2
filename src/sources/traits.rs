//! Source adapter traits and types

use crate::records::{SourceError, SourceKind};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

/// A raw, source-specific record: whatever fields the source exposes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord {
    fields: Map<String, Value>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Insert only when the value is present and non-blank
    pub fn insert_opt(&mut self, key: impl Into<String>, value: Option<String>) {
        if let Some(value) = value {
            let value = value.trim();
            if !value.is_empty() {
                self.insert(key, value.to_string());
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Text value of a field; blank strings, nulls and empty lists read as absent
    pub fn text(&self, key: &str) -> Option<String> {
        value_text(self.fields.get(key)?)
    }

    /// First present text value among several field aliases
    pub fn first_text(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|k| self.text(k))
    }

    /// Nested records under a field (e.g. a company's officers)
    pub fn records(&self, key: &str) -> Vec<RawRecord> {
        match self.fields.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Value::Object(map) => Some(RawRecord::from(map.clone())),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Map<String, Value>> for RawRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

impl From<RawRecord> for Value {
    fn from(record: RawRecord) -> Self {
        Value::Object(record.fields)
    }
}

fn value_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(value_text)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(map) => map
            .get("full_address")
            .or_else(|| map.get("value"))
            .or_else(|| map.get("display"))
            .and_then(value_text)
            .unwrap_or_default(),
        Value::Null => String::new(),
    };

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Lazy, finite sequence of raw records
pub type RawRecordStream = BoxStream<'static, RawRecord>;

/// Wrap already-parsed records as a stream capped at `max_results`
pub fn record_stream(records: Vec<RawRecord>, max_results: usize) -> RawRecordStream {
    stream::iter(records.into_iter().take(max_results)).boxed()
}

/// Query handed to one source adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceQuery {
    /// Company name as entered by the caller
    pub company_name: String,
    /// Hard upper bound on the number of records the adapter yields
    pub max_results: usize,
}

impl SourceQuery {
    pub fn new(company_name: impl Into<String>, max_results: usize) -> Self {
        Self {
            company_name: company_name.into(),
            max_results,
        }
    }
}

/// Source metadata
#[derive(Debug, Clone, Default, Serialize)]
pub struct SourceAbout {
    /// Website URL
    pub website: Option<String>,
    /// Whether it uses an official API
    pub use_official_api: bool,
    /// Whether an API key is required
    pub require_api_key: bool,
    /// Result format (HTML, JSON)
    pub results: String,
}

impl SourceAbout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn website(mut self, url: impl Into<String>) -> Self {
        self.website = Some(url.into());
        self
    }

    pub fn official_api(mut self, uses: bool) -> Self {
        self.use_official_api = uses;
        self
    }

    pub fn api_key_required(mut self, required: bool) -> Self {
        self.require_api_key = required;
        self
    }

    pub fn results_format(mut self, format: impl Into<String>) -> Self {
        self.results = format.into();
        self
    }
}

/// Uniform capability every external data source implements.
///
/// `search` yields at most `query.max_results` records. An empty stream is a
/// valid "no results" answer; network, auth and parse failures are reported
/// as [`SourceError`]. Adapters should stop work promptly once `cancel`
/// fires.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Adapter type name (e.g. `companies_house`)
    fn engine(&self) -> &str;

    /// Class of data this source provides
    fn kind(&self) -> SourceKind;

    fn about(&self) -> SourceAbout {
        SourceAbout::default()
    }

    /// Default timeout in seconds
    fn timeout(&self) -> f64 {
        8.0
    }

    /// Default per-query result cap
    fn default_max_results(&self) -> usize {
        10
    }

    async fn search(
        &self,
        query: &SourceQuery,
        cancel: &CancellationToken,
    ) -> Result<RawRecordStream, SourceError>;
}

/// How one configured source takes part in a consolidation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceDescriptor {
    /// Configured name, used for provenance
    pub name: String,
    /// Adapter type
    pub engine: String,
    pub kind: SourceKind,
    /// Merge priority (higher wins)
    pub priority: u32,
    /// Timeout in seconds
    pub timeout: f64,
    /// Per-query result cap when the request does not override it
    pub max_results: usize,
}

impl SourceDescriptor {
    pub fn new(name: impl Into<String>, kind: SourceKind) -> Self {
        let name = name.into();
        Self {
            engine: name.clone(),
            name,
            kind,
            priority: kind.default_priority(),
            timeout: 8.0,
            max_results: 10,
        }
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout = seconds;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_record_text() {
        let record = RawRecord::new()
            .with("name", "  Acme Ltd ")
            .with("blank", "   ")
            .with("number", 42)
            .with("address", json!({"full_address": "1 High St, London", "lines": []}))
            .with("sic", json!(["62020", "62090"]));

        assert_eq!(record.text("name").as_deref(), Some("Acme Ltd"));
        assert_eq!(record.text("blank"), None);
        assert_eq!(record.text("number").as_deref(), Some("42"));
        assert_eq!(record.text("address").as_deref(), Some("1 High St, London"));
        assert_eq!(record.text("sic").as_deref(), Some("62020, 62090"));
        assert_eq!(record.first_text(&["missing", "name"]).as_deref(), Some("Acme Ltd"));
    }

    #[test]
    fn test_nested_records() {
        let record = RawRecord::new().with(
            "directors",
            json!([{"name": "Jane Doe"}, "not an object", {"name": "John Smith"}]),
        );
        let directors = record.records("directors");
        assert_eq!(directors.len(), 2);
        assert_eq!(directors[1].text("name").as_deref(), Some("John Smith"));
    }

    #[tokio::test]
    async fn test_record_stream_is_capped() {
        let records = (0..5)
            .map(|i| RawRecord::new().with("name", format!("Company {}", i)))
            .collect();
        let collected: Vec<_> = record_stream(records, 3).collect().await;
        assert_eq!(collected.len(), 3);
    }
}
