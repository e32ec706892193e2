//! Settings structures for CompanyLens configuration

use crate::records::SourceKind;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Main settings structure, read from `settings.yml`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub server: ServerSettings,
    pub outgoing: OutgoingSettings,
    pub limits: LimitSettings,
    pub estimation: EstimationSettings,
    pub cache: CacheSettings,
    pub sources: Vec<SourceConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            general: GeneralSettings::default(),
            server: ServerSettings::default(),
            outgoing: OutgoingSettings::default(),
            limits: LimitSettings::default(),
            estimation: EstimationSettings::default(),
            cache: CacheSettings::default(),
            sources: default_sources(),
        }
    }
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_yaml::from_str(&content)?;
        Ok(settings)
    }

    /// Merge with environment variables (COMPANYLENS_* prefix)
    pub fn merge_env(&mut self) {
        if let Ok(val) = std::env::var("COMPANYLENS_DEBUG") {
            self.general.debug = val.parse().unwrap_or(false);
        }
        if let Ok(val) = std::env::var("COMPANYLENS_PORT") {
            if let Ok(port) = val.parse() {
                self.server.port = port;
            }
        }
        if let Ok(val) = std::env::var("COMPANYLENS_BIND_ADDRESS") {
            self.server.bind_address = val;
        }
        if let Ok(val) = std::env::var("COMPANYLENS_TOTAL_MAX") {
            if let Ok(total) = val.parse() {
                self.limits.total_max = total;
            }
        }

        for source in &mut self.sources {
            let var = format!("COMPANYLENS_{}_API_KEY", env_name(&source.name));
            if let Ok(key) = std::env::var(&var) {
                if !key.is_empty() {
                    source.api_key = Some(key);
                }
            }
        }
    }

    /// Get all enabled sources
    pub fn enabled_sources(&self) -> Vec<&SourceConfig> {
        self.sources.iter().filter(|s| !s.disabled).collect()
    }
}

fn env_name(source: &str) -> String {
    source
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// General settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Enable debug logging
    pub debug: bool,
    /// Instance name reported by `/health`
    pub instance_name: String,
    /// Enable metrics collection
    pub enable_metrics: bool,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            debug: false,
            instance_name: "CompanyLens".to_string(),
            enable_metrics: true,
        }
    }
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Server port
    pub port: u16,
    /// Bind address
    pub bind_address: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: 8899,
            bind_address: "127.0.0.1".to_string(),
        }
    }
}

/// Outgoing request settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutgoingSettings {
    /// Default request timeout in seconds
    pub request_timeout: f64,
    /// Upper bound on any per-source timeout
    pub max_request_timeout: Option<f64>,
    /// Pool max idle connections per host
    pub pool_maxsize: usize,
    /// Verify SSL certificates
    pub verify_ssl: bool,
    /// Proxy settings
    pub proxies: ProxySettings,
    /// Extra headers to send
    pub extra_headers: HashMap<String, String>,
}

impl Default for OutgoingSettings {
    fn default() -> Self {
        Self {
            request_timeout: 5.0,
            max_request_timeout: Some(30.0),
            pool_maxsize: 20,
            verify_ssl: true,
            proxies: ProxySettings::default(),
            extra_headers: HashMap::new(),
        }
    }
}

/// Proxy settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    pub http: Option<String>,
    pub https: Option<String>,
    pub all: Option<String>,
}

/// Default result caps; requests may override each one
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitSettings {
    /// Global per-source cap; unset means each source's own `max_results`
    pub per_source_max: Option<usize>,
    pub total_max: usize,
    pub directors_per_company_max: usize,
    pub contacts_per_company_max: usize,
    pub contacts_per_director_max: usize,
    /// Drop officers whose role is not a director role
    pub directors_only: bool,
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            per_source_max: None,
            total_max: 50,
            directors_per_company_max: 3,
            contacts_per_company_max: 2,
            contacts_per_director_max: 1,
            directors_only: true,
        }
    }
}

/// Contact estimation patterns
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimationSettings {
    /// Appended to the compact company name when no website domain is known
    pub email_domain_suffix: String,
    /// Mailbox used for company emails
    pub company_mailbox: String,
    /// Base of professional-profile links
    pub profile_base_url: String,
}

impl Default for EstimationSettings {
    fn default() -> Self {
        Self {
            email_domain_suffix: ".co.uk".to_string(),
            company_mailbox: "info".to_string(),
            profile_base_url: "https://www.linkedin.com".to_string(),
        }
    }
}

/// Consolidation cache
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    pub ttl_seconds: u64,
    pub max_capacity: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: 300,
            max_capacity: 1000,
        }
    }
}

/// Individual source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Source name (unique identifier, used for provenance)
    pub name: String,
    /// Adapter module to use
    pub engine: String,
    /// Class of data the source provides; defaults to the adapter's own
    pub kind: Option<SourceKind>,
    /// Whether the source is disabled
    pub disabled: bool,
    /// Custom timeout for this source in seconds
    pub timeout: Option<f64>,
    /// Default per-query result cap
    pub max_results: Option<usize>,
    /// Merge priority; defaults to the kind's priority
    pub priority: Option<u32>,
    /// API key if required
    pub api_key: Option<String>,
    /// Override of the adapter's base URL
    pub base_url: Option<String>,
    /// Requests per second allowed against this source
    pub rate_limit: Option<u32>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            engine: String::new(),
            kind: None,
            disabled: false,
            timeout: None,
            max_results: None,
            priority: None,
            api_key: None,
            base_url: None,
            rate_limit: None,
        }
    }
}

impl SourceConfig {
    /// Merge priority, falling back to the default for `kind`
    pub fn effective_priority(&self, kind: SourceKind) -> u32 {
        self.priority.unwrap_or_else(|| kind.default_priority())
    }
}

/// Default source configurations
fn default_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig {
            name: "companies_house".to_string(),
            engine: "companies_house".to_string(),
            kind: Some(SourceKind::Registry),
            timeout: Some(10.0),
            max_results: Some(15),
            rate_limit: Some(5),
            ..Default::default()
        },
        SourceConfig {
            name: "crunchbase".to_string(),
            engine: "crunchbase".to_string(),
            kind: Some(SourceKind::BusinessData),
            timeout: Some(8.0),
            max_results: Some(10),
            ..Default::default()
        },
        SourceConfig {
            name: "dnb".to_string(),
            engine: "dnb".to_string(),
            kind: Some(SourceKind::BusinessData),
            timeout: Some(8.0),
            max_results: Some(10),
            rate_limit: Some(1),
            ..Default::default()
        },
        SourceConfig {
            name: "linkedin".to_string(),
            engine: "linkedin".to_string(),
            kind: Some(SourceKind::Network),
            timeout: Some(8.0),
            max_results: Some(5),
            rate_limit: Some(1),
            ..Default::default()
        },
        SourceConfig {
            name: "google".to_string(),
            engine: "google".to_string(),
            kind: Some(SourceKind::Search),
            timeout: Some(6.0),
            max_results: Some(10),
            rate_limit: Some(1),
            ..Default::default()
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8899);
        assert!(!settings.general.debug);
        assert_eq!(settings.sources.len(), 5);
        assert_eq!(settings.limits.total_max, 50);
    }

    #[test]
    fn test_source_lookup() {
        let settings = Settings::default();
        let registry = &settings.sources[0];
        assert_eq!(registry.name, "companies_house");
        assert_eq!(registry.kind, Some(SourceKind::Registry));
        assert_eq!(registry.effective_priority(SourceKind::Registry), 40);
        assert_eq!(registry.max_results, Some(15));
        assert_eq!(registry.rate_limit, Some(5));
    }

    #[test]
    fn test_yaml_overrides() {
        let yaml = r#"
server:
  port: 9000
limits:
  total_max: 10
sources:
  - name: registry
    engine: companies_house
    kind: registry
    priority: 99
  - name: web
    engine: google
    disabled: true
"#;
        let settings: Settings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.server.bind_address, "127.0.0.1");
        assert_eq!(settings.limits.total_max, 10);
        assert_eq!(settings.limits.directors_per_company_max, 3);
        assert_eq!(settings.sources.len(), 2);
        assert_eq!(settings.sources[0].effective_priority(SourceKind::Registry), 99);
        assert_eq!(settings.sources[1].kind, None);
        assert_eq!(settings.enabled_sources().len(), 1);
    }

    #[test]
    fn test_env_name() {
        assert_eq!(env_name("companies_house"), "COMPANIES_HOUSE");
        assert_eq!(env_name("d&b"), "D_B");
    }
}
