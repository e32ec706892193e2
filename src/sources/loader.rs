//! Source loader for initializing adapters from configuration

use super::http::SourceHttp;
use super::registry::SourceRegistry;
use super::traits::{SourceAdapter, SourceDescriptor};
use super::{companies_house, crunchbase, dnb, google, linkedin};
use crate::config::{Settings, SourceConfig};
use crate::network::HttpClient;
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// Loader for initializing source adapters from configuration
pub struct SourceLoader;

impl SourceLoader {
    /// Load all enabled sources from settings
    pub fn load(settings: &Settings, client: &HttpClient) -> Result<SourceRegistry> {
        let mut registry = SourceRegistry::new();

        let enabled = settings.enabled_sources();
        let disabled = settings.sources.len() - enabled.len();
        if disabled > 0 {
            info!("Skipping {} disabled sources", disabled);
        }

        for config in enabled {
            match Self::create_adapter(config, client) {
                Ok(adapter) => {
                    let descriptor = Self::describe(config, adapter.as_ref());
                    info!(
                        "Loaded source: {} ({}, {}, priority {})",
                        descriptor.name, descriptor.engine, descriptor.kind, descriptor.priority
                    );
                    registry.register(adapter, descriptor);
                }
                Err(e) => {
                    warn!("Failed to load source {}: {}", config.name, e);
                }
            }
        }

        info!("Loaded {} sources", registry.len());
        Ok(registry)
    }

    /// Build the descriptor, filling gaps from the adapter's defaults
    pub fn describe(config: &SourceConfig, adapter: &dyn SourceAdapter) -> SourceDescriptor {
        let kind = config.kind.unwrap_or_else(|| adapter.kind());
        let name = if config.name.is_empty() {
            adapter.engine().to_string()
        } else {
            config.name.clone()
        };

        SourceDescriptor {
            name,
            engine: adapter.engine().to_string(),
            kind,
            priority: config.effective_priority(kind),
            timeout: config.timeout.unwrap_or_else(|| adapter.timeout()),
            max_results: config
                .max_results
                .filter(|m| *m > 0)
                .unwrap_or_else(|| adapter.default_max_results()),
        }
    }

    /// Create an adapter instance by engine type
    fn create_adapter(config: &SourceConfig, client: &HttpClient) -> Result<Arc<dyn SourceAdapter>> {
        let mut http = SourceHttp::new(client.clone());
        if let Some(timeout) = config.timeout {
            http = http.with_timeout(timeout);
        }
        if let Some(rate) = config.rate_limit {
            http = http.with_rate_limit(rate);
        }

        let base_url = config.base_url.clone();

        let adapter: Arc<dyn SourceAdapter> = match config.engine.as_str() {
            "companies_house" => {
                let adapter = companies_house::CompaniesHouse::new(http);
                Arc::new(match base_url {
                    Some(url) => adapter.with_base_url(url),
                    None => adapter,
                })
            }
            "linkedin" => {
                let adapter = linkedin::LinkedIn::new(http);
                Arc::new(match base_url {
                    Some(url) => adapter.with_base_url(url),
                    None => adapter,
                })
            }
            "google" => {
                let adapter = google::Google::new(http);
                Arc::new(match base_url {
                    Some(url) => adapter.with_base_url(url),
                    None => adapter,
                })
            }
            "crunchbase" => {
                if config.api_key.is_none() {
                    warn!(
                        "Source {} has no api_key; it will report MissingApiKey",
                        config.name
                    );
                }
                let adapter = crunchbase::Crunchbase::new(http, config.api_key.clone());
                Arc::new(match base_url {
                    Some(url) => adapter.with_base_url(url),
                    None => adapter,
                })
            }
            "dnb" => {
                let adapter = dnb::Dnb::new(http);
                Arc::new(match base_url {
                    Some(url) => adapter.with_base_url(url),
                    None => adapter,
                })
            }
            other => {
                return Err(anyhow::anyhow!("Unknown source engine: {}", other));
            }
        };

        Ok(adapter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::SourceKind;

    #[test]
    fn test_load_defaults() {
        let settings = Settings::default();
        let registry = SourceLoader::load(&settings, &HttpClient::new().unwrap()).unwrap();

        assert_eq!(registry.len(), 5);
        assert_eq!(
            registry.names(),
            vec!["companies_house", "crunchbase", "dnb", "linkedin", "google"]
        );

        let registry_source = registry.descriptor("companies_house").unwrap();
        assert_eq!(registry_source.kind, SourceKind::Registry);
        assert_eq!(registry_source.max_results, 15);
        assert_eq!(registry_source.timeout, 10.0);
    }

    #[test]
    fn test_unknown_and_disabled_sources_skipped() {
        let mut settings = Settings::default();
        settings.sources = vec![
            SourceConfig {
                name: "mystery".to_string(),
                engine: "mystery".to_string(),
                ..Default::default()
            },
            SourceConfig {
                name: "web".to_string(),
                engine: "google".to_string(),
                disabled: true,
                ..Default::default()
            },
            SourceConfig {
                name: "register".to_string(),
                engine: "companies_house".to_string(),
                priority: Some(5),
                ..Default::default()
            },
        ];

        let registry = SourceLoader::load(&settings, &HttpClient::new().unwrap()).unwrap();
        assert_eq!(registry.names(), vec!["register"]);

        let descriptor = registry.descriptor("register").unwrap();
        assert_eq!(descriptor.kind, SourceKind::Registry);
        assert_eq!(descriptor.priority, 5);
        assert_eq!(descriptor.max_results, 15);
    }
}
