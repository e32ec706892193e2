//! Application state shared across handlers

use crate::cache::ConsolidationCache;
use crate::config::Settings;
use crate::consolidate::Consolidator;
use crate::limits::Limits;
use crate::metrics::Metrics;
use crate::sources::SourceRegistry;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub consolidator: Arc<Consolidator>,
    /// Present when caching is enabled
    pub cache: Option<ConsolidationCache>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(settings: Settings, registry: SourceRegistry) -> Self {
        let settings = Arc::new(settings);
        let metrics = Arc::new(Metrics::new());

        let consolidator = Consolidator::from_settings(Arc::new(registry), &settings);
        let consolidator = if settings.general.enable_metrics {
            consolidator.with_metrics(metrics.clone())
        } else {
            consolidator
        };

        let cache = settings
            .cache
            .enabled
            .then(|| ConsolidationCache::from_settings(&settings.cache));

        Self {
            settings,
            consolidator: Arc::new(consolidator),
            cache,
            metrics,
        }
    }

    pub fn instance_name(&self) -> &str {
        &self.settings.general.instance_name
    }

    pub fn registry(&self) -> &SourceRegistry {
        self.consolidator.registry()
    }

    /// Limits configured for this instance, before request overrides
    pub fn default_limits(&self) -> Limits {
        Limits::from(&self.settings.limits)
    }
}
