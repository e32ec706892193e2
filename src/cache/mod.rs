//! Caching module for CompanyLens
//!
//! Keeps recent consolidations so repeated lookups skip the sources.

use crate::config::CacheSettings;
use crate::consolidate::Consolidation;
use crate::limits::Limits;
use moka::future::Cache;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

/// Cache for complete consolidations
#[derive(Clone)]
pub struct ConsolidationCache {
    cache: Cache<String, Arc<Consolidation>>,
}

impl ConsolidationCache {
    /// Create a new cache with specified TTL
    pub fn new(ttl_seconds: u64, max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .time_to_live(Duration::from_secs(ttl_seconds))
            .max_capacity(max_capacity)
            .build();

        Self { cache }
    }

    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self::new(settings.ttl_seconds, settings.max_capacity)
    }

    pub async fn get(&self, key: &str) -> Option<Arc<Consolidation>> {
        self.cache.get(key).await
    }

    /// Store a consolidation. Partial results are not cached, so a
    /// failing source is retried on the next lookup.
    pub async fn insert(&self, key: String, consolidation: Arc<Consolidation>) -> bool {
        if consolidation.is_partial() {
            return false;
        }
        self.cache.insert(key, consolidation).await;
        true
    }

    pub fn size(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for ConsolidationCache {
    fn default() -> Self {
        Self::new(300, 1000)
    }
}

/// Generate a cache key for a lookup
///
/// Names differing only in case or spacing share a key.
pub fn consolidation_cache_key(company_name: &str, limits: &Limits, sources: &[&str]) -> String {
    let name = company_name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update(
        format!(
            "|{:?}|{}|{}|{}|{}",
            limits.per_source_max,
            limits.total_max,
            limits.directors_per_company_max,
            limits.contacts_per_company_max,
            limits.contacts_per_director_max
        )
        .as_bytes(),
    );
    for source in sources {
        hasher.update(b"|");
        hasher.update(source.as_bytes());
    }

    format!("{:x}", hasher.finalize())
}
