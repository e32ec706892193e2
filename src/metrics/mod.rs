//! Metrics collection module
//!
//! Tracks per-source query counts, failures and response times.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Response times kept per source for the rolling average
const RESPONSE_WINDOW: usize = 100;

/// Process-wide consolidation metrics
pub struct Metrics {
    total_consolidations: AtomicU64,
    cache_hits: AtomicU64,
    sources: RwLock<HashMap<String, SourceCounters>>,
}

#[derive(Default)]
struct SourceCounters {
    queries: u64,
    successes: u64,
    failures: u64,
    response_times: Vec<u64>,
    last_error: Option<String>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            total_consolidations: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            sources: RwLock::new(HashMap::new()),
        }
    }

    pub fn inc_consolidation(&self) {
        self.total_consolidations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a source that answered, successfully or not
    pub fn record_response(&self, source: &str, time_ms: u64, error: Option<&str>) {
        let mut sources = self.write();
        let counters = sources.entry(source.to_string()).or_default();

        counters.queries += 1;
        match error {
            Some(error) => {
                counters.failures += 1;
                counters.last_error = Some(error.to_string());
            }
            None => counters.successes += 1,
        }

        if counters.response_times.len() >= RESPONSE_WINDOW {
            counters.response_times.remove(0);
        }
        counters.response_times.push(time_ms);
    }

    pub fn total_consolidations(&self) -> u64 {
        self.total_consolidations.load(Ordering::Relaxed)
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    /// Average response time over the recent window
    pub fn avg_response_time(&self, source: &str) -> Option<u64> {
        let sources = self.read();
        let times = &sources.get(source)?.response_times;
        if times.is_empty() {
            None
        } else {
            Some(times.iter().sum::<u64>() / times.len() as u64)
        }
    }

    /// Percentage of queries that succeeded; 100 for an unqueried source
    pub fn reliability(&self, source: &str) -> f64 {
        self.read()
            .get(source)
            .map(SourceCounters::reliability)
            .unwrap_or(100.0)
    }

    /// Snapshot of every queried source
    pub fn source_stats(&self) -> HashMap<String, SourceStats> {
        self.read()
            .iter()
            .map(|(name, counters)| {
                let avg_response_time = if counters.response_times.is_empty() {
                    None
                } else {
                    Some(
                        counters.response_times.iter().sum::<u64>()
                            / counters.response_times.len() as u64,
                    )
                };
                (
                    name.clone(),
                    SourceStats {
                        queries: counters.queries,
                        failures: counters.failures,
                        avg_response_time,
                        reliability: counters.reliability(),
                        last_error: counters.last_error.clone(),
                    },
                )
            })
            .collect()
    }

    // Counters stay consistent across a poisoning panic
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, SourceCounters>> {
        self.sources.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, SourceCounters>> {
        self.sources.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl SourceCounters {
    fn reliability(&self) -> f64 {
        let total = self.successes + self.failures;
        if total == 0 {
            100.0
        } else {
            (self.successes as f64 / total as f64) * 100.0
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics for a single source
#[derive(Debug, Clone, Serialize)]
pub struct SourceStats {
    pub queries: u64,
    pub failures: u64,
    pub avg_response_time: Option<u64>,
    pub reliability: f64,
    pub last_error: Option<String>,
}
