//! Consolidation execution and orchestration

use super::merge::CompanyContainer;
use super::models::{ConsolidateError, Consolidation, Summary};
use crate::config::Settings;
use crate::contacts::ContactEstimator;
use crate::directors::DirectorFilter;
use crate::limits::{limit_companies, Limits};
use crate::metrics::Metrics;
use crate::normalize::normalize_record;
use crate::records::{SourceError, SourceFailure, SourceTiming};
use crate::sources::{RawRecord, SourceAdapter, SourceDescriptor, SourceQuery, SourceRegistry};
use futures::StreamExt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Runs one company lookup across every registered source and folds the
/// answers into a single ranked list
pub struct Consolidator {
    registry: Arc<SourceRegistry>,
    filter: DirectorFilter,
    estimator: ContactEstimator,
    /// Upper bound on any source timeout, in seconds
    max_timeout: Option<f64>,
    metrics: Option<Arc<Metrics>>,
}

/// What one source task produced
struct SourceOutcome {
    result: Result<Vec<RawRecord>, SourceError>,
    elapsed: Duration,
}

impl Consolidator {
    pub fn new(registry: Arc<SourceRegistry>) -> Self {
        Self {
            registry,
            filter: DirectorFilter::default(),
            estimator: ContactEstimator::default(),
            max_timeout: Some(30.0),
            metrics: None,
        }
    }

    /// Build from loaded settings
    pub fn from_settings(registry: Arc<SourceRegistry>, settings: &Settings) -> Self {
        Self::new(registry)
            .with_director_filter(DirectorFilter::new(settings.limits.directors_only))
            .with_estimator(ContactEstimator::new(settings.estimation.clone()))
            .with_max_timeout(settings.outgoing.max_request_timeout)
    }

    pub fn with_director_filter(mut self, filter: DirectorFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_estimator(mut self, estimator: ContactEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn with_max_timeout(mut self, seconds: Option<f64>) -> Self {
        self.max_timeout = seconds;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Consolidate `company_name` across all sources
    pub async fn consolidate(
        &self,
        company_name: &str,
        limits: Limits,
    ) -> Result<Consolidation, ConsolidateError> {
        self.consolidate_with_cancel(company_name, limits, &CancellationToken::new())
            .await
    }

    /// Consolidate `company_name`, abandoning all outstanding source work
    /// once `cancel` fires.
    ///
    /// Source failures never fail the call; they are listed in
    /// [`Consolidation::failures`] alongside whatever the other sources
    /// returned.
    pub async fn consolidate_with_cancel(
        &self,
        company_name: &str,
        limits: Limits,
        cancel: &CancellationToken,
    ) -> Result<Consolidation, ConsolidateError> {
        let company_name = company_name.trim();
        if company_name.is_empty() {
            return Err(ConsolidateError::InvalidRequest(
                "company name must not be empty".to_string(),
            ));
        }
        limits.validate()?;

        if cancel.is_cancelled() {
            return Err(ConsolidateError::Cancelled);
        }

        if let Some(metrics) = &self.metrics {
            metrics.inc_consolidation();
        }

        let sources = self.registry.sources();
        info!(
            "Consolidating '{}' across {} sources",
            company_name,
            sources.len()
        );

        let mut tasks = JoinSet::new();
        for (index, source) in sources.iter().enumerate() {
            let descriptor = source.descriptor.clone();
            let query = SourceQuery::new(company_name, limits.per_source_cap(descriptor.max_results));
            let source_timeout = self.source_timeout(&descriptor);
            let adapter = source.adapter.clone();
            let token = cancel.child_token();

            debug!(
                "Querying source {} for up to {} records with timeout {:?}",
                descriptor.name, query.max_results, source_timeout
            );

            tasks.spawn(async move {
                let outcome = query_source(adapter, query, source_timeout, token).await;
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<SourceOutcome>> = sources.iter().map(|_| None).collect();
        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    tasks.abort_all();
                    info!("Consolidation of '{}' cancelled", company_name);
                    return Err(ConsolidateError::Cancelled);
                }
                joined = tasks.join_next() => match joined {
                    Some(Ok((index, outcome))) => slots[index] = Some(outcome),
                    Some(Err(e)) => warn!("Source task ended abnormally: {}", e),
                    None => break,
                },
            }
        }

        let mut consolidation = Consolidation::new(company_name, limits);
        let mut container = CompanyContainer::new();

        for (source, slot) in sources.iter().zip(slots) {
            let descriptor = &source.descriptor;
            let outcome = slot.unwrap_or(SourceOutcome {
                result: Err(SourceError::Terminated),
                elapsed: Duration::ZERO,
            });
            let time_ms = outcome.elapsed.as_millis() as u64;

            match outcome.result {
                Ok(records) => {
                    debug!(
                        "Source {} returned {} records in {}ms",
                        descriptor.name,
                        records.len(),
                        time_ms
                    );
                    self.record_metrics(&descriptor.name, time_ms, None);
                    consolidation.timings.push(SourceTiming {
                        source: descriptor.name.clone(),
                        time_ms,
                        record_count: records.len(),
                    });

                    for raw in &records {
                        match normalize_record(descriptor, raw) {
                            Some(company) => container.add(company),
                            None => consolidation.dropped_records += 1,
                        }
                    }
                }
                Err(error) => {
                    warn!("Source {} failed: {}", descriptor.name, error);
                    self.record_metrics(&descriptor.name, time_ms, Some(&error));
                    consolidation.failures.push(SourceFailure {
                        source: descriptor.name.clone(),
                        error,
                    });
                }
            }
        }

        let mut companies = container.into_ordered();
        limit_companies(&mut companies, &limits);

        for company in &mut companies {
            self.filter.apply(company, &limits);
            self.estimator.estimate(company, &limits);
        }

        consolidation.summary = Summary::from_companies(&companies);
        consolidation.companies = companies;

        info!(
            "Consolidated '{}': {} companies, {} failed sources",
            company_name,
            consolidation.companies.len(),
            consolidation.failures.len()
        );

        Ok(consolidation)
    }

    /// Source timeout clamped to the configured maximum
    fn source_timeout(&self, descriptor: &SourceDescriptor) -> Duration {
        let seconds = match self.max_timeout {
            Some(max) if max > 0.0 => descriptor.timeout.min(max),
            _ => descriptor.timeout,
        };
        Duration::try_from_secs_f64(seconds).unwrap_or(Duration::ZERO)
    }

    fn record_metrics(&self, source: &str, time_ms: u64, error: Option<&SourceError>) {
        if let Some(metrics) = &self.metrics {
            let error = error.map(|e| e.to_string());
            metrics.record_response(source, time_ms, error.as_deref());
        }
    }
}

/// Query one source and drain its stream within `limit`
async fn query_source(
    adapter: Arc<dyn SourceAdapter>,
    query: SourceQuery,
    limit: Duration,
    cancel: CancellationToken,
) -> SourceOutcome {
    let start = Instant::now();

    let collect = async {
        let stream = adapter.search(&query, &cancel).await?;
        Ok::<_, SourceError>(stream.take(query.max_results).collect::<Vec<_>>().await)
    };

    let result = match timeout(limit, collect).await {
        Ok(result) => result,
        Err(_) => {
            cancel.cancel();
            Err(SourceError::Timeout)
        }
    };

    SourceOutcome {
        result,
        elapsed: start.elapsed(),
    }
}
