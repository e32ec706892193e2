//! HTTP request handlers

use super::state::AppState;
use crate::cache::consolidation_cache_key;
use crate::consolidate::ConsolidateError;
use crate::limits::Limits;
use crate::metrics::SourceStats;
use crate::sources::{SourceAbout, SourceDescriptor};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Query parameters for a consolidation
#[derive(Debug, Default, Deserialize)]
pub struct ConsolidateParams {
    /// Company name
    pub q: Option<String>,
    pub total_max: Option<usize>,
    pub per_source_max: Option<usize>,
    pub directors_max: Option<usize>,
    pub company_contacts_max: Option<usize>,
    pub director_contacts_max: Option<usize>,
}

impl ConsolidateParams {
    /// Apply request overrides on top of the instance limits
    pub fn limits(&self, defaults: Limits) -> Limits {
        let mut limits = defaults;
        if let Some(max) = self.per_source_max {
            limits = limits.with_per_source_max(max);
        }
        if let Some(max) = self.total_max {
            limits = limits.with_total_max(max);
        }
        if let Some(max) = self.directors_max {
            limits = limits.with_directors_max(max);
        }
        limits.with_contacts_max(
            self.company_contacts_max
                .unwrap_or(limits.contacts_per_company_max),
            self.director_contacts_max
                .unwrap_or(limits.contacts_per_director_max),
        )
    }
}

/// JSON error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error returned from a handler
pub struct ApiError(ConsolidateError);

impl From<ConsolidateError> for ApiError {
    fn from(error: ConsolidateError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            ConsolidateError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ConsolidateError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        };
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

/// Consolidation handler
pub async fn consolidate(
    State(state): State<AppState>,
    Query(params): Query<ConsolidateParams>,
) -> Result<Response, ApiError> {
    let company_name = params.q.clone().unwrap_or_default();
    let limits = params.limits(state.default_limits());

    let key = consolidation_cache_key(&company_name, &limits, &state.registry().names());
    if let Some(cache) = &state.cache {
        if let Some(cached) = cache.get(&key).await {
            tracing::debug!("Cache hit for '{}'", company_name.trim());
            state.metrics.inc_cache_hit();
            return Ok(Json(cached.as_ref()).into_response());
        }
    }

    let consolidation = state
        .consolidator
        .consolidate(&company_name, limits)
        .await?;

    let consolidation = Arc::new(consolidation);
    if let Some(cache) = &state.cache {
        cache.insert(key, consolidation.clone()).await;
    }

    Ok(Json(consolidation.as_ref()).into_response())
}

/// One configured source
#[derive(Debug, Serialize)]
pub struct SourceInfo {
    #[serde(flatten)]
    pub descriptor: SourceDescriptor,
    pub about: SourceAbout,
}

/// Sources handler
pub async fn sources(State(state): State<AppState>) -> impl IntoResponse {
    let sources: Vec<SourceInfo> = state
        .registry()
        .sources()
        .iter()
        .map(|source| SourceInfo {
            descriptor: source.descriptor.clone(),
            about: source.adapter.about(),
        })
        .collect();

    Json(sources)
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub instance_name: String,
    pub version: &'static str,
    pub total_consolidations: u64,
    pub cache_hits: u64,
    pub cached_entries: u64,
    pub sources: HashMap<String, SourceStats>,
}

/// Stats handler
pub async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(StatsResponse {
        instance_name: state.instance_name().to_string(),
        version: crate::VERSION,
        total_consolidations: state.metrics.total_consolidations(),
        cache_hits: state.metrics.cache_hits(),
        cached_entries: state.cache.as_ref().map(|c| c.size()).unwrap_or(0),
        sources: state.metrics.source_stats(),
    })
}

/// Health check handler
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION
    }))
}
