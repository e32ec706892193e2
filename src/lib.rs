//! CompanyLens: multi-source company profile consolidation
//!
//! A company name is sent to every configured source (registry, business
//! data providers, a professional network, web search). The answers are
//! normalized, merged into one record per company, filtered to active
//! directors and enriched with estimated contact points.

pub mod cache;
pub mod config;
pub mod consolidate;
pub mod contacts;
pub mod directors;
pub mod limits;
pub mod metrics;
pub mod network;
pub mod normalize;
pub mod records;
pub mod sources;
pub mod web;

pub use config::Settings;
pub use consolidate::{ConsolidateError, Consolidation, Consolidator};
pub use limits::Limits;
pub use records::{CompanyRecord, ContactRecord, DirectorRecord, SourceError};
pub use sources::{SourceAdapter, SourceLoader, SourceRegistry};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
