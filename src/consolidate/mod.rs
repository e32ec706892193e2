//! Consolidation engine
//!
//! Fans a company name out to every registered source concurrently, then
//! normalizes, merges, filters, enriches and caps what comes back.

mod engine;
mod merge;
mod models;

pub use engine::Consolidator;
pub use merge::{merge_companies, CompanyContainer};
pub use models::{ConsolidateError, Consolidation, Summary};
