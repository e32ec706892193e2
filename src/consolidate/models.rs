//! Consolidation request errors and the report handed back to callers

use crate::limits::Limits;
use crate::records::{CompanyRecord, ContactRecord, SourceFailure, SourceTiming};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors that end a consolidation without a result
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConsolidateError {
    /// Rejected before any source was queried
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// The caller abandoned the request
    #[error("consolidation cancelled")]
    Cancelled,
}

/// Outcome of one consolidation.
///
/// A consolidation with failures is still a success: `companies` holds
/// whatever the responding sources produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consolidation {
    pub id: Uuid,
    /// Company name as requested
    pub query: String,
    pub limits: Limits,
    /// Merged companies, most corroborated first
    pub companies: Vec<CompanyRecord>,
    /// Sources that contributed nothing, and why
    pub failures: Vec<SourceFailure>,
    pub timings: Vec<SourceTiming>,
    /// Raw records that could not be normalized
    pub dropped_records: usize,
    pub summary: Summary,
    pub completed_at: DateTime<Utc>,
}

impl Consolidation {
    pub fn new(query: impl Into<String>, limits: Limits) -> Self {
        Self {
            id: Uuid::new_v4(),
            query: query.into(),
            limits,
            companies: Vec::new(),
            failures: Vec::new(),
            timings: Vec::new(),
            dropped_records: 0,
            summary: Summary::default(),
            completed_at: Utc::now(),
        }
    }

    /// Whether any source failed
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
    }

    /// Names of failed sources
    pub fn failed_sources(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.source.as_str()).collect()
    }
}

/// Totals over the final company list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total_companies: usize,
    pub total_directors: usize,
    pub total_contacts: usize,
    pub observed_contacts: usize,
    pub estimated_contacts: usize,
}

impl Summary {
    pub fn from_companies(companies: &[CompanyRecord]) -> Self {
        let mut summary = Self {
            total_companies: companies.len(),
            ..Self::default()
        };

        for company in companies {
            summary.total_directors += company.directors.len();
            summary.count(&company.contacts);
            for director in &company.directors {
                summary.count(&director.contacts);
            }
        }

        summary
    }

    fn count(&mut self, contacts: &[ContactRecord]) {
        for contact in contacts {
            self.total_contacts += 1;
            if contact.is_estimated() {
                self.estimated_contacts += 1;
            } else {
                self.observed_contacts += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{ContactKind, DirectorRecord, SourceKind, Sourced};

    #[test]
    fn test_summary_counts() {
        let name = |n: &str| Sourced::new(n.to_string(), "companies_house", SourceKind::Registry, 40);

        let mut company = CompanyRecord::new(name("Acme Ltd"));
        company
            .contacts
            .push(ContactRecord::observed(ContactKind::Phone, "020 7946 0000", "dnb"));
        company
            .contacts
            .push(ContactRecord::estimated(ContactKind::Email, "info@acme.co.uk", 0.6));

        let mut director = DirectorRecord::new(name("Jane Doe"));
        director
            .contacts
            .push(ContactRecord::estimated(ContactKind::Email, "jane.doe@acme.co.uk", 0.75));
        company.directors.push(director);

        let summary = Summary::from_companies(&[company, CompanyRecord::new(name("Globex Ltd"))]);
        assert_eq!(
            summary,
            Summary {
                total_companies: 2,
                total_directors: 1,
                total_contacts: 3,
                observed_contacts: 1,
                estimated_contacts: 2,
            }
        );
    }
}
