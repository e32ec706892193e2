//! Result limiting
//!
//! All caps live in one [`Limits`] value that is read once when a
//! consolidation starts and passed by value to each stage.

use crate::config::LimitSettings;
use crate::consolidate::ConsolidateError;
use crate::records::{CompanyRecord, DirectorRecord};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Caps applied at each pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Limits {
    /// Records requested from each source; `None` uses each source's default
    pub per_source_max: Option<usize>,
    /// Consolidated companies returned
    pub total_max: usize,
    /// Directors kept per company after filtering
    pub directors_per_company_max: usize,
    /// Estimated contacts added per company
    pub contacts_per_company_max: usize,
    /// Estimated contacts added per director
    pub contacts_per_director_max: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            per_source_max: None,
            total_max: 50,
            directors_per_company_max: 3,
            contacts_per_company_max: 2,
            contacts_per_director_max: 1,
        }
    }
}

impl From<&LimitSettings> for Limits {
    fn from(settings: &LimitSettings) -> Self {
        Self {
            per_source_max: settings.per_source_max,
            total_max: settings.total_max,
            directors_per_company_max: settings.directors_per_company_max,
            contacts_per_company_max: settings.contacts_per_company_max,
            contacts_per_director_max: settings.contacts_per_director_max,
        }
    }
}

impl Limits {
    pub fn with_per_source_max(mut self, max: usize) -> Self {
        self.per_source_max = Some(max);
        self
    }

    pub fn with_total_max(mut self, max: usize) -> Self {
        self.total_max = max;
        self
    }

    pub fn with_directors_max(mut self, max: usize) -> Self {
        self.directors_per_company_max = max;
        self
    }

    pub fn with_contacts_max(mut self, per_company: usize, per_director: usize) -> Self {
        self.contacts_per_company_max = per_company;
        self.contacts_per_director_max = per_director;
        self
    }

    /// Reject caps that would make a source query meaningless
    pub fn validate(&self) -> Result<(), ConsolidateError> {
        if self.per_source_max == Some(0) {
            return Err(ConsolidateError::InvalidRequest(
                "per-source maximum must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Cap handed to one source adapter
    pub fn per_source_cap(&self, source_default: usize) -> usize {
        self.per_source_max.unwrap_or(source_default).max(1)
    }
}

/// Truncate the sorted company list to the total cap
pub fn limit_companies(companies: &mut Vec<CompanyRecord>, limits: &Limits) {
    if companies.len() > limits.total_max {
        debug!(
            "Truncating {} consolidated companies to {}",
            companies.len(),
            limits.total_max
        );
        companies.truncate(limits.total_max);
    }
}

/// Truncate an already-ordered director list to the per-company cap
pub fn limit_directors(directors: &mut Vec<DirectorRecord>, limits: &Limits) {
    directors.truncate(limits.directors_per_company_max);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{SourceKind, Sourced};

    fn company(name: &str) -> CompanyRecord {
        CompanyRecord::new(Sourced::new(name.to_string(), "google", SourceKind::Search, 10))
    }

    #[test]
    fn test_defaults() {
        let limits = Limits::default();
        assert_eq!(limits.total_max, 50);
        assert_eq!(limits.directors_per_company_max, 3);
        assert_eq!(limits.contacts_per_company_max, 2);
        assert_eq!(limits.contacts_per_director_max, 1);
        assert_eq!(limits.per_source_cap(15), 15);
        assert_eq!(limits.with_per_source_max(5).per_source_cap(15), 5);
    }

    #[test]
    fn test_zero_per_source_rejected() {
        let limits = Limits::default().with_per_source_max(0);
        assert!(limits.validate().is_err());
        assert!(Limits::default().with_total_max(0).validate().is_ok());
    }

    #[test]
    fn test_zero_total_empties_result() {
        let mut companies = vec![company("Acme"), company("Globex")];
        limit_companies(&mut companies, &Limits::default().with_total_max(0));
        assert!(companies.is_empty());
    }

    #[test]
    fn test_truncate_keeps_order() {
        let mut companies = vec![company("A"), company("B"), company("C")];
        limit_companies(&mut companies, &Limits::default().with_total_max(2));
        let names: Vec<_> = companies.iter().map(|c| c.name.value.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }
}
