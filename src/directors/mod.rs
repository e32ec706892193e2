//! Director activity filter
//!
//! Drops officers that resolve as resigned, optionally drops non-director
//! officers, then keeps the most recently appointed entries up to the cap.

use crate::limits::{limit_directors, Limits};
use crate::records::{sort_by_appointment, ActivityStatus, CompanyRecord, DirectorRecord};
use tracing::debug;

/// Filter applied to every merged company
#[derive(Debug, Clone, Copy)]
pub struct DirectorFilter {
    /// Drop officers whose known role is not a director role (e.g. secretaries)
    pub directors_only: bool,
}

impl Default for DirectorFilter {
    fn default() -> Self {
        Self {
            directors_only: true,
        }
    }
}

impl DirectorFilter {
    pub fn new(directors_only: bool) -> Self {
        Self { directors_only }
    }

    /// Whether an officer survives the filter
    pub fn keeps(&self, director: &DirectorRecord) -> bool {
        if director.resolved_status() == ActivityStatus::Resigned {
            return false;
        }

        if self.directors_only {
            if let Some(role) = &director.role {
                return is_director_role(&role.value);
            }
        }

        true
    }

    /// Filter and cap one company's directors in place
    pub fn apply(&self, company: &mut CompanyRecord, limits: &Limits) {
        let before = company.directors.len();
        company.directors.retain(|d| self.keeps(d));

        // Stable: entries already ordered by appointment stay in that order
        sort_by_appointment(&mut company.directors);
        limit_directors(&mut company.directors, limits);

        if before != company.directors.len() {
            debug!(
                "Kept {} of {} officers for {}",
                company.directors.len(),
                before,
                company.name.value
            );
        }
    }
}

fn is_director_role(role: &str) -> bool {
    let role = role.to_lowercase();
    role.contains("director") || role.contains("member") || role.contains("partner")
}
