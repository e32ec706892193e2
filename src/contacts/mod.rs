//! Contact estimation
//!
//! Derives best-effort company and director contacts from fields already on
//! the record. Estimated entries are tagged [`ContactOrigin::Estimated`] and
//! never replace a contact of the same kind, observed or estimated.
//!
//! [`ContactOrigin::Estimated`]: crate::records::ContactOrigin::Estimated

use crate::config::EstimationSettings;
use crate::limits::Limits;
use crate::normalize::keys;
use crate::records::{sort_contacts, CompanyRecord, ContactKind, ContactRecord, DirectorRecord};

const COMPANY_EMAIL_CONFIDENCE: f32 = 0.60;
const COMPANY_PROFILE_CONFIDENCE: f32 = 0.70;
const COMPANY_WEBSITE_CONFIDENCE: f32 = 0.65;
const DIRECTOR_EMAIL_CONFIDENCE: f32 = 0.75;
const DIRECTOR_PROFILE_CONFIDENCE: f32 = 0.65;

/// Deterministic contact estimator
#[derive(Debug, Clone, Default)]
pub struct ContactEstimator {
    settings: EstimationSettings,
}

impl ContactEstimator {
    pub fn new(settings: EstimationSettings) -> Self {
        Self { settings }
    }

    /// Add estimated contacts to a company and its directors, up to the
    /// per-entity caps in `limits`
    pub fn estimate(&self, company: &mut CompanyRecord, limits: &Limits) {
        let domain = self.company_domain(company);

        let candidates = self.company_candidates(company, domain.as_deref());
        fill(&mut company.contacts, candidates, limits.contacts_per_company_max);

        for director in &mut company.directors {
            let candidates = self.director_candidates(director, domain.as_deref());
            fill(&mut director.contacts, candidates, limits.contacts_per_director_max);
        }
    }

    /// Known website domain, else the compact name under the configured suffix
    fn company_domain(&self, company: &CompanyRecord) -> Option<String> {
        if let Some(website) = &company.website {
            return Some(website.value.clone());
        }

        let observed_site = company
            .contacts
            .iter()
            .filter(|c| c.kind == ContactKind::Website && !c.is_estimated())
            .find_map(|c| keys::domain_of(&c.value));
        if observed_site.is_some() {
            return observed_site;
        }

        let label = keys::compact_label(&company.name.value);
        if label.is_empty() {
            return None;
        }
        Some(format!("{}{}", label, self.settings.email_domain_suffix))
    }

    /// Candidates in preference order: email, profile, website
    fn company_candidates(&self, company: &CompanyRecord, domain: Option<&str>) -> Vec<ContactRecord> {
        let mut candidates = Vec::new();

        if let Some(domain) = domain {
            candidates.push(ContactRecord::estimated(
                ContactKind::Email,
                format!("{}@{}", self.settings.company_mailbox, domain),
                COMPANY_EMAIL_CONFIDENCE,
            ));
        }

        let slug = keys::slug(&company.name.value);
        if !slug.is_empty() {
            candidates.push(ContactRecord::estimated(
                ContactKind::ProfessionalProfile,
                format!("{}/company/{}", self.profile_base(), slug),
                COMPANY_PROFILE_CONFIDENCE,
            ));
        }

        if let Some(domain) = domain {
            candidates.push(ContactRecord::estimated(
                ContactKind::Website,
                format!("https://www.{}", domain),
                COMPANY_WEBSITE_CONFIDENCE,
            ));
        }

        candidates
    }

    /// Candidates in preference order: email, profile
    fn director_candidates(&self, director: &DirectorRecord, domain: Option<&str>) -> Vec<ContactRecord> {
        let Some((first, last)) = keys::person_name_parts(&director.name.value) else {
            return Vec::new();
        };

        let mut candidates = Vec::new();

        if let Some(domain) = domain {
            candidates.push(ContactRecord::estimated(
                ContactKind::Email,
                format!("{}.{}@{}", first, last, domain),
                DIRECTOR_EMAIL_CONFIDENCE,
            ));
        }

        candidates.push(ContactRecord::estimated(
            ContactKind::ProfessionalProfile,
            format!("{}/in/{}-{}", self.profile_base(), first, last),
            DIRECTOR_PROFILE_CONFIDENCE,
        ));

        candidates
    }

    fn profile_base(&self) -> &str {
        self.settings.profile_base_url.trim_end_matches('/')
    }
}

/// Append candidates whose kind is not yet present until `cap` estimated
/// contacts exist
fn fill(contacts: &mut Vec<ContactRecord>, candidates: Vec<ContactRecord>, cap: usize) {
    let mut estimated = contacts.iter().filter(|c| c.is_estimated()).count();
    let before = contacts.len();

    for candidate in candidates {
        if estimated >= cap {
            break;
        }
        if contacts.iter().any(|c| c.kind == candidate.kind) {
            continue;
        }
        contacts.push(candidate);
        estimated += 1;
    }

    if contacts.len() != before {
        sort_contacts(contacts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{ContactOrigin, SourceKind, Sourced};

    fn registry(value: &str) -> Sourced<String> {
        Sourced::new(value.to_string(), "companies_house", SourceKind::Registry, 40)
    }

    fn company_with_director() -> CompanyRecord {
        let mut company = CompanyRecord::new(registry("Acme & Sons Ltd"));
        company.directors.push(DirectorRecord::new(registry("Jane Doe")));
        company
    }

    fn values(contacts: &[ContactRecord]) -> Vec<&str> {
        contacts.iter().map(|c| c.value.as_str()).collect()
    }

    #[test]
    fn test_default_caps() {
        let mut company = company_with_director();
        ContactEstimator::default().estimate(&mut company, &Limits::default());

        assert_eq!(
            values(&company.contacts),
            vec!["https://www.linkedin.com/company/acme-and-sons-ltd", "info@acmeandsons.co.uk"]
        );
        assert!(company.contacts.iter().all(|c| c.origin == ContactOrigin::Estimated));

        let director = &company.directors[0];
        assert_eq!(values(&director.contacts), vec!["jane.doe@acmeandsons.co.uk"]);
    }

    #[test]
    fn test_known_website_domain_is_used() {
        let mut company = company_with_director();
        company.website = Some(Sourced::new("acme.com".to_string(), "google", SourceKind::Search, 10));

        ContactEstimator::default().estimate(&mut company, &Limits::default());
        assert!(values(&company.contacts).contains(&"info@acme.com"));
        assert_eq!(values(&company.directors[0].contacts), vec!["jane.doe@acme.com"]);
    }

    #[test]
    fn test_observed_contact_never_overwritten() {
        let mut company = company_with_director();
        company.contacts.push(ContactRecord::observed(
            ContactKind::Email,
            "hello@acme.co.uk",
            "dnb",
        ));

        ContactEstimator::default().estimate(&mut company, &Limits::default());

        let emails: Vec<_> = company
            .contacts
            .iter()
            .filter(|c| c.kind == ContactKind::Email)
            .collect();
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].value, "hello@acme.co.uk");
        assert_eq!(emails[0].origin, ContactOrigin::Observed);

        // Email slot taken, so the cap of two goes to profile and website
        assert_eq!(company.estimated_contact_count(), 2);
        assert!(company.has_contact(ContactKind::Website));
    }

    #[test]
    fn test_rerun_adds_nothing() {
        let mut company = company_with_director();
        let estimator = ContactEstimator::default();
        let limits = Limits::default();

        estimator.estimate(&mut company, &limits);
        let once = company.clone();
        estimator.estimate(&mut company, &limits);

        assert_eq!(company, once);
    }

    #[test]
    fn test_zero_caps() {
        let mut company = company_with_director();
        let limits = Limits::default().with_contacts_max(0, 0);

        ContactEstimator::default().estimate(&mut company, &limits);
        assert!(company.contacts.is_empty());
        assert!(company.directors[0].contacts.is_empty());
    }

    #[test]
    fn test_single_name_director_gets_nothing() {
        let mut company = CompanyRecord::new(registry("Acme Ltd"));
        company.directors.push(DirectorRecord::new(registry("Cher")));

        ContactEstimator::default().estimate(&mut company, &Limits::default());
        assert!(company.directors[0].contacts.is_empty());
    }
}
