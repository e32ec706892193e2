//! Company container: groups records describing the same company and
//! merges each group into one record

use crate::records::CompanyRecord;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

/// Collects normalized company records and merges them by matching key.
///
/// Records carrying a registration number group by that number. Records
/// without one are first joined with every other unnumbered record sharing a
/// name key, then attached to a numbered group whose names match, provided
/// exactly one such group exists. The rest stay grouped by name.
#[derive(Debug, Default)]
pub struct CompanyContainer {
    registered: BTreeMap<String, CompanyRecord>,
    unregistered: Vec<CompanyRecord>,
}

impl CompanyContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record, merging it with any numbered record sharing its key
    pub fn add(&mut self, record: CompanyRecord) {
        match record.registration_key() {
            Some(key) => match self.registered.get_mut(&key) {
                Some(existing) => existing.absorb(record),
                None => {
                    self.registered.insert(key, record);
                }
            },
            None => self.unregistered.push(record),
        }
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = CompanyRecord>) {
        for record in records {
            self.add(record);
        }
    }

    /// Records added so far, before name matching
    pub fn len(&self) -> usize {
        self.registered.len() + self.unregistered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve name matches and return merged companies, most corroborated
    /// first
    pub fn into_ordered(self) -> Vec<CompanyRecord> {
        let Self {
            mut registered,
            unregistered,
        } = self;

        let mut by_name: Vec<CompanyRecord> = Vec::new();
        for group in join_by_name(unregistered) {
            let keys = group.alias_keys();
            let matches: Vec<&String> = registered
                .iter()
                .filter(|(_, company)| !company.alias_keys().is_disjoint(&keys))
                .map(|(key, _)| key)
                .collect();

            match matches.as_slice() {
                [key] => {
                    let key = (*key).clone();
                    if let Some(company) = registered.get_mut(&key) {
                        debug!("Attaching '{}' to registration {}", group.name.value, key);
                        company.absorb(group);
                    }
                }
                _ => by_name.push(group),
            }
        }

        let mut companies: Vec<CompanyRecord> = registered.into_values().chain(by_name).collect();
        companies.sort_by(compare_companies);
        companies
    }
}

/// Join unnumbered records into connected groups of shared name keys
fn join_by_name(records: Vec<CompanyRecord>) -> Vec<CompanyRecord> {
    let mut groups: Vec<CompanyRecord> = Vec::new();

    for record in records {
        let keys = record.alias_keys();
        let (linked, rest): (Vec<_>, Vec<_>) = groups
            .into_iter()
            .partition(|group| !group.alias_keys().is_disjoint(&keys));

        let mut merged = record;
        for group in linked {
            merged.absorb(group);
        }

        groups = rest;
        groups.push(merged);
    }

    groups
}

/// More contributing sources first, then name, then matching key
fn compare_companies(a: &CompanyRecord, b: &CompanyRecord) -> Ordering {
    b.source_count()
        .cmp(&a.source_count())
        .then_with(|| a.name.value.to_lowercase().cmp(&b.name.value.to_lowercase()))
        .then_with(|| a.matching_key().cmp(&b.matching_key()))
}

/// Merge company records in one step
pub fn merge_companies(records: impl IntoIterator<Item = CompanyRecord>) -> Vec<CompanyRecord> {
    let mut container = CompanyContainer::new();
    container.extend(records);
    container.into_ordered()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_record;
    use crate::records::{CompanyStatus, SourceKind};
    use crate::sources::{RawRecord, SourceDescriptor};
    use std::collections::BTreeSet;

    fn registry() -> SourceDescriptor {
        SourceDescriptor::new("companies_house", SourceKind::Registry)
    }

    fn search() -> SourceDescriptor {
        SourceDescriptor::new("google", SourceKind::Search)
    }

    fn network() -> SourceDescriptor {
        SourceDescriptor::new("linkedin", SourceKind::Network)
    }

    fn record(source: &SourceDescriptor, fields: &[(&str, &str)]) -> CompanyRecord {
        let raw = fields
            .iter()
            .fold(RawRecord::new(), |raw, (k, v)| raw.with(*k, *v));
        normalize_record(source, &raw).unwrap()
    }

    fn provenance(company: &CompanyRecord) -> Vec<&str> {
        company.provenance.iter().map(|s| s.as_str()).collect()
    }

    #[test]
    fn test_registration_match_prefers_registry_status() {
        let companies = merge_companies(vec![
            record(
                &registry(),
                &[("name", "Acme Ltd"), ("regNo", "01234567"), ("status", "active")],
            ),
            record(&search(), &[("name", "ACME LIMITED"), ("regNo", "01234567")]),
        ]);

        assert_eq!(companies.len(), 1);
        assert_eq!(companies[0].status(), CompanyStatus::Active);
        assert_eq!(provenance(&companies[0]), vec!["companies_house", "google"]);
    }

    #[test]
    fn test_registry_status_wins_over_disagreeing_source() {
        let companies = merge_companies(vec![
            record(&search(), &[("name", "Acme Ltd"), ("company_number", "1234567"), ("status", "dissolved")]),
            record(&registry(), &[("name", "ACME LIMITED"), ("company_number", "01234567"), ("status", "active")]),
        ]);

        assert_eq!(companies.len(), 1);
        assert_eq!(companies[0].status(), CompanyStatus::Active);
        assert_eq!(companies[0].name.value, "ACME LIMITED");
    }

    #[test]
    fn test_name_only_records_attach_to_unique_registration() {
        let companies = merge_companies(vec![
            record(&registry(), &[("name", "ACME LIMITED"), ("company_number", "01234567")]),
            record(&network(), &[("name", "Acme Ltd"), ("url", "https://www.linkedin.com/company/acme")]),
            record(&search(), &[("name", "Globex"), ("website", "globex.com")]),
        ]);

        assert_eq!(companies.len(), 2);
        assert_eq!(companies[0].name.value, "ACME LIMITED");
        assert_eq!(companies[0].source_count(), 2);
        assert_eq!(companies[1].name.value, "Globex");
    }

    #[test]
    fn test_ambiguous_name_stays_separate() {
        let companies = merge_companies(vec![
            record(&registry(), &[("name", "Acme Ltd"), ("company_number", "01234567")]),
            record(&registry(), &[("name", "ACME LIMITED"), ("company_number", "07654321")]),
            record(&search(), &[("name", "Acme")]),
        ]);

        assert_eq!(companies.len(), 3);
        assert!(companies.iter().any(|c| c.matching_key() == "name:acme"));
    }

    #[test]
    fn test_sorted_by_corroboration_then_name() {
        let companies = merge_companies(vec![
            record(&search(), &[("name", "Zeta Ltd")]),
            record(&search(), &[("name", "beta Ltd")]),
            record(&registry(), &[("name", "Zeta Limited")]),
        ]);

        let names: Vec<_> = companies.iter().map(|c| c.name.value.as_str()).collect();
        assert_eq!(names, vec!["Zeta Limited", "beta Ltd"]);
    }

    #[test]
    fn test_merge_is_order_independent_and_associative() {
        let a = record(&registry(), &[("name", "Acme Ltd"), ("company_number", "01234567"), ("status", "active")]);
        let b = record(&search(), &[("name", "ACME LIMITED"), ("company_number", "01234567"), ("website", "acme.co.uk")]);
        let c = record(&network(), &[("name", "Acme"), ("industry", "Manufacturing")]);
        let d = record(&search(), &[("name", "Globex Corporation")]);

        let all = merge_companies(vec![a.clone(), b.clone(), c.clone(), d.clone()]);
        let reversed = merge_companies(vec![d.clone(), c.clone(), b.clone(), a.clone()]);

        let partial = merge_companies(vec![a, b]);
        let staged = merge_companies(partial.into_iter().chain(vec![c, d]));

        assert_eq!(all, reversed);
        assert_eq!(all, staged);

        let keys: BTreeSet<_> = all.iter().map(|c| c.matching_key()).collect();
        assert_eq!(keys.len(), 2);
        assert_eq!(all[0].source_count(), 3);
        assert_eq!(all[0].website.as_ref().unwrap().value, "acme.co.uk");
    }
}
