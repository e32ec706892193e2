//! Contact entries attached to companies and directors

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Kind of contact point
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ContactKind {
    Email,
    Phone,
    ProfessionalProfile,
    Website,
}

impl std::fmt::Display for ContactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Email => write!(f, "email"),
            Self::Phone => write!(f, "phone"),
            Self::ProfessionalProfile => write!(f, "professional_profile"),
            Self::Website => write!(f, "website"),
        }
    }
}

/// Where a contact value came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ContactOrigin {
    /// Published by a source
    Observed,
    /// Synthesized from known fields by the contact estimator
    Estimated,
}

/// A single contact point
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContactRecord {
    pub kind: ContactKind,
    pub value: String,
    pub origin: ContactOrigin,
    /// Source name, or `estimator` for estimated entries
    pub source: String,
    /// 0.0 to 1.0
    pub confidence: f32,
}

impl ContactRecord {
    /// Confidence assigned to anything a source published directly
    pub const OBSERVED_CONFIDENCE: f32 = 0.9;

    pub fn observed(kind: ContactKind, value: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
            origin: ContactOrigin::Observed,
            source: source.into(),
            confidence: Self::OBSERVED_CONFIDENCE,
        }
    }

    pub fn estimated(kind: ContactKind, value: impl Into<String>, confidence: f32) -> Self {
        Self {
            kind,
            value: value.into(),
            origin: ContactOrigin::Estimated,
            source: "estimator".to_string(),
            confidence,
        }
    }

    pub fn is_estimated(&self) -> bool {
        self.origin == ContactOrigin::Estimated
    }

    fn dedup_key(&self) -> (ContactKind, String) {
        (self.kind, self.value.trim().to_lowercase())
    }

    /// Preference between two entries carrying the same value
    fn preferred_over(&self, other: &Self) -> bool {
        other
            .origin
            .cmp(&self.origin)
            .then_with(|| self.confidence.total_cmp(&other.confidence))
            .then_with(|| other.source.cmp(&self.source))
            == Ordering::Greater
    }
}

/// Union two contact lists, collapsing duplicate values.
///
/// Observed entries win over estimated ones for the same value. The result
/// is ordered by confidence, then kind, then value.
pub fn merge_contacts(contacts: &mut Vec<ContactRecord>, incoming: Vec<ContactRecord>) {
    let mut by_key: BTreeMap<(ContactKind, String), ContactRecord> = BTreeMap::new();

    for contact in contacts.drain(..).chain(incoming) {
        match by_key.entry(contact.dedup_key()) {
            Entry::Occupied(mut existing) => {
                if contact.preferred_over(existing.get()) {
                    existing.insert(contact);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(contact);
            }
        }
    }

    *contacts = by_key.into_values().collect();
    sort_contacts(contacts);
}

/// Observed first, then by descending confidence
pub fn sort_contacts(contacts: &mut [ContactRecord]) {
    contacts.sort_by(|a, b| {
        a.origin
            .cmp(&b.origin)
            .then_with(|| b.confidence.total_cmp(&a.confidence))
            .then_with(|| a.kind.cmp(&b.kind))
            .then_with(|| a.value.cmp(&b.value))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observed_beats_estimated_duplicate() {
        let mut contacts = vec![ContactRecord::estimated(
            ContactKind::Email,
            "info@acme.co.uk",
            0.6,
        )];
        merge_contacts(
            &mut contacts,
            vec![ContactRecord::observed(
                ContactKind::Email,
                "INFO@acme.co.uk",
                "dnb",
            )],
        );

        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].origin, ContactOrigin::Observed);
        assert_eq!(contacts[0].source, "dnb");
    }

    #[test]
    fn test_ordering() {
        let mut contacts = Vec::new();
        merge_contacts(
            &mut contacts,
            vec![
                ContactRecord::estimated(ContactKind::ProfessionalProfile, "https://x", 0.7),
                ContactRecord::observed(ContactKind::Website, "https://acme.co.uk", "google"),
                ContactRecord::estimated(ContactKind::Email, "info@acme.co.uk", 0.6),
            ],
        );

        assert_eq!(contacts[0].kind, ContactKind::Website);
        assert_eq!(contacts[1].kind, ContactKind::ProfessionalProfile);
        assert_eq!(contacts[2].kind, ContactKind::Email);
    }
}
