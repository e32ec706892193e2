//! Company and director record definitions

use super::contact::{merge_contacts, ContactKind, ContactOrigin, ContactRecord};
use crate::normalize::keys;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Broad class of an external data source
///
/// The class decides the default merge priority and which source is
/// authoritative for status fields.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Official company registry
    Registry,
    /// Commercial business-data provider
    BusinessData,
    /// Professional network
    Network,
    /// General web search
    #[default]
    Search,
}

impl SourceKind {
    /// Default merge priority (higher wins)
    pub fn default_priority(self) -> u32 {
        match self {
            Self::Registry => 40,
            Self::BusinessData => 30,
            Self::Network => 20,
            Self::Search => 10,
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Registry => write!(f, "registry"),
            Self::BusinessData => write!(f, "business_data"),
            Self::Network => write!(f, "network"),
            Self::Search => write!(f, "search"),
        }
    }
}

/// A field value tagged with the source that supplied it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sourced<T> {
    pub value: T,
    /// Configured source name
    pub source: String,
    pub kind: SourceKind,
    pub priority: u32,
}

impl<T: Ord> Sourced<T> {
    pub fn new(value: T, source: impl Into<String>, kind: SourceKind, priority: u32) -> Self {
        Self {
            value,
            source: source.into(),
            kind,
            priority,
        }
    }

    /// Total precedence order: priority, then source name, then value.
    ///
    /// When `authority` is set, values from that source kind rank above
    /// everything else.
    fn rank_cmp(&self, other: &Self, authority: Option<SourceKind>) -> Ordering {
        let authoritative = |s: &Self| authority.map(|k| s.kind == k).unwrap_or(false);

        authoritative(self)
            .cmp(&authoritative(other))
            .then_with(|| self.priority.cmp(&other.priority))
            .then_with(|| other.source.cmp(&self.source))
            .then_with(|| other.value.cmp(&self.value))
    }

    /// Whether this value should replace `other` during a merge
    pub fn outranks(&self, other: &Self) -> bool {
        self.rank_cmp(other, None) == Ordering::Greater
    }
}

/// Merge an optional field, keeping the highest-precedence non-empty value
pub fn merge_field<T: Ord>(slot: &mut Option<Sourced<T>>, incoming: Option<Sourced<T>>) {
    merge_field_with_authority(slot, incoming, None);
}

/// Merge an optional field where one source kind is authoritative
pub fn merge_field_with_authority<T: Ord>(
    slot: &mut Option<Sourced<T>>,
    incoming: Option<Sourced<T>>,
    authority: Option<SourceKind>,
) {
    let Some(incoming) = incoming else {
        return;
    };

    let replace = match slot {
        Some(current) => incoming.rank_cmp(current, authority) == Ordering::Greater,
        None => true,
    };

    if replace {
        *slot = Some(incoming);
    }
}

/// Lifecycle status of a company
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum CompanyStatus {
    Active,
    Dissolved,
    #[default]
    Unknown,
}

impl CompanyStatus {
    /// Interpret a free-text status as published by a source
    pub fn parse(raw: &str) -> Self {
        let status = raw.trim().to_lowercase();
        match status.as_str() {
            "active" | "open" | "live" | "trading" | "operating" => Self::Active,
            "dissolved" | "closed" | "converted-closed" | "converted / closed" | "removed"
            | "inactive" => Self::Dissolved,
            _ if status.starts_with("dissolved") => Self::Dissolved,
            _ if status.starts_with("active") => Self::Active,
            _ => Self::Unknown,
        }
    }
}

/// Activity status of a director appointment
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Active,
    Resigned,
    #[default]
    Unknown,
}

impl ActivityStatus {
    pub fn parse(raw: &str) -> Self {
        let status = raw.trim().to_lowercase();
        match status.as_str() {
            "active" | "current" => Self::Active,
            "resigned" | "inactive" | "former" | "ceased" | "terminated" => Self::Resigned,
            _ => Self::Unknown,
        }
    }
}

/// A director (or other officer) of a company
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DirectorRecord {
    pub name: Sourced<String>,
    pub role: Option<Sourced<String>>,
    pub appointed_on: Option<Sourced<NaiveDate>>,
    pub resigned_on: Option<Sourced<NaiveDate>>,
    /// Status as published by a source; see [`DirectorRecord::resolved_status`]
    pub status: Option<Sourced<ActivityStatus>>,
    pub nationality: Option<Sourced<String>>,
    pub occupation: Option<Sourced<String>>,
    pub provenance: BTreeSet<String>,
    #[serde(default)]
    pub contacts: Vec<ContactRecord>,
}

impl DirectorRecord {
    pub fn new(name: Sourced<String>) -> Self {
        let mut provenance = BTreeSet::new();
        provenance.insert(name.source.clone());

        Self {
            name,
            role: None,
            appointed_on: None,
            resigned_on: None,
            status: None,
            nationality: None,
            occupation: None,
            provenance,
            contacts: Vec::new(),
        }
    }

    /// Key used to decide two director entries are the same person
    pub fn match_key(&self) -> String {
        keys::director_key(&self.name.value)
    }

    /// Resolve activity: a resignation date or a registry marking of
    /// resignation means resigned, anything else counts as active.
    pub fn resolved_status(&self) -> ActivityStatus {
        if self.resigned_on.is_some() {
            return ActivityStatus::Resigned;
        }

        match &self.status {
            Some(status)
                if status.kind == SourceKind::Registry
                    && status.value == ActivityStatus::Resigned =>
            {
                ActivityStatus::Resigned
            }
            _ => ActivityStatus::Active,
        }
    }

    /// Whether a contact of this kind is already present
    pub fn has_contact(&self, kind: ContactKind) -> bool {
        self.contacts.iter().any(|c| c.kind == kind)
    }

    pub fn estimated_contact_count(&self) -> usize {
        self.contacts
            .iter()
            .filter(|c| c.origin == ContactOrigin::Estimated)
            .count()
    }

    /// Merge another entry for the same person into this one
    pub fn absorb(&mut self, other: DirectorRecord) {
        if other.name.outranks(&self.name) {
            self.name = other.name;
        }
        merge_field(&mut self.role, other.role);
        merge_field(&mut self.appointed_on, other.appointed_on);
        merge_field(&mut self.resigned_on, other.resigned_on);
        merge_field_with_authority(&mut self.status, other.status, Some(SourceKind::Registry));
        merge_field(&mut self.nationality, other.nationality);
        merge_field(&mut self.occupation, other.occupation);
        self.provenance.extend(other.provenance);
        merge_contacts(&mut self.contacts, other.contacts);
    }
}

/// Merge director lists by normalized name and order by appointment recency
pub fn merge_directors(directors: &mut Vec<DirectorRecord>, incoming: Vec<DirectorRecord>) {
    let mut by_key: BTreeMap<String, DirectorRecord> = BTreeMap::new();

    for director in directors.drain(..).chain(incoming) {
        match by_key.entry(director.match_key()) {
            Entry::Occupied(mut existing) => existing.get_mut().absorb(director),
            Entry::Vacant(slot) => {
                slot.insert(director);
            }
        }
    }

    // BTreeMap iteration is key-ordered, so the stable sort below leaves
    // undated appointments in name order.
    *directors = by_key.into_values().collect();
    sort_by_appointment(directors);
}

/// Most recent appointment first, undated appointments last
pub fn sort_by_appointment(directors: &mut [DirectorRecord]) {
    directors.sort_by(|a, b| {
        let a_date = a.appointed_on.as_ref().map(|d| d.value);
        let b_date = b.appointed_on.as_ref().map(|d| d.value);
        match (a_date, b_date) {
            (Some(a), Some(b)) => b.cmp(&a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
}

/// A consolidated company profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompanyRecord {
    pub name: Sourced<String>,
    pub registration_number: Option<Sourced<String>>,
    pub status: Option<Sourced<CompanyStatus>>,
    pub legal_type: Option<Sourced<String>>,
    pub incorporation_date: Option<Sourced<NaiveDate>>,
    pub dissolved_date: Option<Sourced<NaiveDate>>,
    pub registered_address: Option<Sourced<String>>,
    pub website: Option<Sourced<String>>,
    pub industry: Option<Sourced<String>>,
    pub nature_of_business: Option<Sourced<String>>,
    pub employees: Option<Sourced<String>>,
    pub revenue: Option<Sourced<String>>,
    /// Every name any source used for this company
    pub aliases: BTreeSet<String>,
    /// Source name -> page on that source describing the company
    pub source_links: BTreeMap<String, String>,
    pub provenance: BTreeSet<String>,
    pub directors: Vec<DirectorRecord>,
    pub contacts: Vec<ContactRecord>,
}

impl CompanyRecord {
    pub fn new(name: Sourced<String>) -> Self {
        let mut provenance = BTreeSet::new();
        provenance.insert(name.source.clone());
        let mut aliases = BTreeSet::new();
        aliases.insert(name.value.clone());

        Self {
            name,
            registration_number: None,
            status: None,
            legal_type: None,
            incorporation_date: None,
            dissolved_date: None,
            registered_address: None,
            website: None,
            industry: None,
            nature_of_business: None,
            employees: None,
            revenue: None,
            aliases,
            source_links: BTreeMap::new(),
            provenance,
            directors: Vec::new(),
            contacts: Vec::new(),
        }
    }

    /// Effective company status
    pub fn status(&self) -> CompanyStatus {
        self.status
            .as_ref()
            .map(|s| s.value)
            .unwrap_or(CompanyStatus::Unknown)
    }

    /// Normalized registration number, if any contributing source had one
    pub fn registration_key(&self) -> Option<String> {
        self.registration_number
            .as_ref()
            .and_then(|n| keys::registration_key(&n.value))
    }

    /// Normalized name key for the chosen display name
    pub fn name_key(&self) -> String {
        keys::name_key(&self.name.value)
    }

    /// Name keys across every alias
    pub fn alias_keys(&self) -> BTreeSet<String> {
        self.aliases
            .iter()
            .map(|a| keys::name_key(a))
            .filter(|k| !k.is_empty())
            .collect()
    }

    /// Matching key: registration number first, normalized name otherwise
    pub fn matching_key(&self) -> String {
        match self.registration_key() {
            Some(reg) => format!("reg:{}", reg),
            None => format!("name:{}", self.name_key()),
        }
    }

    /// Number of distinct sources that contributed
    pub fn source_count(&self) -> usize {
        self.provenance.len()
    }

    pub fn has_contact(&self, kind: ContactKind) -> bool {
        self.contacts.iter().any(|c| c.kind == kind)
    }

    pub fn estimated_contact_count(&self) -> usize {
        self.contacts
            .iter()
            .filter(|c| c.origin == ContactOrigin::Estimated)
            .count()
    }

    /// Merge a record describing the same company into this one
    pub fn absorb(&mut self, other: CompanyRecord) {
        if other.name.outranks(&self.name) {
            self.name = other.name;
        }
        merge_field(&mut self.registration_number, other.registration_number);
        merge_field_with_authority(&mut self.status, other.status, Some(SourceKind::Registry));
        merge_field(&mut self.legal_type, other.legal_type);
        merge_field(&mut self.incorporation_date, other.incorporation_date);
        merge_field(&mut self.dissolved_date, other.dissolved_date);
        merge_field(&mut self.registered_address, other.registered_address);
        merge_field(&mut self.website, other.website);
        merge_field(&mut self.industry, other.industry);
        merge_field(&mut self.nature_of_business, other.nature_of_business);
        merge_field(&mut self.employees, other.employees);
        merge_field(&mut self.revenue, other.revenue);

        self.aliases.extend(other.aliases);
        for (source, link) in other.source_links {
            let keep_existing = self
                .source_links
                .get(&source)
                .map(|existing| existing <= &link)
                .unwrap_or(false);
            if !keep_existing {
                self.source_links.insert(source, link);
            }
        }
        self.provenance.extend(other.provenance);
        merge_directors(&mut self.directors, other.directors);
        merge_contacts(&mut self.contacts, other.contacts);
    }
}

/// Why a source contributed nothing to a consolidation
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SourceError {
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP error: {0}")]
    Http(u16),
    #[error("access denied")]
    AccessDenied,
    #[error("CAPTCHA required")]
    Captcha,
    #[error("too many requests")]
    TooManyRequests,
    #[error("failed to parse response: {0}")]
    Parse(String),
    #[error("API key required but not configured")]
    MissingApiKey,
    #[error("cancelled")]
    Cancelled,
    #[error("source task terminated unexpectedly")]
    Terminated,
}

/// A source that failed during a consolidation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceFailure {
    pub source: String,
    pub error: SourceError,
}

/// Per-source response timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceTiming {
    pub source: String,
    pub time_ms: u64,
    pub record_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(value: &str) -> Sourced<String> {
        Sourced::new(value.to_string(), "companies_house", SourceKind::Registry, 40)
    }

    fn search(value: &str) -> Sourced<String> {
        Sourced::new(value.to_string(), "google", SourceKind::Search, 10)
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_higher_priority_field_wins() {
        let mut slot = Some(search("1 Search Road"));
        merge_field(&mut slot, Some(registry("1 Registry Road")));
        assert_eq!(slot.unwrap().value, "1 Registry Road");

        let mut slot = Some(registry("1 Registry Road"));
        merge_field(&mut slot, Some(search("1 Search Road")));
        assert_eq!(slot.unwrap().value, "1 Registry Road");
    }

    #[test]
    fn test_empty_never_overwrites() {
        let mut slot = Some(search("value"));
        merge_field(&mut slot, None);
        assert_eq!(slot.unwrap().value, "value");
    }

    #[test]
    fn test_authority_beats_priority() {
        let registry_status = Sourced::new(ActivityStatus::Active, "ch", SourceKind::Registry, 1);
        let network_status = Sourced::new(ActivityStatus::Resigned, "li", SourceKind::Network, 99);

        let mut slot = Some(network_status);
        merge_field_with_authority(&mut slot, Some(registry_status), Some(SourceKind::Registry));
        assert_eq!(slot.unwrap().value, ActivityStatus::Active);
    }

    #[test]
    fn test_company_status_parse() {
        assert_eq!(CompanyStatus::parse("Active"), CompanyStatus::Active);
        assert_eq!(CompanyStatus::parse("Dissolved on 1 May 2020"), CompanyStatus::Dissolved);
        assert_eq!(CompanyStatus::parse("Liquidation"), CompanyStatus::Unknown);
    }

    #[test]
    fn test_resolved_status() {
        let mut director = DirectorRecord::new(registry("Jane Doe"));
        assert_eq!(director.resolved_status(), ActivityStatus::Active);

        director.status = Some(Sourced::new(ActivityStatus::Resigned, "li", SourceKind::Network, 20));
        assert_eq!(director.resolved_status(), ActivityStatus::Active);

        director.status = Some(Sourced::new(ActivityStatus::Resigned, "ch", SourceKind::Registry, 40));
        assert_eq!(director.resolved_status(), ActivityStatus::Resigned);

        let mut director = DirectorRecord::new(search("John Smith"));
        director.resigned_on = Some(Sourced::new(date("2020-01-01"), "google", SourceKind::Search, 10));
        assert_eq!(director.resolved_status(), ActivityStatus::Resigned);
    }

    #[test]
    fn test_merge_directors_by_name() {
        let mut first = DirectorRecord::new(registry("Jane  Doe"));
        first.appointed_on = Some(Sourced::new(date("2019-03-01"), "companies_house", SourceKind::Registry, 40));
        let second = DirectorRecord::new(search("jane doe"));
        let mut third = DirectorRecord::new(search("John Smith"));
        third.appointed_on = Some(Sourced::new(date("2021-06-01"), "google", SourceKind::Search, 10));

        let mut directors = vec![first];
        merge_directors(&mut directors, vec![second, third]);

        assert_eq!(directors.len(), 2);
        assert_eq!(directors[0].name.value, "John Smith");
        assert_eq!(directors[1].provenance.len(), 2);
        assert_eq!(directors[1].name.value, "Jane  Doe");
    }

    #[test]
    fn test_company_absorb_unions_provenance() {
        let mut company = CompanyRecord::new(registry("Acme Ltd"));
        company.status = Some(Sourced::new(CompanyStatus::Active, "companies_house", SourceKind::Registry, 40));

        let mut other = CompanyRecord::new(search("ACME LIMITED"));
        other.status = Some(Sourced::new(CompanyStatus::Dissolved, "google", SourceKind::Search, 10));
        other.website = Some(search("acme.co.uk"));

        company.absorb(other);

        assert_eq!(company.name.value, "Acme Ltd");
        assert_eq!(company.status(), CompanyStatus::Active);
        assert_eq!(company.website.unwrap().value, "acme.co.uk");
        assert_eq!(company.provenance.len(), 2);
        assert_eq!(company.aliases.len(), 2);
    }
}
