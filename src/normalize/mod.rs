//! Result normalization
//!
//! Converts each source's raw records into canonical company, director and
//! contact records. Every produced value is stamped with the originating
//! source. Records that cannot be mapped are dropped, not reported as errors.

pub mod keys;

use crate::records::{
    merge_contacts, merge_directors, ActivityStatus, CompanyRecord, CompanyStatus, ContactKind,
    ContactRecord, DirectorRecord, SourceKind, Sourced,
};
use crate::sources::{RawRecord, SourceDescriptor};
use chrono::NaiveDate;
use tracing::debug;

const NAME: &[&str] = &["name", "company_name", "title", "organization_name", "legal_name"];
const REGISTRATION: &[&str] = &[
    "company_number",
    "registration_number",
    "reg_no",
    "regNo",
    "crn",
];
const STATUS: &[&str] = &["company_status", "status"];
const LEGAL_TYPE: &[&str] = &["company_type", "legal_type", "legal_form"];
const INCORPORATED: &[&str] = &["incorporation_date", "incorporated_on", "date_of_creation", "founded_on"];
const DISSOLVED: &[&str] = &["dissolved_date", "dissolved_on", "date_of_cessation"];
const ADDRESS: &[&str] = &["registered_office_address", "registered_address", "address", "location"];
const WEBSITE: &[&str] = &["website", "homepage_url", "domain"];
const INDUSTRY: &[&str] = &["industry", "sector"];
const BUSINESS: &[&str] = &["nature_of_business", "sic_codes", "description", "short_description"];
const EMPLOYEES: &[&str] = &["employees", "num_employees", "employee_count", "size"];
const REVENUE: &[&str] = &["revenue", "annual_revenue", "turnover"];
const LINK: &[&str] = &["companies_house_url", "profile_url", "url"];
const EMAIL: &[&str] = &["email", "email_address"];
const PHONE: &[&str] = &["phone", "telephone", "phone_number"];
const PROFILE: &[&str] = &["linkedin_url", "linkedin"];

const DIRECTORS: &[&str] = &["directors", "officers"];
const DIRECTOR_NAME: &[&str] = &["name", "officer_name"];
const DIRECTOR_ROLE: &[&str] = &["officer_role", "role", "title"];
const APPOINTED: &[&str] = &["appointed_on", "appointment_date", "appointedOn", "appointmentDate"];
const RESIGNED: &[&str] = &["resigned_on", "resignation_date", "resignedOn", "resignationDate"];
const DIRECTOR_STATUS: &[&str] = &["officer_status", "status"];

/// Longest company name accepted from a source
const MAX_NAME_LEN: usize = 500;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d %B %Y", "%d %b %Y", "%d/%m/%Y"];

/// Normalize one raw record from `source`.
///
/// Returns `None` when the record has no usable company name.
pub fn normalize_record(source: &SourceDescriptor, raw: &RawRecord) -> Option<CompanyRecord> {
    let tag = Tagger::new(source);

    let name = match raw.first_text(NAME) {
        Some(name) if name.len() <= MAX_NAME_LEN && !keys::name_key(&name).is_empty() => name,
        _ => {
            debug!("Dropping record from {} without a usable name", source.name);
            return None;
        }
    };

    let mut company = CompanyRecord::new(tag.value(name));

    company.registration_number = raw
        .first_text(REGISTRATION)
        .filter(|n| keys::registration_key(n).is_some())
        .map(|n| tag.value(n));
    company.status = raw
        .first_text(STATUS)
        .map(|s| CompanyStatus::parse(&s))
        .filter(|s| *s != CompanyStatus::Unknown)
        .map(|s| tag.value(s));
    company.legal_type = raw.first_text(LEGAL_TYPE).map(|t| tag.value(t));
    company.incorporation_date = raw
        .first_text(INCORPORATED)
        .and_then(|d| parse_date(&d))
        .map(|d| tag.value(d));
    company.dissolved_date = raw
        .first_text(DISSOLVED)
        .and_then(|d| parse_date(&d))
        .map(|d| tag.value(d));
    company.registered_address = raw.first_text(ADDRESS).map(|a| tag.value(a));
    company.website = raw
        .first_text(WEBSITE)
        .and_then(|w| keys::domain_of(&w))
        .map(|w| tag.value(w));
    company.industry = raw.first_text(INDUSTRY).map(|i| tag.value(i));
    company.nature_of_business = raw.first_text(BUSINESS).map(|b| tag.value(b));
    company.employees = raw.first_text(EMPLOYEES).map(|e| tag.value(e));
    company.revenue = raw.first_text(REVENUE).map(|r| tag.value(r));

    if let Some(link) = raw.first_text(LINK) {
        company.source_links.insert(source.name.clone(), link);
    }

    let contacts = observed_contacts(source, raw);
    merge_contacts(&mut company.contacts, contacts);

    let directors: Vec<DirectorRecord> = DIRECTORS
        .iter()
        .flat_map(|key| raw.records(key))
        .filter_map(|officer| normalize_director(source, &officer))
        .collect();
    merge_directors(&mut company.directors, directors);

    Some(company)
}

/// Normalize one officer entry nested in a company record
pub fn normalize_director(source: &SourceDescriptor, raw: &RawRecord) -> Option<DirectorRecord> {
    let tag = Tagger::new(source);

    let name = raw
        .first_text(DIRECTOR_NAME)
        .map(|n| display_person_name(&n))
        .filter(|n| !keys::director_key(n).is_empty())?;

    let mut director = DirectorRecord::new(tag.value(name));
    director.role = raw.first_text(DIRECTOR_ROLE).map(|r| tag.value(r));
    director.appointed_on = raw
        .first_text(APPOINTED)
        .and_then(|d| parse_date(&d))
        .map(|d| tag.value(d));
    director.resigned_on = raw
        .first_text(RESIGNED)
        .and_then(|d| parse_date(&d))
        .map(|d| tag.value(d));
    director.status = raw
        .first_text(DIRECTOR_STATUS)
        .map(|s| ActivityStatus::parse(&s))
        .filter(|s| *s != ActivityStatus::Unknown)
        .map(|s| tag.value(s));
    director.nationality = raw.text("nationality").map(|n| tag.value(n));
    director.occupation = raw.text("occupation").map(|o| tag.value(o));

    let contacts = observed_contacts(source, raw);
    merge_contacts(&mut director.contacts, contacts);

    Some(director)
}

fn observed_contacts(source: &SourceDescriptor, raw: &RawRecord) -> Vec<ContactRecord> {
    let mut contacts = Vec::new();

    if let Some(email) = raw.first_text(EMAIL).filter(|e| e.contains('@')) {
        contacts.push(ContactRecord::observed(ContactKind::Email, email, &source.name));
    }
    if let Some(phone) = raw.first_text(PHONE) {
        contacts.push(ContactRecord::observed(ContactKind::Phone, phone, &source.name));
    }
    if let Some(website) = raw.first_text(WEBSITE).and_then(|w| keys::domain_of(&w)) {
        contacts.push(ContactRecord::observed(
            ContactKind::Website,
            format!("https://{}", website),
            &source.name,
        ));
    }

    // A professional network's own result link is the profile itself
    let profile = match source.kind {
        SourceKind::Network => raw.first_text(PROFILE).or_else(|| raw.text("url")),
        _ => raw.first_text(PROFILE),
    };
    if let Some(profile) = profile {
        contacts.push(ContactRecord::observed(
            ContactKind::ProfessionalProfile,
            profile,
            &source.name,
        ));
    }

    contacts
}

/// Parse the date formats sources publish
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Turn registry-style `SURNAME, Forenames` into `Forenames Surname`,
/// fixing all-caps words on the way.
pub fn display_person_name(raw: &str) -> String {
    let ordered = match raw.split_once(',') {
        Some((surname, forenames)) if !forenames.trim().is_empty() => {
            format!("{} {}", forenames.trim(), surname.trim())
        }
        _ => raw.trim().to_string(),
    };

    ordered
        .split_whitespace()
        .map(title_case_if_shouting)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case_if_shouting(word: &str) -> String {
    let letters: Vec<char> = word.chars().filter(|c| c.is_alphabetic()).collect();
    let shouting = letters.len() > 1 && letters.iter().all(|c| c.is_uppercase());
    if !shouting {
        return word.to_string();
    }

    let mut out = String::with_capacity(word.len());
    let mut start_of_part = true;
    for c in word.chars() {
        if start_of_part {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        start_of_part = c == '-' || c == '\'';
    }
    out
}

/// Stamps values with the source that produced them
struct Tagger<'a> {
    source: &'a SourceDescriptor,
}

impl<'a> Tagger<'a> {
    fn new(source: &'a SourceDescriptor) -> Self {
        Self { source }
    }

    fn value<T: Ord>(&self, value: T) -> Sourced<T> {
        Sourced::new(value, &self.source.name, self.source.kind, self.source.priority)
    }
}
