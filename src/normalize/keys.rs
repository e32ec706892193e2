//! Matching keys and name-derived identifiers

use once_cell::sync::Lazy;
use regex::Regex;

static REGISTRATION_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:company|registration|registered|reg\.?)\s*(?:number|no\.?|#)?\s*[:#]?\s*")
        .expect("registration label pattern is valid")
});

/// Legal-form suffixes stripped from the end of a name key, longest first
const LEGAL_SUFFIXES: &[&[&str]] = &[
    &["public", "limited", "company"],
    &["limited", "liability", "partnership"],
    &["limited", "liability", "company"],
    &["community", "interest", "company"],
    &["limited"],
    &["ltd"],
    &["plc"],
    &["llp"],
    &["lp"],
    &["llc"],
    &["inc"],
    &["incorporated"],
    &["corp"],
    &["corporation"],
    &["co"],
    &["company"],
    &["cic"],
    &["gmbh"],
    &["ag"],
    &["sa"],
    &["bv"],
];

const PERSON_TITLES: &[&str] = &["mr", "mrs", "ms", "miss", "mx", "dr", "sir", "dame", "prof", "lord", "lady"];

/// Normalize a registration number: drop any label, keep only letters and
/// digits, upper-case. Purely numeric numbers shorter than eight digits are
/// zero-padded the way the UK register prints them.
pub fn registration_key(raw: &str) -> Option<String> {
    let unlabelled = REGISTRATION_LABEL.replace(raw, "");
    let key: String = unlabelled
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect();

    if key.is_empty() {
        return None;
    }

    if key.len() < 8 && key.chars().all(|c| c.is_ascii_digit()) {
        return Some(format!("{:0>8}", key));
    }

    Some(key)
}

/// Split a name into lower-case alphanumeric tokens.
///
/// `&` becomes `and`, dots and apostrophes are removed (so `L.T.D.` reads as
/// `ltd`), any other punctuation separates tokens.
fn tokens(name: &str) -> Vec<String> {
    let mut cleaned = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '&' => cleaned.push_str(" and "),
            '.' | '\'' | '\u{2019}' | '"' => {}
            c if c.is_alphanumeric() => cleaned.extend(c.to_lowercase()),
            _ => cleaned.push(' '),
        }
    }

    cleaned.split_whitespace().map(|t| t.to_string()).collect()
}

/// Normalized company-name key: lower-cased, legal suffixes stripped,
/// whitespace collapsed
pub fn name_key(name: &str) -> String {
    let mut tokens = tokens(name);

    loop {
        let suffix = LEGAL_SUFFIXES
            .iter()
            .find(|suffix| tokens.len() > suffix.len() && ends_with(&tokens, suffix));

        match suffix {
            Some(suffix) => tokens.truncate(tokens.len() - suffix.len()),
            None => break,
        }
    }

    tokens.join(" ")
}

fn ends_with(tokens: &[String], suffix: &[&str]) -> bool {
    tokens.len() >= suffix.len()
        && tokens[tokens.len() - suffix.len()..]
            .iter()
            .zip(suffix)
            .all(|(a, b)| a.as_str() == *b)
}

/// Normalized director key: case-insensitive, whitespace-collapsed,
/// honorifics dropped
pub fn director_key(name: &str) -> String {
    let tokens = tokens(name);
    let start = tokens
        .iter()
        .take_while(|t| PERSON_TITLES.contains(&t.as_str()))
        .count();

    // A name made only of titles keeps them rather than collapsing to nothing
    let start = if start == tokens.len() { 0 } else { start };
    tokens[start..].join(" ")
}

/// Compact label usable as a domain or mailbox part, e.g. `Acme & Sons Ltd`
/// -> `acmeandsons`. Truncated to twenty characters.
pub fn compact_label(name: &str) -> String {
    name_key(name)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(20)
        .collect()
}

/// URL slug, e.g. `Acme & Sons Ltd` -> `acme-and-sons-ltd`
pub fn slug(name: &str) -> String {
    tokens(name)
        .into_iter()
        .map(|t| t.chars().filter(|c| c.is_ascii_alphanumeric()).collect::<String>())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// First and last name tokens of a person, ASCII only, honorifics dropped
pub fn person_name_parts(name: &str) -> Option<(String, String)> {
    let key = director_key(name);
    let parts: Vec<String> = key
        .split_whitespace()
        .map(|t| t.chars().filter(|c| c.is_ascii_alphanumeric()).collect::<String>())
        .filter(|t| !t.is_empty())
        .collect();

    if parts.len() < 2 {
        return None;
    }

    Some((parts[0].clone(), parts[parts.len() - 1].clone()))
}

/// Bare host of a URL or domain string, without `www.`
pub fn domain_of(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{}", raw)
    };

    let parsed = url::Url::parse(&with_scheme).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();

    if host.contains('.') {
        Some(host)
    } else {
        None
    }
}
