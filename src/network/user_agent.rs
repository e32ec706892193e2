//! User agent and accept header generation

use rand::seq::SliceRandom;
use rand::Rng;

const PLATFORMS: &[&str] = &[
    "Windows NT 10.0; Win64; x64",
    "Macintosh; Intel Mac OS X 10_15_7",
    "Macintosh; Intel Mac OS X 14_4_1",
    "X11; Linux x86_64",
];

const CHROME: &[&str] = &["122.0.0.0", "123.0.0.0", "124.0.0.0", "125.0.0.0", "126.0.0.0"];
const FIREFOX: &[&str] = &["124.0", "125.0", "126.0", "127.0"];
const EDGE: &[&str] = &["124.0.2478.80", "125.0.2535.67", "126.0.2592.56"];

/// Pick one entry; tables are non-empty constants
fn pick<R: Rng>(rng: &mut R, table: &'static [&'static str]) -> &'static str {
    table.choose(rng).copied().unwrap_or(table[0])
}

/// Generate a random desktop Chrome, Edge or Firefox user agent string
pub fn generate_user_agent() -> String {
    let mut rng = rand::thread_rng();
    let platform = pick(&mut rng, PLATFORMS);

    match rng.gen_range(0..10u8) {
        0..=5 => format!(
            "Mozilla/5.0 ({}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{} Safari/537.36",
            platform,
            pick(&mut rng, CHROME)
        ),
        6..=7 => {
            let edge = pick(&mut rng, EDGE);
            let chrome_major = edge.split('.').next().unwrap_or("124");
            format!(
                "Mozilla/5.0 ({}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{}.0.0.0 Safari/537.36 Edg/{}",
                platform, chrome_major, edge
            )
        }
        _ => {
            let firefox = pick(&mut rng, FIREFOX);
            format!(
                "Mozilla/5.0 ({}; rv:{}) Gecko/20100101 Firefox/{}",
                platform, firefox, firefox
            )
        }
    }
}

/// Accept header for HTML pages
pub fn accept_html() -> &'static str {
    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"
}

/// Accept header for JSON APIs
pub fn accept_json() -> &'static str {
    "application/json,text/javascript,*/*;q=0.01"
}

/// Accept-language header preferring `lang`, falling back to English
pub fn accept_language(lang: &str) -> String {
    if lang.is_empty() || lang.starts_with("en") {
        format!("{},en;q=0.9", if lang.is_empty() { "en-GB" } else { lang })
    } else {
        format!("{},en-GB;q=0.9,en;q=0.8", lang)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_user_agent() {
        for _ in 0..20 {
            let ua = generate_user_agent();
            assert!(ua.starts_with("Mozilla/5.0"));
            assert!(ua.len() > 50);
        }
    }

    #[test]
    fn test_accept_language() {
        assert_eq!(accept_language("en-GB"), "en-GB,en;q=0.9");
        assert_eq!(accept_language(""), "en-GB,en;q=0.9");
        assert_eq!(accept_language("fr"), "fr,en-GB;q=0.9,en;q=0.8");
    }
}
