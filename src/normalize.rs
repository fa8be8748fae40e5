//! Canonical forms for raw business fields.
//!
//! Every function here is total: malformed input yields a partial result or
//! `None`, never an error. Originals are kept by callers; these functions
//! only produce comparable forms.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Trailing tokens stripped from business names (English and French forms).
const CORPORATE_SUFFIXES: &[&str] = &[
    "inc",
    "incorporated",
    "incorporee",
    "incorporée",
    "ltd",
    "limited",
    "ltee",
    "ltée",
    "limitee",
    "limitée",
    "corp",
    "corporation",
    "co",
    "llc",
    "llp",
    "lp",
    "plc",
    "enr",
    "enrg",
    "senc",
    "srl",
];

/// Street abbreviation expansions, applied per token.
const STREET_ABBREVIATIONS: &[(&str, &str)] = &[
    ("st", "street"),
    ("str", "street"),
    ("rd", "road"),
    ("ave", "avenue"),
    ("av", "avenue"),
    ("blvd", "boulevard"),
    ("dr", "drive"),
    ("hwy", "highway"),
    ("ln", "lane"),
    ("ct", "court"),
    ("cres", "crescent"),
    ("cr", "crescent"),
    ("pkwy", "parkway"),
    ("pl", "place"),
    ("sq", "square"),
    ("ter", "terrace"),
    ("cir", "circle"),
    ("crt", "court"),
    ("e", "east"),
    ("w", "west"),
    ("n", "north"),
    ("s", "south"),
];

/// Province names and codes dropped from address components.
const PROVINCES: &[&str] = &[
    "on", "ontario", "qc", "quebec", "québec", "bc", "ab", "alberta", "mb", "manitoba", "sk",
    "nb", "ns", "pe", "nl", "yt", "nt", "nu", "canada",
];

static POSTAL_CODE_IN_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([a-z]\d[a-z])[\s-]?(\d[a-z]\d)\b").expect("valid postal code regex")
});

static POSTAL_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ABCEGHJ-NPRSTVXY]\d[ABCEGHJ-NPRSTV-Z]\d[ABCEGHJ-NPRSTV-Z]\d$")
        .expect("valid postal code regex")
});

static PHONE_EXTENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(ext\.?|extension|x|#)\s*\d+\s*$").expect("valid extension regex")
});

/// Address split into comparable components.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedAddress {
    pub street: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
}

impl NormalizedAddress {
    fn tokens(&self) -> HashSet<String> {
        [&self.street, &self.city, &self.postal_code]
            .into_iter()
            .flatten()
            .flat_map(|part| part.split_whitespace().map(str::to_string))
            .collect()
    }
}

/// Lower-case, drop periods and apostrophes, turn other punctuation into
/// whitespace and split into tokens.
fn tokenize(raw: &str) -> Vec<String> {
    let lowered = raw.to_lowercase().replace('&', " and ");
    let cleaned: String = lowered
        .chars()
        .filter(|c| !matches!(c, '.' | '\'' | '’'))
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    cleaned.split_whitespace().map(str::to_string).collect()
}

/// Canonical business name: lower-case, single-spaced, corporate suffixes removed.
///
/// Idempotent: `normalize_name(&normalize_name(x)) == normalize_name(x)`.
pub fn normalize_name(raw: &str) -> String {
    let mut tokens = tokenize(raw);
    while tokens.len() > 1
        && tokens
            .last()
            .is_some_and(|t| CORPORATE_SUFFIXES.contains(&t.as_str()))
    {
        tokens.pop();
    }
    tokens.join(" ")
}

/// Canonical street line with common abbreviations expanded.
pub fn normalize_street(raw: &str) -> String {
    tokenize(raw)
        .into_iter()
        .map(|token| {
            STREET_ABBREVIATIONS
                .iter()
                .find(|(abbr, _)| *abbr == token)
                .map(|(_, full)| full.to_string())
                .unwrap_or(token)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Canonical city name for allowlist comparison.
pub fn normalize_city(raw: &str) -> String {
    tokenize(raw).join(" ")
}

/// Split a free-form address into street, city and postal code.
///
/// Best effort: components that cannot be identified are left as `None`.
pub fn normalize_address(raw: &str) -> NormalizedAddress {
    let postal_code = POSTAL_CODE_IN_TEXT
        .captures(raw)
        .and_then(|caps| normalize_postal_code(&format!("{}{}", &caps[1], &caps[2])));
    let remainder = POSTAL_CODE_IN_TEXT.replace_all(raw, " ");

    let parts: Vec<String> = remainder
        .split(',')
        .map(|part| {
            let mut tokens = tokenize(part);
            while tokens
                .last()
                .is_some_and(|t| PROVINCES.contains(&t.as_str()))
                && tokens.len() > 1
            {
                tokens.pop();
            }
            tokens.join(" ")
        })
        .filter(|part| !part.is_empty() && !PROVINCES.contains(&part.as_str()))
        .collect();

    let street = parts
        .first()
        .map(|s| normalize_street(s))
        .filter(|s| !s.is_empty());
    let city = parts
        .get(1)
        .map(|c| normalize_city(c))
        .filter(|c| !c.is_empty());

    NormalizedAddress {
        street,
        city,
        postal_code,
    }
}

/// Ten-digit North American phone number.
///
/// After dropping any extension, the number must have exactly ten digits,
/// or eleven with a leading country code 1; anything else is `None`.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let without_ext = PHONE_EXTENSION.replace(raw.trim(), "");
    let digits: String = without_ext.chars().filter(|c| c.is_ascii_digit()).collect();

    let digits = match digits.len() {
        10 => digits.as_str(),
        11 if digits.starts_with('1') => &digits[1..],
        _ => return None,
    };
    Some(digits.to_string())
}

/// Canadian postal code as `A1A1A1`, or `None` if the pattern does not match.
pub fn normalize_postal_code(raw: &str) -> Option<String> {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect::<String>()
        .to_uppercase();
    POSTAL_CODE.is_match(&compact).then_some(compact)
}

/// Bare lower-case host of a website URL, without `www.`.
pub fn normalize_website(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };

    let host = url::Url::parse(&with_scheme)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))?;
    let host = host.trim_end_matches('.');
    let host = host.strip_prefix("www.").unwrap_or(host);

    if host.contains('.') {
        Some(host.to_string())
    } else {
        None
    }
}

/// Jaccard similarity of the token sets of two addresses, in `[0, 1]`.
///
/// A tie-break signal only; identity is decided by fingerprints.
pub fn compare_addresses(a: &str, b: &str) -> f64 {
    compare_normalized_addresses(&normalize_address(a), &normalize_address(b))
}

/// [`compare_addresses`] over already-normalized components.
pub fn compare_normalized_addresses(a: &NormalizedAddress, b: &NormalizedAddress) -> f64 {
    let left = a.tokens();
    let right = b.tokens();
    let union = left.union(&right).count();
    if union == 0 {
        return 0.0;
    }
    left.intersection(&right).count() as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_strips_suffixes_and_case() {
        assert_eq!(normalize_name("ABC Inc."), "abc");
        assert_eq!(normalize_name("  Acme   Widgets, LTD "), "acme widgets");
        assert_eq!(normalize_name("Boulangerie Fortin Ltée"), "boulangerie fortin");
        assert_eq!(normalize_name("Smith Holdings Corp Inc"), "smith holdings");
        assert_eq!(normalize_name("Widget Co. L.L.C."), "widget");
    }

    #[test]
    fn name_keeps_single_suffix_token() {
        assert_eq!(normalize_name("Inc."), "inc");
    }

    #[test]
    fn name_is_idempotent() {
        let samples = [
            "ABC Inc.",
            "Hamilton Convenience Manufacturing Ltd.",
            "Joe's Bar & Grill",
            "L'Atelier du Bois Inc. Ltée",
            "Co Co",
            "  ",
            "St. Catharines Tool & Die, LLC",
        ];
        for raw in samples {
            let once = normalize_name(raw);
            assert_eq!(normalize_name(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn street_expands_abbreviations() {
        assert_eq!(normalize_street("123 Main St"), "123 main street");
        assert_eq!(normalize_street("123 Main Street"), "123 main street");
        assert_eq!(normalize_street("45 Barton St. E."), "45 barton street east");
        assert_eq!(normalize_street("9 Upper James Rd"), "9 upper james road");
    }

    #[test]
    fn address_splits_components() {
        let addr = normalize_address("123 Main St, Hamilton, ON L8H 3R2");
        assert_eq!(addr.street.as_deref(), Some("123 main street"));
        assert_eq!(addr.city.as_deref(), Some("hamilton"));
        assert_eq!(addr.postal_code.as_deref(), Some("L8H3R2"));
    }

    #[test]
    fn address_partial_on_garbage() {
        let addr = normalize_address(",,,");
        assert_eq!(addr, NormalizedAddress::default());

        let addr = normalize_address("Unit 4");
        assert_eq!(addr.street.as_deref(), Some("unit 4"));
        assert!(addr.city.is_none());
        assert!(addr.postal_code.is_none());
    }

    #[test]
    fn phone_extracts_ten_digits() {
        assert_eq!(normalize_phone("(905) 555-1234").as_deref(), Some("9055551234"));
        assert_eq!(normalize_phone("+1 905.555.1234").as_deref(), Some("9055551234"));
        assert_eq!(
            normalize_phone("905-555-1234 ext. 22").as_deref(),
            Some("9055551234")
        );
        assert_eq!(normalize_phone("555-1234"), None);
        assert_eq!(normalize_phone(""), None);
    }

    #[test]
    fn phone_with_extra_digits_is_rejected() {
        assert_eq!(normalize_phone("1 905 555 1234 5"), None);
        assert_eq!(normalize_phone("44 20 7946 0958"), None);
        assert_eq!(normalize_phone("2 905 555 1234"), None);
        assert_eq!(
            normalize_phone("1-905-555-1234 x5").as_deref(),
            Some("9055551234")
        );
    }

    #[test]
    fn postal_code_format() {
        assert_eq!(normalize_postal_code("l8h 3r2").as_deref(), Some("L8H3R2"));
        assert_eq!(normalize_postal_code("L8H-3R2").as_deref(), Some("L8H3R2"));
        assert_eq!(normalize_postal_code("90210"), None);
        // D, F, I, O, Q, U never appear; W and Z never lead.
        assert_eq!(normalize_postal_code("D8H3R2"), None);
        assert_eq!(normalize_postal_code("W8H3R2"), None);
    }

    #[test]
    fn website_reduces_to_domain() {
        assert_eq!(
            normalize_website("https://www.Example.com/about?x=1#top").as_deref(),
            Some("example.com")
        );
        assert_eq!(
            normalize_website("shop.example.ca:8080/path").as_deref(),
            Some("shop.example.ca")
        );
        assert_eq!(normalize_website(""), None);
        assert_eq!(normalize_website("not a url"), None);
    }

    #[test]
    fn address_similarity() {
        let same = compare_addresses("123 Main St, Hamilton", "123 Main Street, Hamilton");
        assert!((same - 1.0).abs() < f64::EPSILON);

        let partial = compare_addresses("123 Main St, Hamilton", "125 Main St, Hamilton");
        assert!(partial > 0.5 && partial < 1.0);

        assert_eq!(compare_addresses("", ""), 0.0);
    }
}
