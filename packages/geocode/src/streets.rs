//! Street-name canonicalization, dedup, and the known-street regexes.
//!
//! Titles spell the same street many ways ("King St. E.", "King Street
//! East"). [`normalize_street`] folds those variants together so that a
//! title mentioning one street twice is not mistaken for an intersection.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

/// Above this many mentions, [`unique_streets`] gives up and returns nothing.
pub const MAX_STREET_MENTIONS: usize = 10;

/// Compiled-size ceiling for the street alternations. A full city street
/// list is several thousand names, well past the `regex` default.
const STREET_REGEX_SIZE_LIMIT: usize = 256 * (1 << 20);

/// Ordered, case-insensitive rewrites applied by [`normalize_street`].
/// The last rule keeps only letters and spaces.
static NORMALIZATIONS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?i)Ave(nue)?", "Av"),
        (r"(?i)Street", "St"),
        (r"(?i)East", "E"),
        (r"(?i)North", "N"),
        (r"(?i)South", "S"),
        (r"(?i)West", "W"),
        (r"(?i)[^a-z ]", ""),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).expect("valid regex"), replacement))
    .collect()
});

/// Canonical spelling of a street name, e.g. `"King St. E."` and
/// `"King Street East"` both become `"King St E"`.
#[must_use]
pub fn normalize_street(street: &str) -> String {
    NORMALIZATIONS
        .iter()
        .fold(street.to_string(), |acc, (pattern, replacement)| {
            pattern.replace_all(&acc, *replacement).into_owned()
        })
}

/// Whether two spellings refer to the same street.
#[must_use]
pub fn are_streets_same(a: &str, b: &str) -> bool {
    normalize_street(a) == normalize_street(b)
}

/// Drops later mentions of a street already seen, keeping title order.
///
/// More than [`MAX_STREET_MENTIONS`] inputs yields an empty list: that many
/// street names in one caption means none of them is a reliable pick.
#[must_use]
pub fn unique_streets<'a>(streets: &[&'a str]) -> Vec<&'a str> {
    if streets.len() > MAX_STREET_MENTIONS {
        return Vec::new();
    }

    let mut unique: Vec<&'a str> = Vec::with_capacity(streets.len());
    for &street in streets {
        if !unique.iter().any(|seen| are_streets_same(street, seen)) {
            unique.push(street);
        }
    }
    unique
}

/// Builds a lowercase regex alternation of known street names.
///
/// Longer names come first so that "King Street West" wins over "King
/// Street" at the same position. Names of equal length keep file order.
#[must_use]
pub fn street_alternation<S: AsRef<str>>(names: &[S]) -> String {
    let mut names: Vec<&str> = names
        .iter()
        .map(|name| name.as_ref().trim())
        .filter(|name| !name.is_empty())
        .collect();
    names.sort_by_key(|name| std::cmp::Reverse(name.chars().count()));

    names
        .into_iter()
        .map(|name| regex::escape(&name.to_lowercase()))
        .collect::<Vec<_>>()
        .join("|")
}

/// `<number>[.5] [1/2] <street>`, matched against the lowercased title.
///
/// The lazy prefix makes the *first* house number followed by a known
/// street win, so ranges like "470-472 Spadina" yield the last number.
///
/// # Errors
///
/// Returns [`regex::Error`] if the alternation is too large to compile.
pub fn exact_address_regex(alternation: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(&format!(
        r"^.*?(\d+(?:\.5)?)\s+(?:1/2\s)?({alternation})"
    ))
    .size_limit(STREET_REGEX_SIZE_LIMIT)
    .build()
}

/// A known street bounded by non-letters (or the ends of the title).
///
/// # Errors
///
/// Returns [`regex::Error`] if the alternation is too large to compile.
pub fn standalone_street_regex(alternation: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(&format!(r"(?:^|[^a-z])({alternation})(?:[^a-z]|$)"))
        .case_insensitive(true)
        .size_limit(STREET_REGEX_SIZE_LIMIT)
        .build()
}
