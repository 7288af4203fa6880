//! Capitalized noun-phrase extraction.
//!
//! A noun phrase is a run of capitalized words, e.g. "Yonge Street" in
//! "Photo at Yonge Street". The corner heuristics use these to pick the
//! streets nearest the word "corner"; the `nouns` CLI command uses them to
//! build candidate street and POI lists from the whole archive.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

static NOUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:[A-Z][A-Za-z.']* ?)+").expect("valid regex"));

static MULTIPLE_CAPS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z].*[A-Z]").expect("valid regex"));

/// A phrase ending in a street type, optionally followed by a direction.
static STREET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\b(?:Street|St\.?|Avenue|Ave\.?|Road|Rd\.?|Drive|Dr\.?|Boulevard|Blvd\.?",
        r"|Parkway|Pkwy\.?|Highway|Hwy\.?|Court|Crescent|Ct\.?|Lane|Place|Terrace",
        r"|Esplanade|Expressway)",
        r"(?: (?:East|West|North|South|[EWNS]\.?|Extension))?$",
    ))
    .expect("valid regex")
});

/// Phrases that look like streets but are not.
const STREET_BLACKLIST: &[&str] = &[
    "Street North",
    "Street West",
    "Avenue West",
    "Eaton's College Street",
    "Eaton's Queen Street",
];

/// Streets whose names do not end in a street type.
const STREET_WHITELIST: &[&str] = &[
    "Ridge Drive Park",
    "Indian Grove",
    "Lake Front",
    "Lake Promenade",
    "Yarmouth Gardens",
];

/// Every capitalized run in `text`, trimmed, in order.
#[must_use]
pub fn noun_phrases(text: &str) -> Vec<&str> {
    NOUN_RE.find_iter(text).map(|m| m.as_str().trim()).collect()
}

/// Like [`noun_phrases`], but drops a leading single capitalized word.
///
/// Every title starts with a capital, so "Carol" in "Carol Turofsky" is
/// kept (two capitals) while "Waterfront" in "Waterfront landfill" is not.
#[must_use]
pub fn extract_nouns(text: &str) -> Vec<&str> {
    NOUN_RE
        .find_iter(text)
        .filter(|m| m.start() != 0 || has_multiple_caps(m.as_str()))
        .map(|m| m.as_str().trim())
        .collect()
}

/// Whether a phrase has at least two capital letters, starting with one.
#[must_use]
pub fn has_multiple_caps(noun: &str) -> bool {
    MULTIPLE_CAPS_RE.is_match(noun)
}

/// Whether a noun phrase names a street, e.g. "Yonge Street".
#[must_use]
pub fn is_street(noun: &str) -> bool {
    if STREET_WHITELIST.contains(&noun) {
        return true;
    }
    if STREET_BLACKLIST.contains(&noun) {
        return false;
    }
    STREET_RE.is_match(noun)
}

/// Which phrases [`noun_histogram`] counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NounKind {
    /// Phrases [`is_street`] accepts.
    Streets,
    /// Everything else.
    Pois,
}

/// How often one phrase occurs, with a few titles it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NounCount {
    /// The phrase.
    pub phrase: String,
    /// Number of occurrences across all titles.
    pub count: usize,
    /// Up to [`MAX_EXAMPLES`] titles, in input order.
    pub examples: Vec<String>,
}

/// Titles kept per phrase in a [`NounCount`].
pub const MAX_EXAMPLES: usize = 5;

/// Counts multi-word noun phrases of one kind across `titles`.
///
/// Phrases seen fewer than `cutoff` times are dropped. The result is
/// sorted by count (descending), then phrase.
#[must_use]
pub fn noun_histogram<S: AsRef<str>>(
    titles: &[S],
    kind: NounKind,
    cutoff: usize,
) -> Vec<NounCount> {
    let want_streets = kind == NounKind::Streets;
    let mut counts: BTreeMap<&str, NounCount> = BTreeMap::new();

    for title in titles {
        let title = title.as_ref();
        for noun in extract_nouns(title) {
            // Single words are mostly noise.
            if !has_multiple_caps(noun) || is_street(noun) != want_streets {
                continue;
            }
            let entry = counts.entry(noun).or_insert_with(|| NounCount {
                phrase: noun.to_string(),
                count: 0,
                examples: Vec::new(),
            });
            entry.count += 1;
            if entry.examples.len() < MAX_EXAMPLES {
                entry.examples.push(title.to_string());
            }
        }
    }

    let mut histogram: Vec<NounCount> = counts
        .into_values()
        .filter(|noun| noun.count >= cutoff)
        .collect();
    histogram.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.phrase.cmp(&b.phrase)));
    histogram
}
