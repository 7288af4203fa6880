//! The heuristic parser chain: title in, [`Candidate`] out.
//!
//! Each heuristic is a pure function from a title to an optional
//! [`Technique`]. They run in a fixed priority order and the first hit
//! wins; nothing is merged. If every street heuristic misses, the POI
//! table gets the last word.
//!
//! Captures are trimmed. A heuristic whose regex matched but captured an
//! empty string counts as a miss.

use std::sync::LazyLock;

use oldto_geocode_models::{Candidate, ExpectedType, GeocodeQuery, Technique};
use regex::Regex;

use crate::nouns::noun_phrases;
use crate::poi::PoiTable;
use crate::streets::{
    exact_address_regex, standalone_street_regex, street_alternation, unique_streets,
};

/// One or more capitalized words, e.g. "St. Clair Avenue".
const CAPITALIZED_TOKENS: &str = r"(?:[A-Z][A-Za-z.']*\s?)+";

/// NE/NW/SW/SE in its many spellings: "north-east", "n.e.", "NE", ...
static INTERCARDINAL: LazyLock<String> = LazyLock::new(|| {
    let n = r"(?:(?:^N)|\sn)";
    let s = r"(?:(?:^S)|\ss)";
    [
        format!(r"{n}orth-?east"),
        format!(r"{n}\.\s?e\."),
        "NE".to_string(),
        format!(r"{n}orth-?west"),
        format!(r"{n}\.\s?w\."),
        "NW".to_string(),
        format!(r"{s}outh-?west"),
        format!(r"{s}\.\s?w\."),
        "SW".to_string(),
        format!(r"{s}outh-?east"),
        format!(r"{s}\.\s?e\."),
        "SE".to_string(),
    ]
    .join("|")
});

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex")
}

/// "Spadina Avenue looking north from Wellington Street".
static DIRECTION_FROM_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(
        r"^.*?({CAPITALIZED_TOKENS}),?(?:\s\[\?\])?(?:\s:)?\s(?:looking\s)?(?:east|west|north|south)\s(?:from|of|across|to)\s.*?({CAPITALIZED_TOKENS})"
    ))
});

/// "Queen & Parliament", "Roselawn Avenue and Chaplin Crescent".
static JOINED_BY_AND_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(
        r"^.*?({CAPITALIZED_TOKENS}),?\s(?:and|&)\s({CAPITALIZED_TOKENS})"
    ))
});

/// "n.w. corner of Bay Street and Wellington Street West".
static PARSE_CORNER_OF_X_AND_Y_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(
        r"^.*?(?:{inter})\scorner(?:\sof)?\s.*?({CAPITALIZED_TOKENS})\sand\s({CAPITALIZED_TOKENS})",
        inter = *INTERCARDINAL
    ))
});

/// "Dundas Street West, north-east corner of Ossington Avenue".
static SPLIT_ON_CORNER_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(
        r"^(.*?)(?:{inter})\scorner(.*)",
        inter = *INTERCARDINAL
    ))
});

/// "Queen St E at Sumach, southeast corner".
static X_AT_Y_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(
        r"^.*?({CAPITALIZED_TOKENS}),?\sat\s({CAPITALIZED_TOKENS}).*?(?:{inter})\scorner",
        inter = *INTERCARDINAL
    ))
});

/// "Corner of Sherbourne St. and the Gardiner Expressway".
static CORNER_OF_X_AND_Y_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(
        r"^.*?(?:c|^C)orner\sof\s({CAPITALIZED_TOKENS}),?\sand\s(?:the\s)?({CAPITALIZED_TOKENS}),?"
    ))
});

/// Trims both captures; `None` if either ends up empty.
fn pair(first: &str, second: &str) -> Option<(String, String)> {
    let (first, second) = (first.trim(), second.trim());
    (!first.is_empty() && !second.is_empty()).then(|| (first.to_string(), second.to_string()))
}

fn captured_pair(re: &Regex, title: &str) -> Option<(String, String)> {
    let caps = re.captures(title)?;
    pair(caps.get(1)?.as_str(), caps.get(2)?.as_str())
}

/// The four "corner" patterns, tried in order.
#[must_use]
pub fn parse_corner(title: &str) -> Option<Technique> {
    let corner = |(first, second): (String, String)| Technique::Corner { first, second };

    if let Some(streets) = captured_pair(&PARSE_CORNER_OF_X_AND_Y_RE, title) {
        return Some(corner(streets));
    }

    if let Some(caps) = SPLIT_ON_CORNER_RE.captures(title) {
        // The streets closest to the word "corner" on either side.
        let before = noun_phrases(caps.get(1).map_or("", |m| m.as_str().trim()));
        let after = noun_phrases(caps.get(2).map_or("", |m| m.as_str().trim()));
        if let (Some(first), Some(second)) = (before.last(), after.first())
            && let Some(streets) = pair(first, second)
        {
            return Some(corner(streets));
        }
    }

    captured_pair(&X_AT_Y_RE, title)
        .or_else(|| captured_pair(&CORNER_OF_X_AND_Y_RE, title))
        .map(corner)
}

/// "<street> looking <direction> from <street>".
///
/// A literal leading "Looking" is removed first; otherwise "Looking at
/// Spadina east over Bay" would capture "Looking" as a street.
#[must_use]
pub fn parse_direction_from(title: &str) -> Option<Technique> {
    let stripped = title.strip_prefix("Looking").unwrap_or(title);
    let (first, second) = captured_pair(&DIRECTION_FROM_RE, stripped)?;
    log::debug!("parse_direction_from|streets:{first} and {second}|title:{title}");
    Some(Technique::Looking { first, second })
}

/// "<phrase> and <phrase>" or "<phrase> & <phrase>".
#[must_use]
pub fn parse_streets_joined_by_and(title: &str) -> Option<Technique> {
    let (first, second) = captured_pair(&JOINED_BY_AND_RE, title)?;
    log::debug!("parse_streets_joined_by_and|streets:{first} and {second}|title:{title}");
    Some(Technique::JoinedByAnd { first, second })
}

type StreetParser = fn(&ParserChain, &str) -> Option<Technique>;

/// Street heuristics in priority order. The POI lookup runs after these.
const STREET_PARSERS: [(&str, StreetParser); 5] = [
    ("exact_address", ParserChain::parse_exact_address),
    ("corner", |_, title| parse_corner(title)),
    ("direction_from", |_, title| parse_direction_from(title)),
    ("two_streets", ParserChain::parse_two_streets),
    ("joined_by_and", |_, title| parse_streets_joined_by_and(title)),
];

/// The compiled heuristics plus the data they match against.
#[derive(Debug, Clone)]
pub struct ParserChain {
    exact_address_re: Regex,
    standalone_street_re: Regex,
    poi: PoiTable,
    locale_suffix: String,
}

impl ParserChain {
    /// Compiles the street regexes from `street_names`.
    ///
    /// # Errors
    ///
    /// Returns [`regex::Error`] if the street alternation cannot be
    /// compiled.
    pub fn new<S: AsRef<str>>(
        street_names: &[S],
        poi: PoiTable,
        locale_suffix: impl Into<String>,
    ) -> Result<Self, regex::Error> {
        let alternation = street_alternation(street_names);
        log::debug!("Street alternation has {} bytes", alternation.len());

        Ok(Self {
            exact_address_re: exact_address_regex(&alternation)?,
            standalone_street_re: standalone_street_regex(&alternation)?,
            poi,
            locale_suffix: locale_suffix.into(),
        })
    }

    /// The POI table consulted last.
    #[must_use]
    pub const fn poi_table(&self) -> &PoiTable {
        &self.poi
    }

    /// Runs the heuristics in priority order; the first hit wins.
    #[must_use]
    pub fn resolve(&self, title: &str) -> Option<Candidate> {
        for (name, parser) in STREET_PARSERS {
            if let Some(query) = parser(self, title).and_then(|t| self.query_for(t)) {
                log::trace!("{name} matched: {title}");
                return Some(Candidate::Geocode(query));
            }
        }
        self.poi.find(title).map(Candidate::Poi)
    }

    /// Builds the network query for a street technique.
    ///
    /// POI hits carry their own coordinates and are never sent to the
    /// transport, so [`Technique::Poi`] yields `None`.
    #[must_use]
    pub fn query_for(&self, technique: Technique) -> Option<GeocodeQuery> {
        let suffix = &self.locale_suffix;
        let (search_term, expected_type) = match &technique {
            Technique::ExactAddress { number, street } => {
                (format!("{number} {street} {suffix}"), ExpectedType::Address)
            }
            Technique::Corner { first, second }
            | Technique::Looking { first, second }
            | Technique::TwoStreets { first, second }
            | Technique::JoinedByAnd { first, second } => {
                (format!("{first} and {second} {suffix}"), ExpectedType::Intersection)
            }
            Technique::Poi { .. } => return None,
        };
        Some(GeocodeQuery {
            technique,
            search_term,
            expected_type,
        })
    }

    /// `<number> <known street>`, matched case-insensitively.
    #[must_use]
    pub fn parse_exact_address(&self, title: &str) -> Option<Technique> {
        let lowered = title.to_lowercase();
        let (number, street) = captured_pair(&self.exact_address_re, &lowered)?;
        log::debug!("parse_exact_address|address:{number} {street}|title:{title}");
        Some(Technique::ExactAddress { number, street })
    }

    /// Two distinct known streets anywhere in the title.
    #[must_use]
    pub fn parse_two_streets(&self, title: &str) -> Option<Technique> {
        let all: Vec<&str> = self
            .standalone_street_re
            .captures_iter(title)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str())
            .collect();
        let streets = unique_streets(&all);
        if streets.len() < all.len() {
            log::debug!("Removed duplicate streets: {all:?} --> {streets:?}");
        }
        if streets.len() < 2 {
            return None;
        }
        if streets.len() > 2 {
            log::warn!("matched 3+ streets: {streets:?}; using first two");
        }

        let (first, second) = pair(streets[0], streets[1])?;
        log::debug!("parse_two_streets|streets:{first} and {second}|title:{title}");
        Some(Technique::TwoStreets { first, second })
    }
}
