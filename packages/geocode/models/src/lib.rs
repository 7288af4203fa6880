#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared types for the Old Toronto title geocoder.
//!
//! This crate contains only data types and simple conversions. It has no
//! heavyweight dependencies (no regex, no HTTP, no I/O).

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single archive record as it appears in `images.ndjson`.
///
/// Only the fields the geocoder cares about are modelled; everything else
/// in the source line is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRecord {
    /// Archive-wide unique identifier. Output mappings are keyed by it.
    #[serde(rename = "uniqueID")]
    pub unique_id: String,
    /// Free-text caption; the only positional signal we have.
    #[serde(default)]
    pub title: Option<String>,
    /// Free-text date, carried through untouched.
    #[serde(default)]
    pub date: Option<String>,
}

impl PhotoRecord {
    /// Returns the trimmed title, or `None` when it is missing or blank.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|title| !title.is_empty())
    }
}

/// The category of geocoder result a query is expected to produce.
///
/// A two-street query that comes back as a street address almost always
/// means the streets do not cross, so mismatches are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpectedType {
    /// Cross streets.
    Intersection,
    /// A house number on a street.
    Address,
}

impl ExpectedType {
    /// Geocoder `types` values that satisfy this expectation.
    #[must_use]
    pub const fn result_types(self) -> &'static [&'static str] {
        match self {
            Self::Intersection => &["intersection"],
            Self::Address => &["street_address", "premise"],
        }
    }

    /// Whether any of the returned `types` satisfies this expectation.
    #[must_use]
    pub fn accepts<S: AsRef<str>>(self, types: &[S]) -> bool {
        let wanted = self.result_types();
        types.iter().any(|t| wanted.contains(&t.as_ref()))
    }
}

/// Location accuracy reported by the geocoding provider.
///
/// Ordered from most to least precise: `ROOFTOP` beats
/// `RANGE_INTERPOLATED`/`GEOMETRIC_CENTER`, which beat `APPROXIMATE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Accuracy {
    /// Precise to the building.
    Rooftop,
    /// Interpolated between two precise points.
    RangeInterpolated,
    /// Centre of a line or polygon (typical for intersections).
    GeometricCenter,
    /// Anything coarser.
    Approximate,
}

impl Accuracy {
    /// The provider's string form of this accuracy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rooftop => "ROOFTOP",
            Self::RangeInterpolated => "RANGE_INTERPOLATED",
            Self::GeometricCenter => "GEOMETRIC_CENTER",
            Self::Approximate => "APPROXIMATE",
        }
    }
}

impl fmt::Display for Accuracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which heuristic produced a candidate, together with what it captured.
///
/// Serialized as the provenance tuple written to `geocode_results.json`,
/// e.g. `["exact_address", "203", "church street"]` or `["POI", "high park"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub enum Technique {
    /// `<number> <known street>`.
    ExactAddress {
        /// House number, possibly with a `.5` suffix.
        number: String,
        /// Known street name, lowercased.
        street: String,
    },
    /// One of the "corner of X and Y" patterns.
    Corner {
        /// First street.
        first: String,
        /// Second street.
        second: String,
    },
    /// "X looking north from Y".
    Looking {
        /// Street the photographer stands on.
        first: String,
        /// Reference street.
        second: String,
    },
    /// Two known streets mentioned anywhere in the title.
    TwoStreets {
        /// First street in title order.
        first: String,
        /// Second street in title order.
        second: String,
    },
    /// "X and Y" / "X & Y".
    JoinedByAnd {
        /// Left of the conjunction.
        first: String,
        /// Right of the conjunction.
        second: String,
    },
    /// Curated point-of-interest lookup; no network call involved.
    Poi {
        /// Matched POI name, lowercased.
        name: String,
    },
}

impl Technique {
    /// Short label used as the first element of the provenance tuple.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::ExactAddress { .. } => "exact_address",
            Self::Corner { .. } => "parse_corner",
            Self::Looking { .. } => "looking",
            Self::TwoStreets { .. } => "two streets",
            Self::JoinedByAnd { .. } => "streets_joined_by_and",
            Self::Poi { .. } => "POI",
        }
    }

    /// The raw captures, without the label.
    #[must_use]
    pub fn captures(&self) -> Vec<&str> {
        match self {
            Self::ExactAddress { number, street } => vec![number.as_str(), street.as_str()],
            Self::Corner { first, second }
            | Self::Looking { first, second }
            | Self::TwoStreets { first, second }
            | Self::JoinedByAnd { first, second } => vec![first.as_str(), second.as_str()],
            Self::Poi { name } => vec![name.as_str()],
        }
    }
}

impl From<Technique> for Vec<String> {
    fn from(technique: Technique) -> Self {
        std::iter::once(technique.label())
            .chain(technique.captures())
            .map(str::to_string)
            .collect()
    }
}

impl TryFrom<Vec<String>> for Technique {
    type Error = String;

    fn try_from(parts: Vec<String>) -> Result<Self, Self::Error> {
        let mut iter = parts.into_iter();
        let label = iter.next().ok_or("empty technique tuple")?;
        let rest: Vec<String> = iter.collect();

        let pair = |rest: Vec<String>| -> Result<[String; 2], String> {
            rest.try_into()
                .map_err(|_| format!("technique '{label}' needs two captures"))
        };

        Ok(match label.as_str() {
            "exact_address" => {
                let [number, street] = pair(rest)?;
                Self::ExactAddress { number, street }
            }
            "parse_corner" => {
                let [first, second] = pair(rest)?;
                Self::Corner { first, second }
            }
            "looking" => {
                let [first, second] = pair(rest)?;
                Self::Looking { first, second }
            }
            "two streets" => {
                let [first, second] = pair(rest)?;
                Self::TwoStreets { first, second }
            }
            "streets_joined_by_and" => {
                let [first, second] = pair(rest)?;
                Self::JoinedByAnd { first, second }
            }
            "POI" => {
                let name = rest
                    .into_iter()
                    .next()
                    .ok_or("technique 'POI' needs a name")?;
                Self::Poi { name }
            }
            other => return Err(format!("unknown technique '{other}'")),
        })
    }
}

/// A query that must be resolved by the external geocoding service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeocodeQuery {
    /// Heuristic and captures that built this query.
    pub technique: Technique,
    /// Full search string, locale suffix included.
    pub search_term: String,
    /// Result category the response must belong to.
    pub expected_type: ExpectedType,
}

/// A curated POI hit; already carries its coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct PoiMatch {
    /// Matched name, lowercased.
    pub name: String,
    /// OpenStreetMap identifier of the feature.
    pub osmid: String,
    /// Latitude (WGS84).
    pub lat: f64,
    /// Longitude (WGS84).
    pub lng: f64,
    /// Specificity score of the matched record.
    pub score: f64,
}

/// The output of the heuristic parser chain for one title.
#[derive(Debug, Clone, PartialEq)]
pub enum Candidate {
    /// Needs a network geocoding call.
    Geocode(GeocodeQuery),
    /// Resolved immediately from the POI table.
    Poi(PoiMatch),
}

impl Candidate {
    /// Provenance of this candidate.
    #[must_use]
    pub fn technique(&self) -> Technique {
        match self {
            Self::Geocode(query) => query.technique.clone(),
            Self::Poi(poi) => Technique::Poi {
                name: poi.name.clone(),
            },
        }
    }

    /// The search string (for POI matches, the matched name).
    #[must_use]
    pub fn search_term(&self) -> &str {
        match self {
            Self::Geocode(query) => &query.search_term,
            Self::Poi(poi) => &poi.name,
        }
    }

    /// Expected geocoder result type; `None` for POI matches.
    #[must_use]
    pub const fn expected_type(&self) -> Option<ExpectedType> {
        match self {
            Self::Geocode(query) => Some(query.expected_type),
            Self::Poi(_) => None,
        }
    }
}

/// One row of the curated POI table.
///
/// Scores are non-negative; higher means more specific or more reliable.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PoiRecord {
    /// Display name as it appears in the table.
    pub name: String,
    /// OpenStreetMap identifier.
    pub osmid: String,
    /// Latitude (WGS84).
    pub lat: f64,
    /// Longitude (WGS84).
    pub lng: f64,
    /// Tag-derived specificity score.
    pub score: f64,
    /// OSM tag the score was derived from, e.g. `leisure:park`.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// A resolved location for one photo title.
///
/// Never mutated after creation; overrides build a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    /// Latitude (WGS84).
    pub lat: f64,
    /// Longitude (WGS84).
    pub lng: f64,
    /// Formatted address returned by the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Provider place identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_id: Option<String>,
    /// Provider accuracy classification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<Accuracy>,
    /// Provider result types, e.g. `["intersection"]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<String>>,
    /// The query that produced this result.
    pub search_term: String,
    /// The untouched source title.
    pub original_title: String,
    /// Provenance tuple.
    pub technique: Technique,
}

/// Tallies for one geocoding batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeocodeSummary {
    /// Records seen.
    pub total: u64,
    /// Records filtered out by the id allow-list or sampling, or untitled.
    pub skipped: u64,
    /// Records that went through the parser chain.
    pub processed: u64,
    /// Titles no heuristic matched.
    pub unparsed: u64,
    /// Queries the provider returned nothing for.
    pub no_results: u64,
    /// Queries that failed at the transport/API level.
    pub transport_failures: u64,
    /// Results discarded by the acceptance policy.
    pub rejected: u64,
    /// Results written to the output mapping.
    pub resolved: u64,
}

impl fmt::Display for GeocodeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "       Total records: {}", self.total)?;
        writeln!(f, "             skipped: {}", self.skipped)?;
        writeln!(f, "           processed: {}", self.processed)?;
        writeln!(f, "  ...with no parse: {}", self.unparsed)?;
        writeln!(f, "  ...with no results: {}", self.no_results)?;
        writeln!(f, "  ...transport failures: {}", self.transport_failures)?;
        writeln!(f, "  ...rejected: {}", self.rejected)?;
        write!(f, "            resolved: {}", self.resolved)
    }
}
