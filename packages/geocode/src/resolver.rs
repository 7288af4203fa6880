//! Title → [`GeocodeResult`], with the acceptance policy applied.
//!
//! POI candidates resolve without a network call. Everything else goes to
//! the transport, and only the provider's first result is considered: it
//! must have the type the heuristic expected and, in strict mode, rooftop
//! accuracy. Per-title failures are reported as a [`GeocodeOutcome`], never
//! as an error.

use oldto_geocode_models::{
    Accuracy, Candidate, ExpectedType, GeocodeQuery, GeocodeResult, PoiMatch, Technique,
};

use crate::parsers::ParserChain;
use crate::transport::GeocodeTransport;

/// Why an otherwise successful lookup was discarded.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    /// The first result's types did not include the expected one, e.g. two
    /// streets that came back as a street address because they never cross.
    TypeMismatch {
        /// What the heuristic asked for.
        expected: ExpectedType,
        /// What the provider returned.
        got: Vec<String>,
    },
    /// Strict mode requires rooftop accuracy.
    NotRooftop(Accuracy),
    /// Strict mode: the POI name covers too little of the title.
    PoiCoverage {
        /// `name chars / title chars`.
        ratio: f64,
    },
}

/// What happened to one title.
#[derive(Debug, Clone, PartialEq)]
pub enum GeocodeOutcome {
    /// No heuristic matched.
    Unparsed,
    /// The provider returned no results.
    NoResults,
    /// The provider could not be reached or returned an error.
    TransportFailed,
    /// A result came back but the acceptance policy discarded it.
    Rejected(Rejection),
    /// Accepted.
    Resolved(Box<GeocodeResult>),
}

impl GeocodeOutcome {
    /// The accepted result, if any.
    #[must_use]
    pub fn into_result(self) -> Option<GeocodeResult> {
        match self {
            Self::Resolved(result) => Some(*result),
            _ => None,
        }
    }
}

/// Parser chain, transport and acceptance policy bundled together.
#[derive(Debug)]
pub struct Geocoder<T> {
    chain: ParserChain,
    transport: T,
    strict: bool,
    strict_poi_coverage: f64,
}

impl<T: GeocodeTransport> Geocoder<T> {
    /// Creates a geocoder. `strict_poi_coverage` only matters when
    /// `strict` is set.
    #[must_use]
    pub const fn new(
        chain: ParserChain,
        transport: T,
        strict: bool,
        strict_poi_coverage: f64,
    ) -> Self {
        Self {
            chain,
            transport,
            strict,
            strict_poi_coverage,
        }
    }

    /// The heuristics in use.
    #[must_use]
    pub const fn chain(&self) -> &ParserChain {
        &self.chain
    }

    /// Whether the strict acceptance policy is on.
    #[must_use]
    pub const fn is_strict(&self) -> bool {
        self.strict
    }

    /// Geocodes one title, reporting what happened.
    pub async fn resolve_title(&self, title: &str) -> GeocodeOutcome {
        match self.chain.resolve(title) {
            None => GeocodeOutcome::Unparsed,
            Some(Candidate::Poi(poi)) => self.accept_poi(title, poi),
            Some(Candidate::Geocode(query)) => self.lookup(title, query).await,
        }
    }

    /// Geocodes one title, keeping only an accepted result.
    pub async fn geocode(&self, title: &str) -> Option<GeocodeResult> {
        self.resolve_title(title).await.into_result()
    }

    fn accept_poi(&self, title: &str, poi: PoiMatch) -> GeocodeOutcome {
        if self.strict {
            #[allow(clippy::cast_precision_loss)]
            let ratio = poi.name.chars().count() as f64 / title.chars().count() as f64;
            if ratio <= self.strict_poi_coverage {
                log::debug!(
                    "Rejecting POI '{}' covering {:.0}% of title: {title}",
                    poi.name,
                    ratio * 100.0
                );
                return GeocodeOutcome::Rejected(Rejection::PoiCoverage { ratio });
            }
        }

        GeocodeOutcome::Resolved(Box::new(GeocodeResult {
            lat: poi.lat,
            lng: poi.lng,
            address: None,
            place_id: None,
            accuracy: None,
            types: None,
            search_term: poi.name.clone(),
            original_title: title.to_string(),
            technique: Technique::Poi { name: poi.name },
        }))
    }

    async fn lookup(&self, title: &str, query: GeocodeQuery) -> GeocodeOutcome {
        let results = match self.transport.geocode(&query.search_term).await {
            Ok(results) => results,
            Err(e) => {
                log::error!("Error geocoding '{}': {e}", query.search_term);
                return GeocodeOutcome::TransportFailed;
            }
        };

        let Some(first) = results.into_iter().next() else {
            log::debug!("No results for '{}'", query.search_term);
            return GeocodeOutcome::NoResults;
        };

        if !query.expected_type.accepts(&first.types) {
            log::debug!(
                "Wrong type for '{}': wanted {:?}, got {:?}",
                query.search_term,
                query.expected_type,
                first.types
            );
            return GeocodeOutcome::Rejected(Rejection::TypeMismatch {
                expected: query.expected_type,
                got: first.types,
            });
        }

        if self.strict && first.accuracy != Accuracy::Rooftop {
            log::debug!(
                "Strict mode: '{}' is only {}",
                query.search_term,
                first.accuracy
            );
            return GeocodeOutcome::Rejected(Rejection::NotRooftop(first.accuracy));
        }

        GeocodeOutcome::Resolved(Box::new(GeocodeResult {
            lat: first.lat,
            lng: first.lng,
            address: Some(first.formatted_address),
            place_id: Some(first.place_id),
            accuracy: Some(first.accuracy),
            types: Some(first.types),
            search_term: query.search_term,
            original_title: title.to_string(),
            technique: query.technique,
        }))
    }
}
