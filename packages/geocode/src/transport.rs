//! The seam between the resolver and whatever answers geocoding queries.
//!
//! Failures come back as [`TransportError`] values; the resolver logs them
//! and moves on to the next title.

use std::future::Future;

use oldto_fetcher::FetchError;
use oldto_geocode_models::Accuracy;

use crate::google::GoogleGeocoder;

/// Coordinate returned by [`FakeTransport`] unless configured otherwise.
pub const FAKE_LAT: f64 = 43.647_178;
/// See [`FAKE_LAT`].
pub const FAKE_LNG: f64 = -79.359_089;

/// One candidate returned by a geocoding provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResult {
    /// Latitude (WGS84).
    pub lat: f64,
    /// Longitude (WGS84).
    pub lng: f64,
    /// Provider's formatted address.
    pub formatted_address: String,
    /// Provider's place identifier.
    pub place_id: String,
    /// Result categories, e.g. `["intersection"]`.
    pub types: Vec<String>,
    /// How precise the location is.
    pub accuracy: Accuracy,
}

/// Errors from a geocoding call.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The HTTP fetch or cache failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The response body was not what the provider documents.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// The provider answered with an error status.
    #[error("Geocoding API returned {status}: {message}")]
    Api {
        /// Provider status code, e.g. `OVER_QUERY_LIMIT`.
        status: String,
        /// Provider's explanation, if any.
        message: String,
    },
}

/// Something that turns a free-text query into ranked candidates.
pub trait GeocodeTransport: Send + Sync {
    /// Geocodes `query`. An empty list means the provider found nothing.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the provider could not be reached or
    /// returned an error.
    fn geocode(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<Vec<ApiResult>, TransportError>> + Send;
}

/// Offline stand-in that answers every query with one fixed location.
///
/// The result claims both address and intersection types so the type
/// check never rejects it; this isolates parser changes from the network.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FakeTransport {
    /// Latitude to return.
    pub lat: f64,
    /// Longitude to return.
    pub lng: f64,
}

impl Default for FakeTransport {
    fn default() -> Self {
        Self {
            lat: FAKE_LAT,
            lng: FAKE_LNG,
        }
    }
}

impl FakeTransport {
    fn answer(self, query: &str) -> ApiResult {
        ApiResult {
            lat: self.lat,
            lng: self.lng,
            formatted_address: query.to_string(),
            place_id: "na".to_string(),
            types: vec!["street_address".to_string(), "intersection".to_string()],
            accuracy: Accuracy::Rooftop,
        }
    }
}

impl GeocodeTransport for FakeTransport {
    fn geocode(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<Vec<ApiResult>, TransportError>> + Send {
        let result = self.answer(query);
        async move { Ok(vec![result]) }
    }
}

/// The transport picked at startup from configuration.
#[derive(Debug)]
pub enum AnyTransport {
    /// Google Maps Geocoding API through the caching fetcher.
    Google(GoogleGeocoder),
    /// Fixed-coordinate stub.
    Fake(FakeTransport),
}

impl GeocodeTransport for AnyTransport {
    async fn geocode(&self, query: &str) -> Result<Vec<ApiResult>, TransportError> {
        match self {
            Self::Google(google) => google.geocode(query).await,
            Self::Fake(fake) => fake.geocode(query).await,
        }
    }
}
