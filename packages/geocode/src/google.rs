//! Google Maps Geocoding API client.
//!
//! Requests go through the caching [`Fetcher`], so re-running a batch
//! replays earlier answers from disk instead of spending quota. Entries are
//! keyed by the URL without the API key, so rotating the key keeps the cache
//! and the key is never written to disk. Error responses are evicted from
//! the cache so a later run retries them.
//!
//! See <https://developers.google.com/maps/documentation/geocoding/requests-geocoding>

use oldto_fetcher::{FetchError, Fetcher, HttpClient};
use oldto_geocode_models::Accuracy;
use serde::Deserialize;

use crate::transport::{ApiResult, GeocodeTransport, TransportError};

/// Geocoder backed by the Google Maps JSON API.
#[derive(Debug)]
pub struct GoogleGeocoder<C = reqwest::Client> {
    fetcher: Fetcher<C>,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<ResponseResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseResult {
    formatted_address: String,
    geometry: Geometry,
    place_id: String,
    #[serde(default)]
    types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Location,
    location_type: Accuracy,
}

#[derive(Debug, Deserialize)]
struct Location {
    lat: f64,
    lng: f64,
}

impl<C: HttpClient> GoogleGeocoder<C> {
    /// Creates a client that fetches through `fetcher`.
    #[must_use]
    pub fn new(
        fetcher: Fetcher<C>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// The request URL for `query`, API key included.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] if the base URL is malformed.
    pub fn request_url(&self, query: &str) -> Result<String, FetchError> {
        self.url_with(&[("address", query), ("key", self.api_key.as_str())])
    }

    /// The cache key for `query`: the request URL without the API key.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] if the base URL is malformed.
    pub fn cache_key(&self, query: &str) -> Result<String, FetchError> {
        self.url_with(&[("address", query)])
    }

    fn url_with(&self, params: &[(&str, &str)]) -> Result<String, FetchError> {
        reqwest::Url::parse_with_params(&self.base_url, params)
            .map(String::from)
            .map_err(|_| FetchError::InvalidUrl {
                url: self.base_url.clone(),
            })
    }
}

impl<C: HttpClient> GeocodeTransport for GoogleGeocoder<C> {
    async fn geocode(&self, query: &str) -> Result<Vec<ApiResult>, TransportError> {
        let key = self.cache_key(query)?;
        let url = self.request_url(query)?;
        let body = self.fetcher.fetch_keyed(&key, &url, false).await?;

        let parsed = parse_response(&body);
        if parsed.is_err() {
            self.fetcher.remove_from_cache(&key)?;
        }
        parsed
    }
}

/// Parses a Geocoding API response body.
fn parse_response(body: &[u8]) -> Result<Vec<ApiResult>, TransportError> {
    let response: GeocodeResponse =
        serde_json::from_slice(body).map_err(|e| TransportError::Parse {
            message: format!("Invalid geocoding response: {e}"),
        })?;

    match response.status.as_str() {
        "OK" => Ok(response
            .results
            .into_iter()
            .map(|result| ApiResult {
                lat: result.geometry.location.lat,
                lng: result.geometry.location.lng,
                formatted_address: result.formatted_address,
                place_id: result.place_id,
                types: result.types,
                accuracy: result.geometry.location_type,
            })
            .collect()),
        "ZERO_RESULTS" => Ok(Vec::new()),
        _ => Err(TransportError::Api {
            status: response.status,
            message: response.error_message.unwrap_or_default(),
        }),
    }
}
