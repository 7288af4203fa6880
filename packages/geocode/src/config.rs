//! Geocoder settings.
//!
//! The defaults live in `services/geocoder.toml`, embedded at compile time.
//! A user file with the same shape replaces them wholesale.

use std::path::{Path, PathBuf};
use std::time::Duration;

use oldto_fetcher::Fetcher;
use serde::Deserialize;

use crate::GeocodeError;
use crate::google::GoogleGeocoder;
use crate::poi::PoiNameFilter;
use crate::transport::{AnyTransport, FAKE_LAT, FAKE_LNG, FakeTransport};

const DEFAULT_TOML: &str = include_str!("../services/geocoder.toml");

/// Top-level geocoder configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeocoderConfig {
    /// Appended to every network query.
    pub locale_suffix: String,
    /// Strict mode: minimum fraction of the title a POI name must cover.
    pub strict_poi_coverage: f64,
    /// POI names shorter than this are not matched.
    pub poi_min_name_len: usize,
    /// Short POI names that are matched anyway, lowercase.
    #[serde(default)]
    pub poi_short_names: Vec<String>,
    /// Fetch cache settings.
    pub cache: CacheConfig,
    /// Which geocoding backend to use.
    pub transport: TransportConfig,
}

/// Where fetched responses are stored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CacheConfig {
    /// Cache root directory.
    pub dir: PathBuf,
}

/// Geocoding backend, tagged by `type` in TOML.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportConfig {
    /// Google Maps Geocoding API.
    Google {
        /// API endpoint.
        base_url: String,
        /// Environment variable holding the API key.
        #[serde(default = "default_api_key_env")]
        api_key_env: String,
        /// Minimum delay between uncached requests in milliseconds.
        rate_limit_ms: u64,
    },
    /// Offline stub returning one fixed coordinate.
    Fake {
        /// Latitude to return.
        #[serde(default = "default_fake_lat")]
        lat: f64,
        /// Longitude to return.
        #[serde(default = "default_fake_lng")]
        lng: f64,
    },
}

fn default_api_key_env() -> String {
    "GMAPS_API_KEY".to_string()
}

const fn default_fake_lat() -> f64 {
    FAKE_LAT
}

const fn default_fake_lng() -> f64 {
    FAKE_LNG
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self::embedded()
    }
}

impl GeocoderConfig {
    /// The configuration compiled into the binary.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML is malformed, which the tests below
    /// rule out.
    #[must_use]
    pub fn embedded() -> Self {
        Self::from_toml(DEFAULT_TOML)
            .unwrap_or_else(|e| panic!("Failed to parse embedded geocoder config: {e}"))
    }

    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Config`] if the text is not a valid
    /// configuration.
    pub fn from_toml(text: &str) -> Result<Self, GeocodeError> {
        Ok(toml::de::from_str(text)?)
    }

    /// Reads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self, GeocodeError> {
        let text = std::fs::read_to_string(path).map_err(|source| GeocodeError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Which POI names may be matched.
    #[must_use]
    pub fn poi_filter(&self) -> PoiNameFilter {
        PoiNameFilter {
            min_name_len: self.poi_min_name_len,
            short_names: self
                .poi_short_names
                .iter()
                .map(|name| name.to_lowercase())
                .collect(),
        }
    }

    /// Replaces the transport with the offline stub.
    #[must_use]
    pub fn with_fake_transport(mut self) -> Self {
        self.transport = TransportConfig::Fake {
            lat: FAKE_LAT,
            lng: FAKE_LNG,
        };
        self
    }

    /// Builds the configured transport.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::MissingApiKey`] if the Google transport is
    /// selected and its key variable is unset, or [`GeocodeError::Fetch`]
    /// if the cache directory cannot be created.
    pub fn build_transport(&self) -> Result<AnyTransport, GeocodeError> {
        match &self.transport {
            TransportConfig::Google {
                base_url,
                api_key_env,
                rate_limit_ms,
            } => {
                let api_key = std::env::var(api_key_env)
                    .ok()
                    .filter(|key| !key.is_empty())
                    .ok_or_else(|| GeocodeError::MissingApiKey {
                        var: api_key_env.clone(),
                    })?;
                let fetcher = Fetcher::new(&self.cache.dir, Duration::from_millis(*rate_limit_ms))?;
                Ok(AnyTransport::Google(GoogleGeocoder::new(
                    fetcher,
                    base_url.clone(),
                    api_key,
                )))
            }
            TransportConfig::Fake { lat, lng } => {
                let fake = FakeTransport {
                    lat: *lat,
                    lng: *lng,
                };
                Ok(AnyTransport::Fake(fake))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_config_parses() {
        let config = GeocoderConfig::embedded();
        assert_eq!(config.locale_suffix, "ontario toronto canada");
        assert!((config.strict_poi_coverage - 0.85).abs() < f64::EPSILON);
        assert_eq!(config.poi_filter(), PoiNameFilter::default());
        assert_eq!(config.cache.dir, PathBuf::from("cache"));
        assert!(matches!(
            config.transport,
            TransportConfig::Google { ref api_key_env, rate_limit_ms: 100, .. }
                if api_key_env == "GMAPS_API_KEY"
        ));
    }

    #[test]
    fn fake_transport_defaults_to_fixed_coordinate() {
        let config = GeocoderConfig::from_toml(
            r#"
locale_suffix = "toronto"
strict_poi_coverage = 0.5
poi_min_name_len = 3

[cache]
dir = "/tmp/unused"

[transport]
type = "fake"
"#,
        )
        .unwrap();
        assert!(config.poi_short_names.is_empty());
        let AnyTransport::Fake(fake) = config.build_transport().unwrap() else {
            panic!("expected fake transport");
        };
        assert_eq!(fake, FakeTransport::default());
    }

    #[test]
    fn with_fake_transport_overrides_google() {
        let transport = GeocoderConfig::embedded()
            .with_fake_transport()
            .build_transport()
            .unwrap();
        assert!(matches!(transport, AnyTransport::Fake(_)));
    }

    #[test]
    fn missing_api_key_is_fatal() {
        let mut config = GeocoderConfig::embedded();
        config.transport = TransportConfig::Google {
            base_url: "https://maps.example.com".to_string(),
            api_key_env: "OLDTO_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            rate_limit_ms: 0,
        };
        let err = config.build_transport().unwrap_err();
        assert!(matches!(
            err,
            GeocodeError::MissingApiKey { ref var } if var == "OLDTO_TEST_KEY_THAT_IS_NEVER_SET"
        ));
    }

    #[test]
    fn unknown_transport_type_is_rejected() {
        let text = DEFAULT_TOML.replace(r#"type = "google""#, r#"type = "bing""#);
        assert!(matches!(
            GeocoderConfig::from_toml(&text),
            Err(GeocodeError::Config(_))
        ));
    }
}
