#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Title-to-location geocoding for the Old Toronto photo archive.
//!
//! A photo's caption is the only hint to where it was taken. The
//! [`parsers::ParserChain`] tries a fixed list of regex heuristics (exact
//! address, street corners, "looking north from", two known streets,
//! "X and Y") and falls back to a curated [`poi::PoiTable`]. Street
//! candidates are sent to a [`transport::GeocodeTransport`]; the
//! [`resolver::Geocoder`] then applies the acceptance policy, which in
//! strict mode prefers dropping a photo to placing it badly.
//!
//! [`batch`] drives whole archives, [`patches`] applies hand corrections
//! and [`diff`] compares two runs.

pub mod batch;
pub mod config;
pub mod diff;
pub mod google;
pub mod nouns;
pub mod parsers;
pub mod patches;
pub mod poi;
pub mod progress;
pub mod resolver;
pub mod streets;
pub mod transport;

use oldto_fetcher::FetchError;

/// Errors that abort a batch.
///
/// Per-title problems never show up here; see
/// [`resolver::GeocodeOutcome`].
#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    /// An input or output file could not be read or written.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// File involved.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A line of an ndjson file is not a valid record.
    #[error("{path}:{line}: {source}")]
    Ndjson {
        /// File being read.
        path: String,
        /// 1-based line number.
        line: usize,
        /// Parse failure.
        #[source]
        source: serde_json::Error,
    },

    /// A CSV file is malformed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A street or POI alternation could not be compiled.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// The configuration file is invalid.
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// The configured transport needs an API key that is not set.
    #[error("Environment variable {var} is not set")]
    MissingApiKey {
        /// Name of the variable.
        var: String,
    },

    /// The patch table gives one photo two different coordinates.
    #[error("Ambiguous fix for {id}")]
    AmbiguousOverride {
        /// Photo id.
        id: String,
    },

    /// The fetcher could not be set up.
    #[error(transparent)]
    Fetch(#[from] FetchError),
}
