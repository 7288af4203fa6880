//! Batch geocoding: input loaders, the sequential driver and the output
//! writer.
//!
//! Titles are processed one at a time in input order. The output mapping is
//! only written once the whole batch is done, via a temporary file that is
//! renamed into place, so an interrupted run never leaves a half-written
//! `geocode_results.json` behind.

use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsString;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use oldto_geocode_models::{GeocodeResult, GeocodeSummary, PhotoRecord};

use crate::GeocodeError;
use crate::progress::ProgressCallback;
use crate::resolver::{GeocodeOutcome, Geocoder};
use crate::transport::GeocodeTransport;

/// Which records a batch looks at.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOptions {
    /// Fraction of ids to process, via [`oldto_sample::should_sample`].
    pub sample_rate: f64,
    /// Explicit allow-list. When set, sampling is ignored.
    pub ids: Option<BTreeSet<String>>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            sample_rate: 1.0,
            ids: None,
        }
    }
}

impl BatchOptions {
    /// Whether the record with `id` is selected.
    #[must_use]
    pub fn selects(&self, id: &str) -> bool {
        self.ids.as_ref().map_or_else(
            || oldto_sample::should_sample(id, self.sample_rate),
            |ids| ids.contains(id),
        )
    }
}

/// Geocodes every selected record, sequentially.
///
/// Returns the accepted results keyed by `uniqueID` together with the
/// batch tallies. Per-title failures only show up in the summary.
pub async fn geocode_records<T: GeocodeTransport>(
    geocoder: &Geocoder<T>,
    records: &[PhotoRecord],
    options: &BatchOptions,
    progress: &Arc<dyn ProgressCallback>,
) -> (BTreeMap<String, GeocodeResult>, GeocodeSummary) {
    let mut results = BTreeMap::new();
    let mut summary = GeocodeSummary::default();

    progress.set_total(records.len() as u64);
    progress.set_message("Geocoding titles".to_string());

    for record in records {
        summary.total += 1;
        progress.inc(1);

        if !options.selects(&record.unique_id) {
            summary.skipped += 1;
            continue;
        }
        let Some(title) = record.title() else {
            log::debug!("{}: no title", record.unique_id);
            summary.skipped += 1;
            continue;
        };

        summary.processed += 1;
        match geocoder.resolve_title(title).await {
            GeocodeOutcome::Unparsed => {
                log::debug!("{}: no parse: {title}", record.unique_id);
                summary.unparsed += 1;
            }
            GeocodeOutcome::NoResults => summary.no_results += 1,
            GeocodeOutcome::TransportFailed => summary.transport_failures += 1,
            GeocodeOutcome::Rejected(reason) => {
                log::debug!("{}: rejected ({reason:?}): {title}", record.unique_id);
                summary.rejected += 1;
            }
            GeocodeOutcome::Resolved(result) => {
                summary.resolved += 1;
                results.insert(record.unique_id.clone(), *result);
            }
        }
    }

    progress.finish(format!(
        "Geocoded {} of {} records",
        summary.resolved, summary.total
    ));
    log::info!(
        "Geocoding done: {} resolved, {} processed",
        summary.resolved,
        summary.processed
    );

    (results, summary)
}

/// Writes `results` as compact JSON, atomically replacing `path`.
///
/// # Errors
///
/// Returns [`GeocodeError`] if serialization or any file operation fails.
pub fn write_results(
    path: &Path,
    results: &BTreeMap<String, GeocodeResult>,
) -> Result<(), GeocodeError> {
    let json = serde_json::to_vec(results)?;

    let tmp = tmp_path(path);
    std::fs::write(&tmp, json).map_err(|source| GeocodeError::Io {
        path: tmp.display().to_string(),
        source,
    })?;
    std::fs::rename(&tmp, path).map_err(|source| GeocodeError::Io {
        path: path.display().to_string(),
        source,
    })?;

    log::info!("Wrote {} geocodes to {}", results.len(), path.display());
    Ok(())
}

/// Reads a `uniqueID → GeocodeResult` mapping written by [`write_results`].
///
/// # Errors
///
/// Returns [`GeocodeError`] if the file cannot be read or is not a valid
/// mapping.
pub fn read_results(path: &Path) -> Result<BTreeMap<String, GeocodeResult>, GeocodeError> {
    let bytes = std::fs::read(path).map_err(|source| GeocodeError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

/// Reads one [`PhotoRecord`] per line. Blank lines are skipped.
///
/// # Errors
///
/// Returns [`GeocodeError::Ndjson`] with the 1-based line number of the
/// first malformed line, or [`GeocodeError::Io`] if the file cannot be read.
pub fn read_ndjson(path: &Path) -> Result<Vec<PhotoRecord>, GeocodeError> {
    let io_err = |source| GeocodeError::Io {
        path: path.display().to_string(),
        source,
    };
    let file = std::fs::File::open(path).map_err(io_err)?;

    let mut records = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(io_err)?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|source| GeocodeError::Ndjson {
            path: path.display().to_string(),
            line: index + 1,
            source,
        })?;
        records.push(record);
    }

    log::info!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Reads a street list, one name per line. Blank lines are skipped.
///
/// # Errors
///
/// Returns [`GeocodeError::Io`] if the file cannot be read.
pub fn read_street_names(path: &Path) -> Result<Vec<String>, GeocodeError> {
    let text = std::fs::read_to_string(path).map_err(|source| GeocodeError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
