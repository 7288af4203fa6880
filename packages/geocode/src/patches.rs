//! Hand-curated corrections to geocoding results.
//!
//! Corrections come from a spreadsheet export with the columns
//! `Photo Id, Lat, Lng, Fixed` (other columns are ignored). A row with both
//! coordinates moves the photo. An id reported more than once without
//! coordinates is dropped from the map. Rows whose report has already been
//! dealt with are marked `Fixed = Yes` and take the id out of the table
//! entirely.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;

use oldto_geocode_models::GeocodeResult;
use serde::Deserialize;

use crate::GeocodeError;

/// What to do with one photo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PatchAction {
    /// Drop the photo from the output.
    Exclude,
    /// Move the photo to this coordinate.
    Override {
        /// Latitude (WGS84).
        lat: f64,
        /// Longitude (WGS84).
        lng: f64,
    },
}

#[derive(Debug, Deserialize)]
struct PatchRow {
    #[serde(rename = "Photo Id")]
    photo_id: String,
    #[serde(rename = "Lat", default)]
    lat: Option<f64>,
    #[serde(rename = "Lng", default)]
    lng: Option<f64>,
    #[serde(rename = "Fixed", default)]
    fixed: Option<String>,
}

/// Parses a patch CSV into per-id actions.
///
/// # Errors
///
/// Returns [`GeocodeError::AmbiguousOverride`] if one id is given two
/// different coordinates, or [`GeocodeError::Csv`] on malformed rows.
#[allow(clippy::float_cmp)]
pub fn load_patch_csv<R: Read>(reader: R) -> Result<BTreeMap<String, PatchAction>, GeocodeError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut overrides: BTreeMap<String, (f64, f64)> = BTreeMap::new();
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut fixed = BTreeSet::new();

    for row in csv_reader.deserialize::<PatchRow>() {
        let row = row?;
        *counts.entry(row.photo_id.clone()).or_default() += 1;

        if row.fixed.as_deref() == Some("Yes") {
            fixed.insert(row.photo_id.clone());
        }

        if let (Some(lat), Some(lng)) = (row.lat, row.lng) {
            if let Some(&existing) = overrides.get(&row.photo_id)
                && existing != (lat, lng)
            {
                return Err(GeocodeError::AmbiguousOverride { id: row.photo_id });
            }
            overrides.insert(row.photo_id, (lat, lng));
        }
    }

    let mut patches: BTreeMap<String, PatchAction> = counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(id, _)| (id, PatchAction::Exclude))
        .collect();
    for (id, (lat, lng)) in overrides {
        patches.insert(id, PatchAction::Override { lat, lng });
    }
    patches.retain(|id, _| !fixed.contains(id));

    log::debug!(
        "Loaded {} patches ({} already fixed)",
        patches.len(),
        fixed.len()
    );
    Ok(patches)
}

/// Applies `patches` to `results`, returning a new mapping.
///
/// Overrides only move photos that already have a geocode; they never
/// create one.
#[must_use]
pub fn apply_patches(
    results: &BTreeMap<String, GeocodeResult>,
    patches: &BTreeMap<String, PatchAction>,
) -> BTreeMap<String, GeocodeResult> {
    let mut excluded = 0_usize;
    let mut moved = 0_usize;

    let patched = results
        .iter()
        .filter_map(|(id, result)| match patches.get(id) {
            Some(PatchAction::Exclude) => {
                excluded += 1;
                None
            }
            Some(&PatchAction::Override { lat, lng }) => {
                moved += 1;
                Some((id.clone(), GeocodeResult {
                    lat,
                    lng,
                    ..result.clone()
                }))
            }
            None => Some((id.clone(), result.clone())),
        })
        .collect();

    log::info!("Patches excluded {excluded} and moved {moved} geocodes");
    patched
}

#[cfg(test)]
mod tests {
    use oldto_geocode_models::Technique;

    use super::*;

    const PATCH_CSV: &str = "\
Timestamp,Photo Id,Location suggestion,Lat,Lng,Fixed
3/20/2018 16:08:52,449487,\"This is from Toronto Island, not downtown.\",,,Yes
3/20/2018 16:17:46,144582,Wrong location. No history of railway here.,10,10,
3/20/2018 16:29:48,212373,This is on Eastwood Rd near Bowmore Rd.,,,
3/20/2018 17:48:30,462670,This is nowhere near King. ,,,
3/20/2018 16:29:48,212373,This is on Eastwood Rd near Bowmore Rd.,,,
";

    fn result(lat: f64, lng: f64) -> GeocodeResult {
        GeocodeResult {
            lat,
            lng,
            address: None,
            place_id: None,
            accuracy: None,
            types: None,
            search_term: "high park".to_string(),
            original_title: "High Park benches".to_string(),
            technique: Technique::Poi {
                name: "high park".to_string(),
            },
        }
    }

    #[test]
    fn loads_patch_csv() {
        let patches = load_patch_csv(PATCH_CSV.as_bytes()).unwrap();
        assert_eq!(patches.get("212373"), Some(&PatchAction::Exclude));
        assert_eq!(
            patches.get("144582"),
            Some(&PatchAction::Override {
                lat: 10.0,
                lng: 10.0
            })
        );
        assert!(!patches.contains_key("462670"));
        assert!(!patches.contains_key("449487"));
        assert_eq!(patches.len(), 2);
    }

    #[test]
    fn conflicting_coordinates_are_fatal() {
        let csv = "\
Photo Id,Lat,Lng,Fixed
1,43.6,-79.4,
1,43.7,-79.4,
";
        let err = load_patch_csv(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, GeocodeError::AmbiguousOverride { ref id } if id == "1"));
    }

    #[test]
    fn repeated_identical_coordinates_are_fine() {
        let csv = "\
Photo Id,Lat,Lng,Fixed
1,43.6,-79.4,
1,43.6,-79.4,
";
        let patches = load_patch_csv(csv.as_bytes()).unwrap();
        assert_eq!(
            patches.get("1"),
            Some(&PatchAction::Override {
                lat: 43.6,
                lng: -79.4
            })
        );
    }

    #[test]
    fn applies_patches_without_touching_input() {
        let mut results = BTreeMap::new();
        results.insert("144582".to_string(), result(43.6, -79.4));
        results.insert("212373".to_string(), result(43.7, -79.3));
        results.insert("100001".to_string(), result(43.8, -79.2));

        let patches = load_patch_csv(PATCH_CSV.as_bytes()).unwrap();
        let patched = apply_patches(&results, &patches);

        assert_eq!(patched.len(), 2);
        assert!(!patched.contains_key("212373"));
        let moved = &patched["144582"];
        assert!((moved.lat - 10.0).abs() < f64::EPSILON);
        assert_eq!(moved.original_title, "High Park benches");
        assert_eq!(patched["100001"], results["100001"]);
        assert!((results["144582"].lat - 43.6).abs() < f64::EPSILON);
    }
}
