//! Compares two geocode result sets.
//!
//! Used to review the effect of a heuristic change: run the batch before
//! and after, then see which photos gained, lost or moved a location.

use std::collections::{BTreeMap, BTreeSet};

use geo::{Distance, Haversine, Point};
use oldto_geocode_models::GeocodeResult;

/// A photo whose coordinate differs between the two runs.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangedGeocode {
    /// Photo id.
    pub id: String,
    /// Great-circle distance between the two coordinates, in meters.
    pub meters: f64,
}

/// Differences between two result sets, restricted to sampled ids.
///
/// All id lists are sorted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeocodeDiff {
    /// Sampled ids in the first set.
    pub before: usize,
    /// Sampled ids in the second set.
    pub after: usize,
    /// Ids only in the second set.
    pub added: Vec<String>,
    /// Ids only in the first set.
    pub dropped: Vec<String>,
    /// Ids in both sets whose coordinate changed.
    pub changed: Vec<ChangedGeocode>,
}

/// Distance in meters between two results.
#[must_use]
pub fn distance_meters(a: &GeocodeResult, b: &GeocodeResult) -> f64 {
    Haversine.distance(Point::new(a.lng, a.lat), Point::new(b.lng, b.lat))
}

/// Diffs `before` against `after`, looking only at ids selected by
/// [`oldto_sample::should_sample`] at `sample_rate`.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn diff_geocodes(
    before: &BTreeMap<String, GeocodeResult>,
    after: &BTreeMap<String, GeocodeResult>,
    sample_rate: f64,
) -> GeocodeDiff {
    let sampled = |map: &BTreeMap<String, GeocodeResult>| -> BTreeSet<String> {
        map.keys()
            .filter(|id| oldto_sample::should_sample(id, sample_rate))
            .cloned()
            .collect()
    };
    let before_ids = sampled(before);
    let after_ids = sampled(after);

    let changed = before_ids
        .intersection(&after_ids)
        .filter_map(|id| {
            let (a, b) = (&before[id], &after[id]);
            (a.lat != b.lat || a.lng != b.lng).then(|| ChangedGeocode {
                id: id.clone(),
                meters: distance_meters(a, b),
            })
        })
        .collect();

    GeocodeDiff {
        before: before_ids.len(),
        after: after_ids.len(),
        added: after_ids.difference(&before_ids).cloned().collect(),
        dropped: before_ids.difference(&after_ids).cloned().collect(),
        changed,
    }
}

#[cfg(test)]
mod tests {
    use oldto_geocode_models::Technique;

    use super::*;

    fn result(lat: f64, lng: f64) -> GeocodeResult {
        GeocodeResult {
            lat,
            lng,
            address: None,
            place_id: None,
            accuracy: None,
            types: None,
            search_term: "yonge street and bloor street".to_string(),
            original_title: "Yonge Street at Bloor Street".to_string(),
            technique: Technique::TwoStreets {
                first: "Yonge Street".to_string(),
                second: "Bloor Street".to_string(),
            },
        }
    }

    fn map(entries: &[(&str, f64, f64)]) -> BTreeMap<String, GeocodeResult> {
        entries
            .iter()
            .map(|&(id, lat, lng)| (id.to_string(), result(lat, lng)))
            .collect()
    }

    #[test]
    fn reports_added_dropped_and_changed() {
        let before = map(&[
            ("1", 43.6, -79.4),
            ("2", 43.6, -79.4),
            ("3", 43.6, -79.4),
        ]);
        let after = map(&[
            ("2", 43.6, -79.4),
            ("3", 43.7, -79.4),
            ("4", 43.6, -79.4),
        ]);

        let diff = diff_geocodes(&before, &after, 1.0);

        assert_eq!(diff.before, 3);
        assert_eq!(diff.after, 3);
        assert_eq!(diff.added, vec!["4"]);
        assert_eq!(diff.dropped, vec!["1"]);
        assert_eq!(diff.changed.len(), 1);
        assert_eq!(diff.changed[0].id, "3");
        // 0.1 degrees of latitude is roughly 11.1 km.
        let meters = diff.changed[0].meters;
        assert!((meters - 11_120.0).abs() < 20.0, "{meters}");
    }

    #[test]
    fn zero_rate_sees_nothing() {
        let before = map(&[("1", 43.6, -79.4)]);
        let after = map(&[("2", 43.6, -79.4)]);
        assert_eq!(diff_geocodes(&before, &after, 0.0), GeocodeDiff::default());
    }

    #[test]
    fn identical_sets_have_no_differences() {
        let results = map(&[("1", 43.6, -79.4), ("2", 43.65, -79.38)]);
        let diff = diff_geocodes(&results, &results, 1.0);
        assert!(diff.added.is_empty() && diff.dropped.is_empty() && diff.changed.is_empty());
        assert_eq!(diff.before, 2);
    }
}
