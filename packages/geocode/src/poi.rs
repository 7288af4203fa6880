//! Curated point-of-interest lookup.
//!
//! The table comes from a CSV (`name,osmid,lat,lng,score,type`) produced
//! from OpenStreetMap. All usable names are compiled into a single
//! case-insensitive alternation; a hit must be bounded by non-letters so
//! "Park" never matches inside "Parkdale".

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;

use oldto_geocode_models::{PoiMatch, PoiRecord};
use regex::{Regex, RegexBuilder};

use crate::GeocodeError;

/// Names outside this character set are never matched.
static SAFE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-A-Za-z .]+$").expect("valid regex"));

const POI_REGEX_SIZE_LIMIT: usize = 64 * (1 << 20);

/// Which names are specific enough to match inside a title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoiNameFilter {
    /// Names shorter than this (in characters) are skipped...
    pub min_name_len: usize,
    /// ...unless they appear here (lowercase).
    pub short_names: Vec<String>,
}

impl Default for PoiNameFilter {
    fn default() -> Self {
        Self {
            min_name_len: 5,
            short_names: vec!["cne".to_string()],
        }
    }
}

impl PoiNameFilter {
    fn accepts(&self, name: &str) -> bool {
        (name.chars().count() >= self.min_name_len || self.short_names.iter().any(|s| s == name))
            && SAFE_NAME_RE.is_match(name)
    }
}

/// POI records keyed by lowercase name, plus the compiled name matcher.
#[derive(Debug, Clone)]
pub struct PoiTable {
    /// Records by first appearance of each name; a later row with the same
    /// name replaces the stored record in place.
    records: Vec<PoiRecord>,
    by_name: BTreeMap<String, usize>,
    regex: Option<Regex>,
}

impl PoiTable {
    /// Loads a POI CSV from disk.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the file cannot be opened or parsed.
    pub fn from_path(path: &Path, filter: &PoiNameFilter) -> Result<Self, GeocodeError> {
        let file = std::fs::File::open(path).map_err(|source| GeocodeError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_reader(file, filter)
    }

    /// Loads a POI CSV from any reader.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Csv`] on malformed rows, or
    /// [`GeocodeError::Regex`] if the name alternation cannot be compiled.
    pub fn from_reader<R: Read>(reader: R, filter: &PoiNameFilter) -> Result<Self, GeocodeError> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut rows = Vec::new();
        for row in csv_reader.deserialize::<PoiRecord>() {
            rows.push(row?);
        }
        Self::from_records(rows, filter)
    }

    /// Builds a table from already-parsed rows.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Regex`] if the name alternation cannot be
    /// compiled.
    pub fn from_records(
        rows: Vec<PoiRecord>,
        filter: &PoiNameFilter,
    ) -> Result<Self, GeocodeError> {
        let mut records = Vec::with_capacity(rows.len());
        let mut by_name = BTreeMap::new();
        let mut safe_names = Vec::new();

        for row in rows {
            let name = row.name.to_lowercase();
            if let Some(&idx) = by_name.get(&name) {
                log::debug!("Duplicate POI '{name}' replaces the earlier row");
                records[idx] = row;
                continue;
            }
            if filter.accepts(&name) {
                safe_names.push(regex::escape(&name));
            }
            by_name.insert(name, records.len());
            records.push(row);
        }

        log::debug!("Found {} safe POI names", safe_names.len());

        let regex = if safe_names.is_empty() {
            None
        } else {
            Some(
                RegexBuilder::new(&format!(r"(?:^|[^a-z])({})(?:[^a-z]|$)", safe_names.join("|")))
                    .case_insensitive(true)
                    .size_limit(POI_REGEX_SIZE_LIMIT)
                    .build()?,
            )
        };

        Ok(Self {
            records,
            by_name,
            regex,
        })
    }

    /// Number of distinct names in the table.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Looks up a record by name, ignoring case.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PoiRecord> {
        self.by_name
            .get(&name.to_lowercase())
            .map(|&index| &self.records[index])
    }

    /// Finds the best POI mentioned in `title`.
    ///
    /// Every non-overlapping hit is considered and the one with the highest
    /// score wins. Equal scores go to the row that appears first in the
    /// table, which is arbitrary but stable across runs.
    #[must_use]
    pub fn find(&self, title: &str) -> Option<PoiMatch> {
        let regex = self.regex.as_ref()?;

        let mut best: Option<(usize, String)> = None;
        for caps in regex.captures_iter(title) {
            let Some(hit) = caps.get(1) else { continue };
            let name = hit.as_str().to_lowercase();
            let Some(&index) = self.by_name.get(&name) else {
                continue;
            };

            let better = best.as_ref().is_none_or(|(best_index, _)| {
                match self.records[index]
                    .score
                    .total_cmp(&self.records[*best_index].score)
                {
                    Ordering::Greater => true,
                    Ordering::Equal => index < *best_index,
                    Ordering::Less => false,
                }
            });
            if better {
                best = Some((index, name));
            }
        }

        let (index, name) = best?;
        let record = &self.records[index];
        log::debug!("POI match {name} ({}): {title}", record.osmid);

        Some(PoiMatch {
            name,
            osmid: record.osmid.clone(),
            lat: record.lat,
            lng: record.lng,
            score: record.score,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const POIS_CSV: &str = "\
name,osmid,lat,lng,score,type
C. N. E.,1000000004164234,43.633751,-79.4192546,2,tourism:theme_park
CNE,1000000004164234,43.633751,-79.4192546,2,tourism:theme_park
High Park,1000000014344414,43.6462345,-79.4627137,1,leisure:park
";

    pub(crate) fn test_table() -> PoiTable {
        PoiTable::from_reader(POIS_CSV.as_bytes(), &PoiNameFilter::default()).unwrap()
    }

    #[test]
    fn higher_score_wins_even_when_later_in_title() {
        let hit = test_table().find("high park enches, c. n. e.").unwrap();
        assert_eq!(hit.name, "c. n. e.");
        assert!((hit.lat - 43.633_751).abs() < 1e-9);
        assert!((hit.lng - -79.419_254_6).abs() < 1e-9);
    }

    #[test]
    fn matches_whole_title() {
        let hit = test_table().find("high park").unwrap();
        assert_eq!(hit.name, "high park");
        assert_eq!(hit.osmid, "1000000014344414");
    }

    #[test]
    fn short_name_exception() {
        let hit = test_table().find("high park enches, cne").unwrap();
        assert_eq!(hit.name, "cne");
    }

    #[test]
    fn requires_letter_boundaries() {
        let table = test_table();
        assert!(table.find("Highpark Avenue").is_none());
        assert!(table.find("The CNEX building").is_none());
        assert!(table.find("").is_none());
    }

    #[test]
    fn ties_go_to_first_row() {
        let csv = "\
name,osmid,lat,lng,score,type
Union Station,1,1.0,1.0,3,railway:station
Royal York,2,2.0,2.0,3,tourism:hotel
";
        let table = PoiTable::from_reader(csv.as_bytes(), &PoiNameFilter::default()).unwrap();
        let hit = table.find("Royal York and Union Station").unwrap();
        assert_eq!(hit.name, "union station");
    }

    #[test]
    fn skips_unsafe_and_short_names() {
        let csv = "\
name,osmid,lat,lng,score,type
Zoo,1,1.0,1.0,5,tourism:zoo
St. Lawrence (North),2,2.0,2.0,5,amenity:marketplace
";
        let table = PoiTable::from_reader(csv.as_bytes(), &PoiNameFilter::default()).unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.get("ZOO").is_some());
        assert!(table.find("Zoo").is_none());
        assert!(table.find("St. Lawrence (North)").is_none());
    }

    #[test]
    fn duplicate_names_take_the_last_row() {
        let csv = "\
name,osmid,lat,lng,score,type
Fort York,1,1.0,1.0,1,historic:fort
FORT YORK,2,2.0,2.0,9,historic:fort
";
        let table = PoiTable::from_reader(csv.as_bytes(), &PoiNameFilter::default()).unwrap();
        assert_eq!(table.len(), 1);
        let hit = table.find("View of Fort York gate").unwrap();
        assert_eq!(hit.osmid, "2");
        assert!((hit.lat - 2.0).abs() < f64::EPSILON);
        assert!((hit.score - 9.0).abs() < f64::EPSILON);
    }

    #[test]
    fn duplicate_name_keeps_its_first_position() {
        let csv = "\
name,osmid,lat,lng,score,type
Union Station,1,1.0,1.0,5,railway:station
Fort York,2,2.0,2.0,5,historic:fort
UNION STATION,3,3.0,3.0,5,railway:station
";
        let table = PoiTable::from_reader(csv.as_bytes(), &PoiNameFilter::default()).unwrap();
        assert_eq!(table.len(), 2);
        let hit = table.find("Fort York from Union Station").unwrap();
        assert_eq!(hit.osmid, "3");
    }
}
