//! Implementations behind each `oldto` subcommand.
//!
//! Each command takes a `clap::Args` struct so the interactive menu can
//! fill one in from prompts and call the same code.

use std::collections::BTreeSet;
use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use oldto_cli_utils::{IndicatifProgress, MultiProgress};
use oldto_fetcher::{DEFAULT_THROTTLE, Fetcher};
use oldto_geocode::batch::{
    BatchOptions, geocode_records, read_ndjson, read_results, read_street_names, write_results,
};
use oldto_geocode::config::GeocoderConfig;
use oldto_geocode::diff::{diff_geocodes, distance_meters};
use oldto_geocode::nouns::{MAX_EXAMPLES, NounKind, noun_histogram};
use oldto_geocode::parsers::ParserChain;
use oldto_geocode::patches::{apply_patches, load_patch_csv};
use oldto_geocode::poi::PoiTable;
use oldto_geocode::resolver::Geocoder;
use oldto_geocode_models::GeocodeResult;

pub const DEFAULT_IMAGES: &str = "data/images.ndjson";
pub const DEFAULT_STREETS: &str = "data/streets.txt";
pub const DEFAULT_POIS: &str = "data/toronto-pois.osm.csv";
pub const DEFAULT_RESULTS: &str = "data/geocode_results.json";
pub const DEFAULT_CACHE_DIR: &str = "cache";

/// Options for `oldto geocode`.
#[derive(Debug, Clone, Args)]
pub struct GeocodeArgs {
    /// ndjson file with the records to geocode
    #[arg(long, default_value = DEFAULT_IMAGES)]
    pub input: PathBuf,
    /// Text file with one known street name per line
    #[arg(long, default_value = DEFAULT_STREETS)]
    pub street_names: PathBuf,
    /// CSV of points of interest (`name,osmid,lat,lng,score,type`)
    #[arg(long, default_value = DEFAULT_POIS)]
    pub pois: PathBuf,
    /// Where to write the `uniqueID -> result` JSON mapping
    #[arg(long, default_value = DEFAULT_RESULTS)]
    pub output: PathBuf,
    /// Only keep the most exact matches: ROOFTOP accuracy for network
    /// results, near-complete title coverage for POI names
    #[arg(long)]
    pub strict: bool,
    /// Replace the geocoding API with a stub that returns a fixed location.
    /// Useful for isolating changes to parsing.
    #[arg(long)]
    pub no_network: bool,
    /// Process a deterministic sample of records. 1=100%, 0.1=10%, etc.
    #[arg(long, default_value = "1.0")]
    pub sample: f64,
    /// Comma-separated uniqueIDs to process (overrides --sample)
    #[arg(long)]
    pub ids: Option<String>,
    /// Geocoder settings TOML (defaults to the built-in configuration)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl GeocodeArgs {
    fn ids(&self) -> Option<BTreeSet<String>> {
        let ids: BTreeSet<String> = self
            .ids
            .as_deref()?
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();
        (!ids.is_empty()).then_some(ids)
    }
}

/// Geocodes every selected record and writes the result mapping.
///
/// # Errors
///
/// Returns an error if an input cannot be loaded, the transport cannot be
/// built, or the output cannot be written.
pub async fn geocode(
    args: &GeocodeArgs,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => GeocoderConfig::from_path(path)?,
        None => GeocoderConfig::embedded(),
    };
    if args.no_network {
        log::warn!("****************************************************");
        log::warn!("* --no-network: every query returns a fixed point. *");
        log::warn!("* Do not ship these results.                       *");
        log::warn!("****************************************************");
        config = config.with_fake_transport();
    }

    let street_names = read_street_names(&args.street_names)?;
    let pois = PoiTable::from_path(&args.pois, &config.poi_filter())?;
    let street_count = street_names.len();
    log::info!("Loaded {street_count} streets and {} POIs", pois.len());

    let chain = ParserChain::new(&street_names, pois, config.locale_suffix.clone())?;
    let geocoder = Geocoder::new(
        chain,
        config.build_transport()?,
        args.strict,
        config.strict_poi_coverage,
    );

    let records = read_ndjson(&args.input)?;
    let options = BatchOptions {
        sample_rate: args.sample,
        ids: args.ids(),
    };

    let progress = IndicatifProgress::records_bar(multi, "Geocoding titles");
    let (results, summary) = geocode_records(&geocoder, &records, &options, &progress).await;

    write_results(&args.output, &results)?;
    println!("{summary}");
    Ok(())
}

/// Options for `oldto fetch`.
#[derive(Debug, Clone, Args)]
pub struct FetchArgs {
    /// File with one `url` or `filename<TAB>url` per line
    pub urls: PathBuf,
    /// Cache directory
    #[arg(long, default_value = DEFAULT_CACHE_DIR)]
    pub cache_dir: PathBuf,
    /// Minimum seconds between network requests
    #[arg(long, default_value_t = DEFAULT_THROTTLE.as_secs_f64())]
    pub throttle_secs: f64,
    /// Ignore cached copies and fetch everything again
    #[arg(long)]
    pub force: bool,
}

/// Fetches every URL in a list through the cache.
///
/// # Errors
///
/// Returns an error on the first URL that cannot be fetched or written.
pub async fn fetch(
    args: &FetchArgs,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let list = std::fs::read_to_string(&args.urls)?;
    let entries: Vec<(Option<&str>, &str)> = list
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            line.split_once('\t')
                .map_or((None, line), |(filename, url)| (Some(filename), url))
        })
        .collect();

    let throttle = Duration::try_from_secs_f64(args.throttle_secs)?;
    let fetcher = Fetcher::new(&args.cache_dir, throttle)?;
    let progress = IndicatifProgress::steps_bar(multi, "Fetching", entries.len() as u64);

    let mut bytes = 0_usize;
    for (filename, url) in &entries {
        progress.set_message(format!("Fetching {url}"));
        let content = fetcher.fetch_url(url, args.force).await?;
        log::debug!("{url}: {} bytes", content.len());
        bytes += content.len();
        if let Some(filename) = filename {
            std::fs::write(filename, content)?;
        }
        progress.inc(1);
    }

    progress.finish(format!("Fetched {} URLs ({bytes} bytes)", entries.len()));
    Ok(())
}

/// Options for `oldto nouns`.
#[derive(Debug, Clone, Args)]
pub struct NounsArgs {
    /// Which phrases to list
    #[arg(long, value_enum)]
    pub noun_type: NounType,
    /// Drop phrases seen fewer times than this
    #[arg(long, default_value_t = 1)]
    pub cutoff: usize,
    /// ndjson file to read titles from
    #[arg(long, default_value = DEFAULT_IMAGES)]
    pub input: PathBuf,
}

/// `--noun-type` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum NounType {
    /// Street names, e.g. "Yonge Street"
    Streets,
    /// Everything else, e.g. "High Park"
    Pois,
}

impl From<NounType> for NounKind {
    fn from(noun_type: NounType) -> Self {
        match noun_type {
            NounType::Streets => Self::Streets,
            NounType::Pois => Self::Pois,
        }
    }
}

/// Prints a TSV histogram of capitalized noun phrases in all titles.
///
/// # Errors
///
/// Returns an error if the input cannot be read.
pub fn nouns(args: &NounsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let records = read_ndjson(&args.input)?;
    let titles: Vec<&str> = records.iter().filter_map(|record| record.title()).collect();

    let header: Vec<String> = (1..=MAX_EXAMPLES).map(|i| format!("Example{i}")).collect();
    println!("Count\tName\t{}", header.join("\t"));
    for noun in noun_histogram(&titles, args.noun_type.into(), args.cutoff) {
        let examples = noun.examples.join("\t");
        println!("{}\t{}\t{examples}", noun.count, noun.phrase);
    }
    Ok(())
}

/// Options for `oldto patch`.
#[derive(Debug, Clone, Args)]
pub struct PatchArgs {
    /// Geocode results to correct
    #[arg(long, default_value = DEFAULT_RESULTS)]
    pub geocode_results: PathBuf,
    /// Corrections CSV (`Photo Id,Lat,Lng,Fixed`)
    #[arg(long)]
    pub patch_csv: PathBuf,
    /// Where to write the corrected mapping
    #[arg(long)]
    pub output: PathBuf,
}

/// Applies a corrections CSV to a result mapping.
///
/// # Errors
///
/// Returns an error if an input cannot be read, the corrections are
/// ambiguous, or the output cannot be written.
pub fn patch(args: &PatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let results = read_results(&args.geocode_results)?;
    let patches = load_patch_csv(File::open(&args.patch_csv)?)?;
    let corrected = apply_patches(&results, &patches);
    write_results(&args.output, &corrected)?;
    println!(
        "{} geocodes in, {} out ({} patches)",
        results.len(),
        corrected.len(),
        patches.len()
    );
    Ok(())
}

/// Options for `oldto diff`.
#[derive(Debug, Clone, Args)]
pub struct DiffArgs {
    /// Results before the change
    pub before: PathBuf,
    /// Results after the change
    #[arg(default_value = DEFAULT_RESULTS)]
    pub after: PathBuf,
    /// Compare a deterministic sample of ids. 1=100%, 0.1=10%, etc.
    #[arg(long, default_value = "1.0")]
    pub sample: f64,
    /// Examples to show per category (added, dropped, changed)
    #[arg(long, default_value_t = 20)]
    pub num_samples: usize,
}

fn describe(prefix: char, result: &GeocodeResult) -> String {
    format!(
        "   {prefix} {:.6},{:.6} {:?}",
        result.lat,
        result.lng,
        Vec::<String>::from(result.technique.clone())
    )
}

/// Summarizes how two result mappings differ.
///
/// # Errors
///
/// Returns an error if either mapping cannot be read.
pub fn diff(args: &DiffArgs) -> Result<(), Box<dyn std::error::Error>> {
    let before = read_results(&args.before)?;
    let after = read_results(&args.after)?;
    let diff = diff_geocodes(&before, &after, args.sample);

    println!();
    println!("  Before: {}", diff.before);
    println!("   After: {}", diff.after);
    println!();
    println!("   Added: {}", diff.added.len());
    println!(" Dropped: {}", diff.dropped.len());
    println!(" Changed: {}", diff.changed.len());

    println!("\nSample of additions:");
    for id in diff.added.iter().take(args.num_samples) {
        let result = &after[id];
        println!(" {id:>6}: {}", result.original_title);
        println!("{}", describe('+', result));
    }

    println!("\nSample of dropped:");
    for id in diff.dropped.iter().take(args.num_samples) {
        let result = &before[id];
        println!(" {id:>6}: {}", result.original_title);
        println!("{}", describe('-', result));
    }

    println!("\nSample of changes:");
    for changed in diff.changed.iter().take(args.num_samples) {
        let (old, new) = (&before[&changed.id], &after[&changed.id]);
        println!(" {:>6}: {}", changed.id, old.original_title);
        println!("{}", describe('-', old));
        println!("{}", describe('+', new));
        println!("     Moved {:.0} meters", distance_meters(old, new));
    }
    Ok(())
}
