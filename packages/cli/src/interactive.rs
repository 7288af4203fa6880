#![allow(clippy::module_name_repetitions)]

//! Menu-driven front end used when `oldto` runs without a subcommand.

use std::path::PathBuf;

use dialoguer::{Confirm, Input, Select};
use oldto_cli_utils::MultiProgress;
use oldto_fetcher::DEFAULT_THROTTLE;

use crate::commands::{
    self, DEFAULT_CACHE_DIR, DEFAULT_IMAGES, DEFAULT_POIS, DEFAULT_RESULTS, DEFAULT_STREETS,
    DiffArgs, FetchArgs, GeocodeArgs, NounType, NounsArgs, PatchArgs,
};

/// Top-level actions in the menu.
enum Tool {
    Geocode,
    Fetch,
    Nouns,
    Patch,
    Diff,
}

impl Tool {
    const ALL: &[Self] = &[
        Self::Geocode,
        Self::Fetch,
        Self::Nouns,
        Self::Patch,
        Self::Diff,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Geocode => "Geocode photo titles",
            Self::Fetch => "Fetch a list of URLs into the cache",
            Self::Nouns => "List frequent noun phrases",
            Self::Patch => "Apply location corrections",
            Self::Diff => "Compare two geocode runs",
        }
    }
}

fn prompt_path(prompt: &str, default: &str) -> Result<PathBuf, dialoguer::Error> {
    let text: String = Input::new()
        .with_prompt(prompt)
        .default(default.to_string())
        .interact_text()?;
    Ok(PathBuf::from(text))
}

/// Asks which tool to run, prompts for its options, then runs it.
///
/// # Errors
///
/// Returns an error if a prompt fails or the selected command fails.
pub async fn run(multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    let labels: Vec<&str> = Tool::ALL.iter().map(Tool::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Tool::ALL[idx] {
        Tool::Geocode => {
            let args = GeocodeArgs {
                input: prompt_path("Records (ndjson)", DEFAULT_IMAGES)?,
                street_names: prompt_path("Street names", DEFAULT_STREETS)?,
                pois: prompt_path("POI table", DEFAULT_POIS)?,
                output: prompt_path("Output", DEFAULT_RESULTS)?,
                strict: Confirm::new()
                    .with_prompt("Strict mode?")
                    .default(false)
                    .interact()?,
                no_network: Confirm::new()
                    .with_prompt("Stub out the network?")
                    .default(false)
                    .interact()?,
                sample: Input::new()
                    .with_prompt("Sample rate")
                    .default(1.0)
                    .interact_text()?,
                ids: None,
                config: None,
            };
            commands::geocode(&args, multi).await?;
        }
        Tool::Fetch => {
            let args = FetchArgs {
                urls: prompt_path("URL list", "urls.txt")?,
                cache_dir: prompt_path("Cache directory", DEFAULT_CACHE_DIR)?,
                throttle_secs: Input::new()
                    .with_prompt("Seconds between requests")
                    .default(DEFAULT_THROTTLE.as_secs_f64())
                    .interact_text()?,
                force: Confirm::new()
                    .with_prompt("Ignore cached copies?")
                    .default(false)
                    .interact()?,
            };
            commands::fetch(&args, multi).await?;
        }
        Tool::Nouns => {
            let kinds = ["Streets", "POIs"];
            let kind = Select::new()
                .with_prompt("Which phrases?")
                .items(&kinds)
                .default(0)
                .interact()?;
            let args = NounsArgs {
                noun_type: if kind == 0 {
                    NounType::Streets
                } else {
                    NounType::Pois
                },
                cutoff: Input::new()
                    .with_prompt("Minimum count")
                    .default(1)
                    .interact_text()?,
                input: prompt_path("Records (ndjson)", DEFAULT_IMAGES)?,
            };
            commands::nouns(&args)?;
        }
        Tool::Patch => {
            let args = PatchArgs {
                geocode_results: prompt_path("Geocode results", DEFAULT_RESULTS)?,
                patch_csv: prompt_path("Corrections CSV", "data/patch.csv")?,
                output: prompt_path("Output", "data/geocode_results.patched.json")?,
            };
            commands::patch(&args)?;
        }
        Tool::Diff => {
            let args = DiffArgs {
                before: prompt_path("Results before", "old/geocode_results.json")?,
                after: prompt_path("Results after", DEFAULT_RESULTS)?,
                sample: 1.0,
                num_samples: Input::new()
                    .with_prompt("Examples per category")
                    .default(20)
                    .interact_text()?,
            };
            commands::diff(&args)?;
        }
    }

    Ok(())
}
