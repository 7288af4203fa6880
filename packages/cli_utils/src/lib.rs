#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing shared by the `oldto` binaries.
//!
//! [`init_logger`] routes `log` output through an `indicatif`
//! [`MultiProgress`] so log lines are printed above the bars instead of
//! through them. [`IndicatifProgress`] adapts a bar to the geocoder's
//! [`ProgressCallback`].

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use oldto_geocode::progress::ProgressCallback;

pub use indicatif::MultiProgress;

const TICK: Duration = Duration::from_millis(100);

/// A [`ProgressBar`] behind the [`ProgressCallback`] trait.
pub struct IndicatifProgress {
    bar: ProgressBar,
    /// Applied when `set_total()` turns a spinner into a bar.
    sized_style: ProgressStyle,
}

fn bar_style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-")
}

impl IndicatifProgress {
    /// A bar for walking through photo records.
    ///
    /// Spins until [`ProgressCallback::set_total()`] says how many records
    /// there are, then shows position, percentage and ETA.
    #[must_use]
    pub fn records_bar(multi: &MultiProgress, message: &str) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(TICK);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.yellow} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());

        Arc::new(Self {
            bar,
            sized_style: bar_style("  {msg} {wide_bar:.yellow/dim} {pos}/{len} {percent}% [{eta}]"),
        })
    }

    /// A bar whose length is known up front, e.g. URLs in a fetch list.
    #[must_use]
    pub fn steps_bar(
        multi: &MultiProgress,
        message: &str,
        total: u64,
    ) -> Arc<dyn ProgressCallback> {
        let sized_style = bar_style("{msg} {wide_bar:.green/dim} {pos}/{len} [{elapsed_precise}]");
        let bar = multi.add(ProgressBar::new(total));
        bar.set_style(sized_style.clone());
        bar.set_message(message.to_string());

        Arc::new(Self { bar, sized_style })
    }
}

impl ProgressCallback for IndicatifProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.bar.set_style(self.sized_style.clone());
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }
}

/// Installs `pretty_env_logger` (filtered by `RUST_LOG`) behind
/// `indicatif-log-bridge`.
///
/// Every progress bar must be added to the returned [`MultiProgress`].
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    // A second call (tests, nested tools) keeps the first logger.
    if indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .is_ok()
    {
        log::set_max_level(level);
    }

    multi
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_total_sizes_the_bar() {
        let progress = IndicatifProgress {
            bar: ProgressBar::hidden(),
            sized_style: bar_style("{pos}/{len}"),
        };
        progress.set_total(10);
        progress.inc(3);
        assert_eq!(progress.bar.length(), Some(10));
        assert_eq!(progress.bar.position(), 3);
        progress.set_total(4);
        assert_eq!(progress.bar.position(), 0);
        progress.finish("done".to_string());
        assert!(progress.bar.is_finished());
    }

    #[test]
    fn init_logger_twice_is_harmless() {
        let _first = init_logger();
        let _second = init_logger();
        log::info!("still logging");
    }
}
