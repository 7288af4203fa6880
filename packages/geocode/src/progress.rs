//! Progress reporting for batch geocoding.
//!
//! The batch driver only talks to [`ProgressCallback`]; the CLI plugs in an
//! `indicatif` bar and tests plug in [`NullProgress`].

use std::sync::Arc;

/// Receives progress updates from a long-running batch.
///
/// `Send + Sync` so a single bar can be shared behind an `Arc`.
pub trait ProgressCallback: Send + Sync {
    /// Total number of records the batch will look at.
    fn set_total(&self, total: u64);

    /// Advance by `delta` records.
    fn inc(&self, delta: u64);

    /// Replace the status message.
    fn set_message(&self, msg: String);

    /// Finish and leave `msg` on screen.
    fn finish(&self, msg: String);
}

/// Discards every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// A shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
