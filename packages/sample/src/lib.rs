#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Deterministic id sampling.
//!
//! Maps an identifier to a reproducible fraction in `[0, 1)` so that a
//! `--sample 0.1` run always processes the same 10% of records, across
//! runs, machines and historical tooling.
//!
//! The fraction is the zlib CRC-32 of the id's UTF-8 bytes divided by
//! `2^32` (not `2^32 - 1`). Changing either the checksum or the encoding
//! silently changes which records are sampled.

use flate2::Crc;

/// `2^32` as a float; the CRC-32 range divisor.
const CRC_RANGE: f64 = 4_294_967_296.0;

/// Returns the reproducible pseudo-random fraction for `id`, in `[0, 1)`.
#[must_use]
pub fn sample_fraction(id: &str) -> f64 {
    let mut crc = Crc::new();
    crc.update(id.as_bytes());
    f64::from(crc.sum()) / CRC_RANGE
}

/// Whether `id` falls inside a sample of size `rate` (`0.0..=1.0`).
///
/// A rate of `0.0` or less never samples, even for the one-in-four-billion
/// id whose checksum is exactly zero.
#[must_use]
pub fn should_sample(id: &str, rate: f64) -> bool {
    if rate <= 0.0 {
        return false;
    }
    sample_fraction(id) <= rate
}
