#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Small helpers shared by the mTLS client crates.
//!
//! - [`SecretString`] keeps store passphrases out of logs and config dumps.
//! - [`humantime_serde`] reads and writes `Duration` values as `"30s"`, `"1m 5s"`.

pub mod humantime_serde;
mod secret_string;

pub use secret_string::{REDACTED, SecretString};
