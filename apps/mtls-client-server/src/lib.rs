#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Client service: a small axum application whose `/client` routes call an
//! upstream server over mutual TLS using [`mtls_http`].

pub mod api;
pub mod config;
pub mod logging;
pub mod signals;
pub mod state;

pub use api::router;
pub use config::{AppConfig, ClientSettings};
pub use state::{AppState, build_secure_client};
