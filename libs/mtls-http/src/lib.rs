#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Mutual-TLS HTTPS client.
//!
//! This crate turns two certificate bundles into a ready-to-use HTTPS client:
//! - **Identity**: a PKCS#12 (or PEM) bundle with our private key and
//!   certificate chain, presented to the server during the handshake
//! - **Trust**: a bundle whose certificates are the only anchors the server's
//!   chain is verified against; platform roots are never used
//!
//! The client issues single GET calls and returns the body as text, or a
//! typed [`MtlsError`] whose [`ErrorKind`] tells store, TLS, handshake,
//! connection and status failures apart.
//!
//! # Example
//!
//! ```ignore
//! use mtls_http::{ClientIdentity, DirResources, SecureClientConfig, TrustPolicy};
//!
//! let resources = DirResources::new("resources");
//! let identity = ClientIdentity::new(
//!     mtls_http::load_store_from(&resources, "client-keystore.p12", "secret")?,
//!     "secret",
//! );
//! let trust = TrustPolicy::new(
//!     mtls_http::load_store_from(&resources, "client-truststore.p12", "changeit")?,
//! );
//!
//! let client = mtls_http::build_client(SecureClientConfig::new(
//!     "https://localhost:8443",
//!     identity,
//!     trust,
//! ))?;
//! let body = client.call_path("/server").await?;
//! ```

mod builder;
mod client;
mod config;
mod error;
mod identity;
mod layers;
mod resource;
mod response;
pub mod security;
mod store;
mod tls;
mod transport;

pub use builder::{SecureClientBuilder, build_client};
pub use client::SecureClient;
pub use config::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_BODY_SIZE, DEFAULT_REQUEST_TIMEOUT, DEFAULT_USER_AGENT,
    SecureClientConfig, TransportConfig,
};
pub use error::{BoxError, ErrorKind, MtlsError};
pub use identity::{ClientIdentity, TrustPolicy};
pub use layers::{DefaultHeadersLayer, DefaultHeadersService};
pub use resource::{DirResources, InMemoryResources, ResourceSource};
pub use store::{
    CertificateStore, EntryKind, StoreEntry, StoreFormat, load_store, load_store_as,
    load_store_from,
};
pub use tls::{get_crypto_provider, mtls_client_config};
