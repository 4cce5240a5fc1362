//! rustls configuration for mutually authenticated connections.

use std::sync::Arc;

use crate::error::MtlsError;
use crate::identity::{ClientIdentity, TrustPolicy};

/// Get the crypto provider for TLS connections.
///
/// Uses the process-wide default when one is installed, otherwise an
/// aws-lc-rs provider that is not installed globally.
#[must_use]
pub fn get_crypto_provider() -> Arc<rustls::crypto::CryptoProvider> {
    rustls::crypto::CryptoProvider::get_default()
        .cloned()
        .unwrap_or_else(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider()))
}

/// Builds a client configuration that presents `identity` and verifies the
/// server only against the anchors in `trust`.
///
/// # Errors
/// Returns [`MtlsError::TlsContext`] when the trust store has no usable
/// certificate, the identity has no usable key entry, or the key does not
/// match the leaf certificate.
pub fn mtls_client_config(
    identity: &ClientIdentity,
    trust: &TrustPolicy,
) -> Result<rustls::ClientConfig, MtlsError> {
    let roots = trust.root_store()?;
    let (chain, key) = identity.key_material()?;

    rustls::ClientConfig::builder_with_provider(get_crypto_provider())
        .with_safe_default_protocol_versions()
        .map_err(|e| MtlsError::tls_context_from("failed to set TLS protocol versions", e))?
        .with_root_certificates(roots)
        .with_client_auth_cert(chain, key)
        .map_err(|e| {
            MtlsError::tls_context_from(
                format!("client certificate and private key are unusable: {e}"),
                e,
            )
        })
}
