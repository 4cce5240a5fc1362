use mtls_utils::SecretString;
use rustls::RootCertStore;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};

use crate::error::MtlsError;
use crate::store::{CertificateStore, EntryKind};

/// Client identity: a store holding our private key and certificate chain,
/// paired with the passphrase that unlocked it.
///
/// PKCS#12 entries are already decrypted when the store is loaded, so the
/// passphrase is never used to build the TLS context. It is carried for
/// callers that re-export the identity.
///
/// The first private-key entry (in store order) is presented unless an alias
/// is chosen with [`with_alias`](Self::with_alias).
#[derive(Debug)]
pub struct ClientIdentity {
    store: CertificateStore,
    passphrase: SecretString,
    alias: Option<String>,
}

impl ClientIdentity {
    #[must_use]
    pub fn new(store: CertificateStore, passphrase: impl Into<SecretString>) -> Self {
        Self {
            store,
            passphrase: passphrase.into(),
            alias: None,
        }
    }

    /// Presents the key entry with this alias instead of the first one.
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    #[must_use]
    pub fn store(&self) -> &CertificateStore {
        &self.store
    }

    /// Passphrase the store was loaded with. Redacted in `Debug` output.
    #[must_use]
    pub fn passphrase(&self) -> &SecretString {
        &self.passphrase
    }

    /// Certificate chain and key handed to rustls.
    pub(crate) fn key_material(
        &self,
    ) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>), MtlsError> {
        let entry = match &self.alias {
            Some(alias) => self.store.entry(alias).ok_or_else(|| {
                MtlsError::tls_context(format!("identity store has no entry named '{alias}'"))
            })?,
            None => self
                .store
                .first_private_key()
                .ok_or_else(|| MtlsError::tls_context("identity store holds no private key"))?,
        };

        match entry.kind() {
            EntryKind::PrivateKey { key, chain } if !chain.is_empty() => {
                tracing::debug!(
                    alias = entry.alias(),
                    chain_len = chain.len(),
                    "using client identity"
                );
                Ok((chain.clone(), key.clone_key()))
            }
            EntryKind::PrivateKey { .. } => Err(MtlsError::tls_context(format!(
                "identity entry '{}' has no certificate chain",
                entry.alias()
            ))),
            EntryKind::TrustedCertificate(_) => Err(MtlsError::tls_context(format!(
                "identity entry '{}' is a certificate without a private key",
                entry.alias()
            ))),
        }
    }
}

/// Trust policy: every certificate in the store is a trust anchor for the
/// server's chain. Platform roots are never consulted.
#[derive(Debug)]
pub struct TrustPolicy {
    store: CertificateStore,
}

impl TrustPolicy {
    #[must_use]
    pub fn new(store: CertificateStore) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn store(&self) -> &CertificateStore {
        &self.store
    }

    pub(crate) fn root_store(&self) -> Result<RootCertStore, MtlsError> {
        let mut roots = RootCertStore::empty();
        let (added, ignored) = roots.add_parsable_certificates(self.store.certificates().cloned());

        if ignored > 0 {
            tracing::warn!(
                added = added,
                ignored = ignored,
                "some trust store certificates could not be used as anchors"
            );
        }

        if added == 0 {
            return Err(MtlsError::tls_context(
                "trust store holds no usable certificate",
            ));
        }

        tracing::debug!(anchors = added, "trust anchors loaded");
        Ok(roots)
    }
}
