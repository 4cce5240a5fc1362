use std::sync::Arc;

use mtls_http::{
    ClientIdentity, ErrorKind, MtlsError, ResourceSource, SecureClient, SecureClientConfig,
    TrustPolicy, load_store_from,
};

use crate::config::ClientSettings;

/// Why the client built at startup is unavailable.
#[derive(Debug, Clone)]
pub struct StartupFailure {
    pub kind: ErrorKind,
    pub detail: String,
}

impl From<&MtlsError> for StartupFailure {
    fn from(err: &MtlsError) -> Self {
        Self {
            kind: err.kind(),
            detail: err.to_string(),
        }
    }
}

/// Shared state of the `/client` routes.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<ClientSettings>,
    pub resources: Arc<dyn ResourceSource>,
    /// Client built once at startup and used by `/client/client`
    pub client: Arc<Result<SecureClient, StartupFailure>>,
}

impl AppState {
    /// Builds the startup client. A failure is kept and reported per request
    /// so the service still starts and answers `/client`.
    ///
    /// Must be called within a tokio runtime.
    #[must_use]
    pub fn initialize(settings: ClientSettings, resources: Arc<dyn ResourceSource>) -> Self {
        let client = build_secure_client(&settings, resources.as_ref()).map_err(|e| {
            tracing::error!(kind = %e.kind(), error = %e, "startup client unavailable");
            StartupFailure::from(&e)
        });
        if client.is_ok() {
            tracing::info!(url = %settings.url, "startup client ready");
        }

        Self {
            settings: Arc::new(settings),
            resources,
            client: Arc::new(client),
        }
    }
}

/// Loads both stores from `resources` and builds a client for `settings.url`.
///
/// # Errors
/// Store and TLS failures as reported by [`mtls_http`].
pub fn build_secure_client(
    settings: &ClientSettings,
    resources: &dyn ResourceSource,
) -> Result<SecureClient, MtlsError> {
    let key_store = load_store_from(
        resources,
        &settings.key_store,
        settings.key_store_password.expose(),
    )?;
    let trust_store = load_store_from(
        resources,
        &settings.trust_store,
        settings.trust_store_password.expose(),
    )?;

    let identity = ClientIdentity::new(key_store, settings.key_store_password.clone());
    let trust = TrustPolicy::new(trust_store);

    SecureClient::builder(SecureClientConfig::new(&settings.url, identity, trust))
        .timeout(settings.request_timeout)
        .connect_timeout(settings.connect_timeout)
        .build()
}
