use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use http::{Request, Response};
use http_body_util::Empty;
use hyper::body::Incoming;
use tower::{Service, ServiceExt};
use tower::buffer::Buffer;

use crate::builder::SecureClientBuilder;
use crate::config::SecureClientConfig;
use crate::error::MtlsError;
use crate::response::checked_body;

/// Type alias for the future type of the inner service
pub type ServiceFuture =
    Pin<Box<dyn Future<Output = Result<Response<Incoming>, MtlsError>> + Send>>;

/// Type alias for the buffered service
pub type BufferedService = Buffer<Request<Empty<Bytes>>, ServiceFuture>;

/// HTTPS client bound to one base URL, presenting a client certificate and
/// trusting only the configured anchors.
///
/// Each call is a single GET attempt; nothing is retried. Calls share no
/// mutable state, so the client is `Clone + Send + Sync` and cloning is cheap.
///
/// # Example
///
/// ```ignore
/// let identity = ClientIdentity::new(load_store(&keystore, "secret")?, "secret");
/// let trust = TrustPolicy::new(load_store(&truststore, "changeit")?);
/// let client = build_client(SecureClientConfig::new("https://localhost:8443", identity, trust))?;
///
/// let body = client.call_path("/server").await?;
/// ```
#[derive(Clone)]
pub struct SecureClient {
    pub(crate) service: BufferedService,
    pub(crate) base_url: String,
    pub(crate) request_timeout: Duration,
    pub(crate) max_body_size: usize,
}

impl SecureClient {
    /// Create a builder for the given configuration
    #[must_use]
    pub fn builder(config: SecureClientConfig) -> SecureClientBuilder {
        SecureClientBuilder::new(config)
    }

    /// Base URL without trailing slash
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET the base URL's root resource and return the body as text.
    ///
    /// # Errors
    /// See [`call_path`](Self::call_path).
    pub async fn call(&self) -> Result<String, MtlsError> {
        self.call_path("/").await
    }

    /// GET `path` relative to the base URL and return the body as text.
    ///
    /// The body is decoded as UTF-8, replacing invalid sequences.
    ///
    /// # Errors
    /// - [`MtlsError::Handshake`] if either side rejects the other's certificate
    /// - [`MtlsError::Connection`] if the server is unreachable or the call times out
    /// - [`MtlsError::UnexpectedStatus`] for non-2xx responses
    /// - [`MtlsError::BodyTooLarge`] if the body exceeds the configured limit
    /// - [`MtlsError::InvalidUrl`] if `path` does not form a valid URL
    #[tracing::instrument(level = "debug", skip(self), fields(base_url = %self.base_url))]
    pub async fn call_path(&self, path: &str) -> Result<String, MtlsError> {
        let deadline = tokio::time::Instant::now() + self.request_timeout;
        let url = self.resolve(path);

        let request = Request::get(url.as_str())
            .body(Empty::new())
            .map_err(|e| MtlsError::InvalidUrl {
                url,
                reason: e.to_string(),
            })?;

        let mut service = self.service.clone();
        let response = service
            .ready()
            .await
            .map_err(map_buffer_error)?
            .call(request)
            .await
            .map_err(map_buffer_error)?;
        tracing::debug!(
            status = response.status().as_u16(),
            version = ?response.version(),
            "response received"
        );

        let body = tokio::time::timeout_at(deadline, checked_body(response, self.max_body_size))
            .await
            .map_err(|elapsed| MtlsError::Connection {
                detail: format!(
                    "response body not received within {} ms",
                    self.request_timeout.as_millis()
                ),
                source: Box::new(elapsed),
            })??;

        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    fn resolve(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }
}

impl fmt::Debug for SecureClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureClient")
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .field("max_body_size", &self.max_body_size)
            .finish_non_exhaustive()
    }
}

/// Map buffer errors to `MtlsError`
///
/// Errors from the inner service arrive boxed and are unwrapped. Anything
/// else means the buffer worker is gone.
fn map_buffer_error(err: tower::BoxError) -> MtlsError {
    match err.downcast::<MtlsError>() {
        Ok(mtls) => *mtls,
        Err(err) => {
            tracing::error!(error = %err, "client worker closed unexpectedly");
            MtlsError::Connection {
                detail: "client worker is no longer running".to_owned(),
                source: err,
            }
        }
    }
}
