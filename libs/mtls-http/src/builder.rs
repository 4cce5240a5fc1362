use std::time::Duration;

use bytes::Bytes;
use http::header::{ACCEPT, USER_AGENT};
use http::{HeaderMap, HeaderValue};
use http_body_util::Empty;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use tower::buffer::Buffer;
use tower::timeout::TimeoutLayer;
use tower::{ServiceBuilder, ServiceExt};

use crate::client::{BufferedService, SecureClient};
use crate::config::SecureClientConfig;
use crate::error::MtlsError;
use crate::layers::DefaultHeadersLayer;
use crate::tls;
use crate::transport::map_stack_error;

/// Builder for a [`SecureClient`].
///
/// Starts from a [`SecureClientConfig`]; the setters adjust its transport
/// tunables.
pub struct SecureClientBuilder {
    config: SecureClientConfig,
}

impl SecureClientBuilder {
    #[must_use]
    pub fn new(config: SecureClientConfig) -> Self {
        Self { config }
    }

    /// Set the whole-request timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.transport.request_timeout = timeout;
        self
    }

    /// Set the TCP connect timeout
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.transport.connect_timeout = timeout;
        self
    }

    /// Set the user agent sent with every call
    #[must_use]
    pub fn user_agent(mut self, user_agent: HeaderValue) -> Self {
        self.config.transport.user_agent = user_agent;
        self
    }

    /// Set the maximum response body size
    #[must_use]
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.transport.max_body_size = size;
        self
    }

    /// Set the request queue capacity
    ///
    /// A capacity of 0 is clamped to 1; tower's `Buffer` panics on 0.
    #[must_use]
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.config.transport.buffer_capacity = capacity.max(1);
        self
    }

    /// Build the client.
    ///
    /// Must be called within a tokio runtime: the request queue spawns its
    /// worker task here.
    ///
    /// # Errors
    /// - [`MtlsError::InvalidUrl`] if the base URL is not an absolute `https://` URL
    /// - [`MtlsError::TlsContext`] if identity and trust material cannot form a TLS context
    pub fn build(self) -> Result<SecureClient, MtlsError> {
        let base_url = normalize_base_url(&self.config.base_url)?;
        let tls_config = tls::mtls_client_config(&self.config.identity, &self.config.trust)?;
        let transport = self.config.transport;

        let https = build_https_connector(tls_config, transport.connect_timeout);

        let mut client_builder = Client::builder(TokioExecutor::new());
        // pool_idle_timeout has no effect without a pool timer
        client_builder
            .pool_timer(TokioTimer::new())
            .pool_idle_timeout(transport.pool_idle_timeout);
        let hyper_client = client_builder.build::<_, Empty<Bytes>>(https);

        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("text/plain"));
        default_headers.insert(USER_AGENT, transport.user_agent);

        // Request flow: Buffer → ErrorMapping → Timeout → DefaultHeaders → hyper_client
        let timeout = transport.request_timeout;
        let service = ServiceBuilder::new()
            .layer(TimeoutLayer::new(timeout))
            .layer(DefaultHeadersLayer::new(default_headers))
            .service(hyper_client)
            .map_err(move |e: tower::BoxError| map_stack_error(e, timeout))
            .boxed_clone();

        let service: BufferedService = Buffer::new(service, transport.buffer_capacity.max(1));

        tracing::debug!(
            base_url = %base_url,
            request_timeout_ms = timeout.as_millis(),
            connect_timeout_ms = transport.connect_timeout.as_millis(),
            "mTLS client built"
        );

        Ok(SecureClient {
            service,
            base_url,
            request_timeout: timeout,
            max_body_size: transport.max_body_size,
        })
    }
}

/// Builds a client from a complete configuration.
///
/// # Errors
/// See [`SecureClientBuilder::build`].
pub fn build_client(config: SecureClientConfig) -> Result<SecureClient, MtlsError> {
    SecureClientBuilder::new(config).build()
}

/// Checks that `url` is an absolute `https://` URL with a host and no query,
/// and strips trailing slashes so paths can be appended.
fn normalize_base_url(url: &str) -> Result<String, MtlsError> {
    let invalid = |reason: &str| MtlsError::InvalidUrl {
        url: url.to_owned(),
        reason: reason.to_owned(),
    };

    let uri: http::Uri = url.parse().map_err(|e: http::uri::InvalidUri| MtlsError::InvalidUrl {
        url: url.to_owned(),
        reason: e.to_string(),
    })?;

    match uri.scheme_str() {
        Some("https") => {}
        Some(_) => return Err(invalid("only https:// URLs are supported")),
        None => return Err(invalid("missing scheme")),
    }
    if uri.host().is_none_or(str::is_empty) {
        return Err(invalid("missing host"));
    }
    if uri.query().is_some() {
        return Err(invalid("base URL must not carry a query"));
    }

    Ok(url.trim_end_matches('/').to_owned())
}

/// HTTPS-only connector that negotiates HTTP/2 or HTTP/1.1 through ALPN.
fn build_https_connector(
    tls_config: rustls::ClientConfig,
    connect_timeout: Duration,
) -> HttpsConnector<HttpConnector> {
    let mut http = HttpConnector::new();
    http.enforce_http(false);
    http.set_connect_timeout(Some(connect_timeout));
    http.set_nodelay(true);

    hyper_rustls::HttpsConnectorBuilder::new()
        .with_tls_config(tls_config)
        .https_only()
        .enable_all_versions()
        .wrap_connector(http)
}
