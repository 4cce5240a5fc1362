use std::time::Duration;

use http::HeaderValue;

use crate::identity::{ClientIdentity, TrustPolicy};

/// Default User-Agent for outgoing calls
pub const DEFAULT_USER_AGENT: &str = concat!("mtls-http/", env!("CARGO_PKG_VERSION"));

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Transport tunables of a [`SecureClient`](crate::SecureClient).
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Whole-request timeout, covering connect, handshake and body (default: 30 seconds)
    pub request_timeout: Duration,

    /// TCP connect timeout (default: 10 seconds)
    pub connect_timeout: Duration,

    /// Sent unless a request already carries one
    pub user_agent: HeaderValue,

    /// Responses above this size fail with `BodyTooLarge` (default: 10 MiB)
    pub max_body_size: usize,

    /// Requests that may queue for the client's worker before callers wait
    ///
    /// Clamped to at least 1.
    pub buffer_capacity: usize,

    /// Idle pooled connections are closed after this long
    pub pool_idle_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            user_agent: HeaderValue::from_static(DEFAULT_USER_AGENT),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            buffer_capacity: 64,
            pool_idle_timeout: Duration::from_secs(90),
        }
    }
}

/// Everything needed to build one client: where to connect, who we are,
/// whom we trust.
#[derive(Debug)]
pub struct SecureClientConfig {
    pub base_url: String,
    pub identity: ClientIdentity,
    pub trust: TrustPolicy,
    pub transport: TransportConfig,
}

impl SecureClientConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>, identity: ClientIdentity, trust: TrustPolicy) -> Self {
        Self {
            base_url: base_url.into(),
            identity,
            trust,
            transport: TransportConfig::default(),
        }
    }
}
