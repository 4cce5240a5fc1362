use std::fmt;

use http::StatusCode;
use thiserror::Error;

/// Boxed cause carried by transport and TLS failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Copyable classification of an [`MtlsError`].
///
/// Callers that only need to branch on the failure class (for example to pick
/// an HTTP status) match on this instead of the full error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Certificate bundle bytes are not a valid bundle
    StoreDecode,
    /// Passphrase does not unlock the bundle
    BadPassphrase,
    /// Key material could not be composed into a TLS context
    TlsContext,
    /// Peer rejected or was rejected during the mutual handshake
    Handshake,
    /// Server unreachable, connection refused or reset, timeout
    Connection,
    /// Server answered with a non-2xx status
    UnexpectedStatus,
    /// Base URL is not an absolute `https://` URL
    InvalidUrl,
    /// Response body exceeded the configured limit
    BodyTooLarge,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StoreDecode => "StoreDecode",
            Self::BadPassphrase => "BadPassphrase",
            Self::TlsContext => "TlsContext",
            Self::Handshake => "Handshake",
            Self::Connection => "Connection",
            Self::UnexpectedStatus => "UnexpectedStatus",
            Self::InvalidUrl => "InvalidUrl",
            Self::BodyTooLarge => "BodyTooLarge",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced while loading certificate stores, building a client, or
/// performing a call.
///
/// Every variant is terminal for the request that produced it. No retries are
/// attempted by this crate.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum MtlsError {
    /// The bundle bytes could not be decoded, or decoded to nothing
    #[error("Certificate store '{store}' could not be decoded: {reason}")]
    StoreDecode {
        store: String,
        reason: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The bundle is well formed but the passphrase does not unlock it
    #[error("Passphrase does not unlock certificate store '{store}'")]
    BadPassphrase {
        store: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Identity or trust material cannot form a TLS configuration
    #[error("Failed to build TLS context: {reason}")]
    TlsContext {
        reason: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Mutual handshake failed on either side
    #[error("TLS handshake failed: {detail}")]
    Handshake {
        detail: String,
        #[source]
        source: BoxError,
    },

    /// Transport failure outside the TLS layer
    #[error("Connection failed: {detail}")]
    Connection {
        detail: String,
        #[source]
        source: BoxError,
    },

    /// HTTP non-2xx status, with a bounded preview of the response body
    #[error("HTTP {status}: {body}")]
    UnexpectedStatus { status: StatusCode, body: String },

    /// Base URL rejected before any connection attempt
    ///
    /// The `reason` field is diagnostic text for logs; match on the variant.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Response body exceeded size limit
    #[error("Response body too large: limit {limit} bytes, got {actual} bytes")]
    BodyTooLarge { limit: usize, actual: usize },
}

impl MtlsError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::StoreDecode { .. } => ErrorKind::StoreDecode,
            Self::BadPassphrase { .. } => ErrorKind::BadPassphrase,
            Self::TlsContext { .. } => ErrorKind::TlsContext,
            Self::Handshake { .. } => ErrorKind::Handshake,
            Self::Connection { .. } => ErrorKind::Connection,
            Self::UnexpectedStatus { .. } => ErrorKind::UnexpectedStatus,
            Self::InvalidUrl { .. } => ErrorKind::InvalidUrl,
            Self::BodyTooLarge { .. } => ErrorKind::BodyTooLarge,
        }
    }

    pub(crate) fn tls_context(reason: impl Into<String>) -> Self {
        Self::TlsContext {
            reason: reason.into(),
            source: None,
        }
    }

    pub(crate) fn tls_context_from(
        reason: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::TlsContext {
            reason: reason.into(),
            source: Some(source.into()),
        }
    }

    /// Re-labels store errors with the resource name they were read from.
    pub(crate) fn with_store_name(self, name: &str) -> Self {
        match self {
            Self::StoreDecode { reason, source, .. } => Self::StoreDecode {
                store: name.to_owned(),
                reason,
                source,
            },
            Self::BadPassphrase { source, .. } => Self::BadPassphrase {
                store: name.to_owned(),
                source,
            },
            other => other,
        }
    }
}
