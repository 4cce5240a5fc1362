//! Classification of transport failures into handshake and connection errors.

use std::error::Error;
use std::io;
use std::time::Duration;

use crate::error::{BoxError, MtlsError};

/// Prefix of rustls' message for an alert sent by the peer
const ALERT_RECEIVED: &str = "received fatal alert";

/// Maps an error from the tower stack to [`MtlsError`].
///
/// Errors already typed as `MtlsError` pass through. A request timeout
/// becomes `Connection`. Anything with a rustls error in its chain is a
/// `Handshake` failure, as is a fatal alert from the peer. Everything else
/// is a `Connection` failure.
pub(crate) fn map_stack_error(err: BoxError, timeout: Duration) -> MtlsError {
    if err.is::<tower::timeout::error::Elapsed>() {
        return MtlsError::Connection {
            detail: format!("request timed out after {} ms", timeout.as_millis()),
            source: err,
        };
    }

    match err.downcast::<MtlsError>() {
        Ok(mtls) => *mtls,
        Err(other) => classify_transport_error(other),
    }
}

pub(crate) fn classify_transport_error(err: BoxError) -> MtlsError {
    let detail = find_tls_error(err.as_ref())
        .map(ToString::to_string)
        .or_else(|| find_alert_message(err.as_ref()));
    if let Some(detail) = detail {
        return MtlsError::Handshake {
            detail,
            source: err,
        };
    }

    let detail = root_cause(err.as_ref()).to_string();
    MtlsError::Connection {
        detail,
        source: err,
    }
}

/// Walks the source chain looking for a rustls error.
///
/// `io::Error::source` skips the wrapped error itself, so custom I/O errors
/// are unwrapped with `get_ref` as well.
fn find_tls_error<'a>(err: &'a (dyn Error + 'static)) -> Option<&'a rustls::Error> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(tls) = e.downcast_ref::<rustls::Error>() {
            return Some(tls);
        }
        if let Some(inner) = e.downcast_ref::<io::Error>().and_then(io::Error::get_ref)
            && let Some(tls) = find_tls_error(inner)
        {
            return Some(tls);
        }
        current = e.source();
    }
    None
}

/// Finds a fatal alert by its message.
///
/// Under TLS 1.3 the server checks the client certificate after the client
/// has finished its side of the handshake, so the alert arrives on the first
/// read. HTTP/2 connection errors wrap that I/O error without exposing it as
/// a source, leaving only its text.
fn find_alert_message(err: &(dyn Error + 'static)) -> Option<String> {
    let mut current = Some(err);
    while let Some(e) = current {
        let message = e.to_string();
        if let Some(start) = message.find(ALERT_RECEIVED) {
            return Some(message[start..].to_owned());
        }
        current = e.source();
    }
    None
}

fn root_cause<'a>(err: &'a (dyn Error + 'static)) -> &'a (dyn Error + 'static) {
    let mut current = err;
    while let Some(next) = current.source() {
        current = next;
    }
    current
}
