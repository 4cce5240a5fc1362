use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mtls_http::{ErrorKind, MtlsError};
use serde::Serialize;

use crate::state::StartupFailure;

/// JSON body returned by the `/client` routes on failure.
#[derive(Debug, Clone, Serialize)]
pub struct Problem {
    pub kind: String,
    pub detail: String,
    pub status: u16,
}

/// Failure of a `/client` route.
#[derive(Debug)]
pub enum ApiError {
    /// Loading stores, building the client or the upstream call failed
    Upstream(MtlsError),
    /// The startup client could not be built
    ClientUnavailable(StartupFailure),
}

impl From<MtlsError> for ApiError {
    fn from(err: MtlsError) -> Self {
        Self::Upstream(err)
    }
}

/// HTTP status reported for a failure class.
///
/// Local material problems are ours (500); anything that went wrong talking
/// to the upstream server is a bad gateway (502).
#[must_use]
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Handshake
        | ErrorKind::Connection
        | ErrorKind::UnexpectedStatus
        | ErrorKind::BodyTooLarge => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Upstream(err) => status_for(err.kind()),
            Self::ClientUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn to_problem(&self) -> Problem {
        let (kind, detail) = match self {
            Self::Upstream(err) => (err.kind(), err.to_string()),
            Self::ClientUnavailable(failure) => (failure.kind, failure.detail.clone()),
        };
        Problem {
            kind: kind.to_string(),
            detail,
            status: self.status().as_u16(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let problem = self.to_problem();
        tracing::warn!(
            kind = %problem.kind,
            status = problem.status,
            detail = %problem.detail,
            "client route failed"
        );
        (status, Json(problem)).into_response()
    }
}
