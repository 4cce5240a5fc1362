use bytes::Bytes;
use http::Response;
use http_body_util::BodyExt;

use crate::error::{BoxError, MtlsError};
use crate::security::ERROR_BODY_PREVIEW_LIMIT;
use crate::transport::classify_transport_error;

/// Reads a response body after checking the status.
///
/// Non-2xx statuses become [`MtlsError::UnexpectedStatus`] with at most
/// [`ERROR_BODY_PREVIEW_LIMIT`] bytes of the body as lossy UTF-8.
pub(crate) async fn checked_body<B>(
    response: Response<B>,
    max_body_size: usize,
) -> Result<Bytes, MtlsError>
where
    B: http_body::Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let status = response.status();

    if !status.is_success() {
        let preview_limit = max_body_size.min(ERROR_BODY_PREVIEW_LIMIT);
        let body = match read_body_limited(response, preview_limit).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(MtlsError::BodyTooLarge { .. }) => "<body too large for preview>".to_owned(),
            Err(e) => return Err(e),
        };
        tracing::debug!(status = status.as_u16(), "server answered with non-success status");
        return Err(MtlsError::UnexpectedStatus { status, body });
    }

    read_body_limited(response, max_body_size).await
}

/// Collects the body, failing as soon as more than `limit` bytes arrive.
pub(crate) async fn read_body_limited<B>(
    response: Response<B>,
    limit: usize,
) -> Result<Bytes, MtlsError>
where
    B: http_body::Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let (_parts, body) = response.into_parts();

    let mut collected = Vec::new();
    let mut body = std::pin::pin!(body);

    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(|e| classify_transport_error(e.into()))?;
        if let Some(chunk) = frame.data_ref() {
            if collected.len() + chunk.len() > limit {
                return Err(MtlsError::BodyTooLarge {
                    limit,
                    actual: collected.len() + chunk.len(),
                });
            }
            collected.extend_from_slice(chunk);
        }
    }

    Ok(Bytes::from(collected))
}
