//! Limits applied to data received from the server.

/// Maximum body preview kept in `UnexpectedStatus` errors (8 KiB).
///
/// Error bodies are only read up to this size so a misbehaving server cannot
/// make error reporting allocate without bound.
pub const ERROR_BODY_PREVIEW_LIMIT: usize = 8 * 1024;
