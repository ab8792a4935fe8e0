use std::time::Duration;

use http::{Method, StatusCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("message error: {source}")]
    MessageError {
        #[from]
        source: MessageError,
    },

    #[error("entity error: {source}")]
    EntityError {
        #[from]
        source: EntityError,
    },

    #[error("uri error: {source}")]
    UriError {
        #[from]
        source: IllegalUriError,
    },
}

/// A message value that would break one of the request/response invariants.
///
/// These describe programmer errors: the caller tried to build a message that
/// must not exist, so nothing inside the crate retries or repairs them.
#[derive(Error, Debug)]
pub enum MessageError {
    #[error("`uri` must not be empty")]
    EmptyUri,

    #[error(r#"`uri` must have scheme "http", "https", "ws", "wss" or no scheme, found "{scheme}""#)]
    InvalidScheme { scheme: String },

    #[error("invalid uri: {reason}")]
    InvalidUri { reason: String },

    #[error("requests with method '{method}' must have an empty entity")]
    EntityNotAccepted { method: Method },

    #[error("responses with status code '{status}' must have an empty entity")]
    EntityNotAllowed { status: StatusCode },

    #[error("HTTP/1.0 {kind} must not have a chunked entity")]
    ChunkedEntityOnHttp10 { kind: &'static str },

    #[error("unsupported http protocol: {version:?}")]
    UnsupportedProtocol { version: http::Version },

    #[error("invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },
}

impl MessageError {
    pub fn invalid_scheme<S: ToString>(scheme: S) -> Self {
        Self::InvalidScheme { scheme: scheme.to_string() }
    }

    pub fn invalid_uri<S: ToString>(str: S) -> Self {
        Self::InvalidUri { reason: str.to_string() }
    }

    pub fn invalid_header<N: ToString, S: ToString>(name: N, str: S) -> Self {
        Self::InvalidHeader { name: name.to_string(), reason: str.to_string() }
    }
}

/// The effective request uri could not be established (RFC 7230 §5.5).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{summary}")]
pub struct IllegalUriError {
    summary: String,
    detail: String,
}

impl IllegalUriError {
    pub fn new<S: Into<String>, D: Into<String>>(summary: S, detail: D) -> Self {
        Self { summary: summary.into(), detail: detail.into() }
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

/// Failures of the entity layer, reported through async results.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntityError {
    #[error("entity stream has already been consumed")]
    AlreadyConsumed,

    #[error("entity was not fully received within {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("entity size {actual} exceeds the limit {limit}")]
    TooLarge { limit: u64, actual: u64 },

    #[error("entity stream failed: {reason}")]
    Stream { reason: String },
}

impl EntityError {
    pub fn stream<S: ToString>(str: S) -> Self {
        Self::Stream { reason: str.to_string() }
    }

    pub fn too_large(limit: u64, actual: u64) -> Self {
        Self::TooLarge { limit, actual }
    }

    /// Returns true if the entity exceeded a configured size limit.
    #[inline]
    pub fn is_too_large(&self) -> bool {
        matches!(self, EntityError::TooLarge { .. })
    }
}
