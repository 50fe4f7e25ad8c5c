use std::time::Duration;
use thiserror::Error;

/// Boxed error used for transport-level failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Stable classification of a failed call.
///
/// Callers match on this to decide user-facing messaging without relying on
/// the (unstable) message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The transport could not complete the exchange
    Network,
    /// The call's own deadline elapsed
    Timeout,
    /// The caller's cancellation token fired
    Cancelled,
    /// The server answered outside the 2xx range
    HttpStatus,
    /// The outgoing payload could not be serialized
    Encoding,
    /// The response body could not be parsed per its content type
    Decoding,
}

impl ErrorKind {
    /// Stable lowercase name, e.g. `"http_status"`
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
            Self::HttpStatus => "http_status",
            Self::Encoding => "encoding",
            Self::Decoding => "decoding",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single failure type every call resolves to.
///
/// No transport-layer error escapes a call unclassified: DNS failures,
/// refused connections, malformed URLs and invalid header values all surface
/// as [`FetchError::Network`].
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FetchError {
    /// Transport error (DNS, connect, TLS, malformed request, oversized body)
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The per-call timeout elapsed before the exchange finished
    #[error("Request aborted (timeout after {timeout:?}): {method} {url}")]
    Timeout {
        method: http::Method,
        url: String,
        timeout: Duration,
    },

    /// The caller-supplied cancellation token fired
    #[error("Request aborted (cancelled): {method} {url}")]
    Cancelled { method: http::Method, url: String },

    /// HTTP non-2xx status
    ///
    /// `message` is `"<status> <reason>"`, followed by `" - <detail>"` when a
    /// detail could be extracted from the error body.
    #[error("HTTP error: {message}")]
    HttpStatus {
        status: http::StatusCode,
        message: String,
        /// Error body preview, absent when it could not be read
        raw_body: Option<String>,
    },

    /// Request payload serialization failed; no request was sent
    #[error("Failed to encode request body: {message}")]
    Encoding { message: String },

    /// Response body did not match its declared content type
    #[error("Failed to parse JSON response from {url}: {message}")]
    Decoding { url: String, message: String },
}

impl FetchError {
    /// Classification of this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } => ErrorKind::Network,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::HttpStatus { .. } => ErrorKind::HttpStatus,
            Self::Encoding { .. } => ErrorKind::Encoding,
            Self::Decoding { .. } => ErrorKind::Decoding,
        }
    }

    /// Response status, for [`ErrorKind::HttpStatus`] only
    #[must_use]
    pub fn status(&self) -> Option<http::StatusCode> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw error body, for [`ErrorKind::HttpStatus`] only
    #[must_use]
    pub fn raw_body(&self) -> Option<&str> {
        match self {
            Self::HttpStatus { raw_body, .. } => raw_body.as_deref(),
            _ => None,
        }
    }

    /// A [`FetchError::Network`] without an underlying cause, for transports
    /// that reject a request themselves
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }
}

/// Errors raised while constructing a [`FetchClient`](crate::FetchClient).
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BuildError {
    /// TLS connector could not be initialised
    #[error("TLS error: {0}")]
    Tls(#[source] BoxError),

    /// A default header (or the user agent) is not a valid HTTP header
    #[error("Invalid default header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },
}
