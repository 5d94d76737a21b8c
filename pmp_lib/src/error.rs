//! Error types for Password Manager Pro lookups.

use crate::query::redact;
use thiserror::Error;

/// Base error type for PMP operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Required settings are missing or unparsable. Raised before any request is sent.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The service answered with something that is not a PMP envelope.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The service reported no matching resource or account.
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// The resource exists but policy blocks password retrieval (e.g. approval pending).
    #[error("Password unavailable: {0}")]
    PasswordUnavailable(String),

    #[error("Invalid lookup mode: {0} (expected `exact` or `regex`)")]
    InvalidMode(String),

    #[error("Invalid resource pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Raised when the request could not be completed (connection, TLS, timeout, or
/// a non-envelope error status).
#[derive(Error, Debug)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
    pub status_code: Option<u16>,
}

impl TransportError {
    pub fn new(message: impl Into<String>, status_code: Option<u16>) -> Self {
        Self {
            message: message.into(),
            status_code,
        }
    }
}

/// The request URL may carry `APP_AUTHTOKEN`, so it is re-attached only in redacted form.
impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let status_code = err.status().map(|s| s.as_u16());
        let url = err.url().map(|u| redact(u.as_str()));
        let err = err.without_url();
        let message = match url {
            Some(url) => format!("{} ({})", err, url),
            None => err.to_string(),
        };
        Self::new(message, status_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_human_readable() {
        let e = Error::ResourceNotFound("Resource not found for the given name".to_string());
        assert_eq!(
            e.to_string(),
            "Resource not found: Resource not found for the given name"
        );
        let e = Error::InvalidMode("fuzzy".to_string());
        assert!(e.to_string().contains("fuzzy"));
    }

    #[test]
    fn transport_error_keeps_status() {
        let e: Error = TransportError::new("HTTP 502", Some(502)).into();
        match e {
            Error::Transport(t) => assert_eq!(t.status_code, Some(502)),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
