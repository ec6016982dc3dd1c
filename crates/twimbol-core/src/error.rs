//! Error types for the Twimbol client.
//!
//! A single [`Error`] with explicit variants for transport, authentication,
//! protocol, input validation and token storage failures. HTTP error statuses
//! returned by the API are *not* errors at the request level; they only become
//! a [`ProtocolError`] when a caller asks for it via
//! [`ApiResponse::error_for_status`](crate::ApiResponse::error_for_status).

use std::fmt;
use thiserror::Error;

/// The unified error type for Twimbol client operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Network transport errors (connection, timeout, body read).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Authentication errors (missing or rejected credentials).
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Protocol errors (unexpected status or response body).
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Input validation errors (bad URL, path, header).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),

    /// Token store failures.
    #[error("token store error: {0}")]
    Store(#[from] StoreError),

    /// The caller cancelled the request before it completed.
    #[error("request cancelled")]
    Cancelled,
}

impl Error {
    /// Returns true if this error came from the network layer.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }

    /// Returns true if this error was caused by caller cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

/// Transport-level errors. No HTTP response was received.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection could not be established.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out: {message}")]
    Timeout { message: String },

    /// Reading the response body failed.
    #[error("failed to read response body: {message}")]
    Body { message: String },

    /// Any other HTTP client failure.
    #[error("HTTP error: {message}")]
    Http { message: String },
}

/// Authentication-related errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No refresh token is stored, so the session cannot be renewed.
    #[error("no refresh token available")]
    RefreshTokenMissing,

    /// The refresh endpoint answered with a non-success status.
    #[error("refresh rejected with HTTP {status}")]
    RefreshRejected { status: u16 },

    /// The login endpoint rejected the supplied credentials.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// A token endpoint answered 2xx but without a usable token.
    #[error("malformed token response: {reason}")]
    MalformedTokenResponse { reason: String },
}

/// A non-success HTTP response surfaced as an error.
#[derive(Debug, Clone)]
pub struct ProtocolError {
    /// HTTP status code.
    pub status: u16,
    /// Server-provided detail (the `detail` field of the error body), if any.
    pub detail: Option<String>,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(ref detail) = self.detail {
            write!(f, ": {}", detail)?;
        }
        Ok(())
    }
}

impl std::error::Error for ProtocolError {}

impl ProtocolError {
    /// Create a new protocol error.
    pub fn new(status: u16, detail: Option<String>) -> Self {
        Self { status, detail }
    }

    /// Check if this is an authentication error.
    pub fn is_auth_error(&self) -> bool {
        self.status == 401
    }
}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid API base URL.
    #[error("invalid API URL '{value}': {reason}")]
    ApiUrl { value: String, reason: String },

    /// Invalid request path.
    #[error("invalid API path '{value}': {reason}")]
    ApiPath { value: String, reason: String },

    /// Invalid header name or value.
    #[error("invalid header '{name}': {reason}")]
    Header { name: String, reason: String },

    /// Generic invalid input.
    #[error("invalid input: {message}")]
    Other { message: String },
}

/// Token store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted session could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store lock could not be acquired.
    #[error("lock error: {message}")]
    Lock { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_error_display_includes_detail() {
        let err = ProtocolError::new(403, Some("Not allowed".to_string()));
        assert_eq!(err.to_string(), "HTTP 403: Not allowed");
        assert!(!err.is_auth_error());
    }

    #[test]
    fn protocol_error_display_without_detail() {
        let err = ProtocolError::new(401, None);
        assert_eq!(err.to_string(), "HTTP 401");
        assert!(err.is_auth_error());
    }

    #[test]
    fn transport_classification() {
        let err: Error = TransportError::Connection {
            message: "refused".to_string(),
        }
        .into();
        assert!(err.is_transport());
        assert!(!err.is_cancelled());
        assert!(Error::Cancelled.is_cancelled());
    }
}
