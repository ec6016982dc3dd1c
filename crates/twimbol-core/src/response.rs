//! Buffered API responses.

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{Error, ProtocolError};
use crate::Result;

/// Error body shape used by the API (`{"detail": "..."}`).
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<String>,
}

/// A fully-read HTTP response.
///
/// Returned for every status code, including 4xx and 5xx: interpreting them
/// is left to the caller.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl ApiResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED
    }

    /// Returns the body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            Error::Protocol(ProtocolError::new(
                self.status.as_u16(),
                Some(format!("unexpected response body: {e}")),
            ))
        })
    }

    /// Converts a non-success response into a [`ProtocolError`].
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(Error::Protocol(self.protocol_error()))
        }
    }

    /// Builds a [`ProtocolError`] describing this response.
    pub fn protocol_error(&self) -> ProtocolError {
        let detail = serde_json::from_slice::<ErrorBody>(&self.body)
            .ok()
            .and_then(|b| b.detail);
        ProtocolError::new(self.status.as_u16(), detail)
    }
}
