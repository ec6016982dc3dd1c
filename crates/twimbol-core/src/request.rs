//! Replayable request descriptions.
//!
//! An [`ApiRequest`] owns everything needed to transmit a request, including
//! its body, so the same logical request can be sent a second time after a
//! token refresh with an identical payload.

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::Method;
use serde::Serialize;

use crate::error::InvalidInputError;
use crate::types::ApiPath;
use crate::Result;

/// Request payload.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    /// No body.
    #[default]
    Empty,
    /// A JSON document.
    Json(serde_json::Value),
    /// URL-encoded form fields.
    Form(Vec<(String, String)>),
    /// A `multipart/form-data` payload, used for media uploads.
    Multipart(Vec<MultipartField>),
}

impl RequestBody {
    pub fn is_empty(&self) -> bool {
        matches!(self, RequestBody::Empty)
    }
}

/// One part of a multipart body.
#[derive(Debug, Clone)]
pub struct MultipartField {
    pub name: String,
    pub value: MultipartValue,
}

/// Contents of a multipart part.
#[derive(Clone)]
pub enum MultipartValue {
    Text(String),
    File {
        bytes: Bytes,
        file_name: Option<String>,
        mime: Option<String>,
    },
}

impl std::fmt::Debug for MultipartValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MultipartValue::Text(text) => f.debug_tuple("Text").field(text).finish(),
            MultipartValue::File {
                bytes,
                file_name,
                mime,
            } => f
                .debug_struct("File")
                .field("len", &bytes.len())
                .field("file_name", file_name)
                .field("mime", mime)
                .finish(),
        }
    }
}

impl MultipartField {
    /// A plain text field.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: MultipartValue::Text(value.into()),
        }
    }

    /// A file field.
    pub fn file(
        name: impl Into<String>,
        bytes: impl Into<Bytes>,
        file_name: Option<String>,
        mime: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: MultipartValue::File {
                bytes: bytes.into(),
                file_name,
                mime,
            },
        }
    }
}

/// A request addressed relative to the client's API origin.
///
/// # Example
///
/// ```
/// use twimbol_core::{ApiPath, ApiRequest};
/// use http::Method;
///
/// let request = ApiRequest::new(Method::GET, ApiPath::new("/api/reels/").unwrap())
///     .query("page", "2")
///     .query("page_size", "30");
/// assert_eq!(request.query_pairs().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: ApiPath,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: RequestBody,
}

impl ApiRequest {
    /// Create a request with no query, headers or body.
    pub fn new(method: Method, path: ApiPath) -> Self {
        Self {
            method,
            path,
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
        }
    }

    /// Appends a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Sets a header, replacing any existing value.
    ///
    /// # Errors
    ///
    /// Returns an error if the name or value is not a valid HTTP header.
    pub fn header(mut self, name: &str, value: &str) -> Result<Self> {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| InvalidInputError::Header {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| InvalidInputError::Header {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    /// Sets a JSON body from any serializable value.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self> {
        let value = serde_json::to_value(value).map_err(|e| InvalidInputError::Other {
            message: format!("body is not serializable: {e}"),
        })?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    /// Sets the body.
    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &ApiPath {
        &self.path
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn request_body(&self) -> &RequestBody {
        &self.body
    }
}
