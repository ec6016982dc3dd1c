//! Request path type.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, InvalidInputError};

/// A request path relative to the configured [`ApiUrl`](super::ApiUrl).
///
/// Paths must start with `/` and may carry a query string
/// (`/api/reels/?page=2`). Two paths *match* when their routes are equal,
/// where the route is the path with any query string removed and trailing
/// slashes ignored. Route matching is how the client recognises the login and
/// refresh endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ApiPath(String);

impl ApiPath {
    /// Create a new path, validating the format.
    pub fn new(s: impl AsRef<str>) -> Result<Self, Error> {
        let s = s.as_ref();

        let invalid = |reason: &str| -> Error {
            InvalidInputError::ApiPath {
                value: s.to_string(),
                reason: reason.to_string(),
            }
            .into()
        };

        if !s.starts_with('/') {
            return Err(invalid("must start with '/'"));
        }
        if s.starts_with("//") || s.contains("://") {
            return Err(invalid("must be relative to the API origin"));
        }
        if s.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(invalid("must not contain whitespace"));
        }
        if s.contains('#') {
            return Err(invalid("must not contain a fragment"));
        }

        Ok(Self(s.to_string()))
    }

    /// Create a path from a compile-time constant.
    ///
    /// # Panics
    ///
    /// Panics if `s` is not a valid path.
    pub fn from_static(s: &'static str) -> Self {
        match Self::new(s) {
            Ok(path) => path,
            Err(e) => panic!("invalid static API path: {e}"),
        }
    }

    /// Returns the full path, including any query string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the route: the path without query string or trailing slash.
    pub fn route(&self) -> &str {
        let path = self.0.split('?').next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        if trimmed.is_empty() { "/" } else { trimmed }
    }

    /// Returns true if both paths address the same route.
    pub fn matches(&self, other: &ApiPath) -> bool {
        self.route() == other.route()
    }
}

impl fmt::Display for ApiPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ApiPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for ApiPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
