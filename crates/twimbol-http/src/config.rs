//! Client configuration.

use std::time::Duration;

use twimbol_core::{ApiPath, ApiUrl, RetryPolicy};

/// Default login endpoint.
pub const DEFAULT_LOGIN_PATH: &str = "/user/login/";

/// Default token refresh endpoint.
pub const DEFAULT_REFRESH_PATH: &str = "/api/token/refresh";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How concurrent 401 responses share refresh calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RefreshMode {
    /// Every eligible 401 performs its own refresh call. N requests that
    /// expire together produce N refresh calls.
    Independent,
    /// Concurrent 401s await one shared in-flight refresh, and a 401 that
    /// arrives after the stored token already changed retries without
    /// refreshing again.
    #[default]
    SingleFlight,
}

/// Configuration for an [`AuthenticatedClient`](crate::AuthenticatedClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub(crate) base_url: ApiUrl,
    pub(crate) login_path: ApiPath,
    pub(crate) refresh_path: ApiPath,
    pub(crate) timeout: Option<Duration>,
    pub(crate) user_agent: String,
    pub(crate) refresh_mode: RefreshMode,
}

impl ClientConfig {
    /// Configuration with default endpoints for the given API origin.
    pub fn new(base_url: ApiUrl) -> Self {
        Self {
            base_url,
            login_path: ApiPath::from_static(DEFAULT_LOGIN_PATH),
            refresh_path: ApiPath::from_static(DEFAULT_REFRESH_PATH),
            timeout: Some(DEFAULT_TIMEOUT),
            user_agent: concat!("twimbol/", env!("CARGO_PKG_VERSION")).to_string(),
            refresh_mode: RefreshMode::default(),
        }
    }

    pub fn with_login_path(mut self, path: ApiPath) -> Self {
        self.login_path = path;
        self
    }

    pub fn with_refresh_path(mut self, path: ApiPath) -> Self {
        self.refresh_path = path;
        self
    }

    /// Sets the transport timeout; `None` disables it.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_refresh_mode(mut self, mode: RefreshMode) -> Self {
        self.refresh_mode = mode;
        self
    }

    pub fn base_url(&self) -> &ApiUrl {
        &self.base_url
    }

    pub fn login_path(&self) -> &ApiPath {
        &self.login_path
    }

    pub fn refresh_path(&self) -> &ApiPath {
        &self.refresh_path
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn refresh_mode(&self) -> RefreshMode {
        self.refresh_mode
    }

    pub(crate) fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.login_path.clone(), self.refresh_path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ClientConfig::new(ApiUrl::new("https://api.twimbol.test").unwrap());
        assert_eq!(config.login_path().as_str(), DEFAULT_LOGIN_PATH);
        assert_eq!(config.refresh_path().as_str(), DEFAULT_REFRESH_PATH);
        assert_eq!(config.timeout(), Some(DEFAULT_TIMEOUT));
        assert_eq!(config.refresh_mode(), RefreshMode::SingleFlight);
        assert!(config.user_agent.starts_with("twimbol/"));
    }

    #[test]
    fn policy_uses_configured_paths() {
        let config = ClientConfig::new(ApiUrl::new("https://api.twimbol.test").unwrap())
            .with_login_path(ApiPath::new("/auth/login").unwrap())
            .with_refresh_path(ApiPath::new("/auth/refresh").unwrap());
        let policy = config.retry_policy();
        assert!(policy.is_exempt(&ApiPath::new("/auth/login/").unwrap()));
        assert!(policy.is_exempt(&ApiPath::new("/auth/refresh").unwrap()));
        assert!(!policy.is_exempt(&ApiPath::new("/user/login/").unwrap()));
    }
}
