//! Authenticated API client.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use twimbol_core::error::{AuthError, Error, TransportError};
use twimbol_core::{
    AccessToken, ApiPath, ApiRequest, ApiResponse, Method, RefreshToken, Result, RetryPolicy,
    StatusCode, Step, TokenStore,
};

use crate::config::{ClientConfig, RefreshMode};
use crate::refresh::{RefreshGate, Refresher};
use crate::transport::{build_request, send};

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, serde::Deserialize)]
struct LoginResponse {
    access: Option<String>,
    refresh: Option<String>,
}

/// HTTP client that attaches the session's bearer token to every request and
/// recovers from an expired access token.
///
/// A request answered with 401 triggers one token refresh and one retry,
/// unless it targets the login or refresh endpoint. If the refresh cannot be
/// performed the session is cleared before the original 401 is returned, so
/// callers only need to check [`is_authenticated`](Self::is_authenticated)
/// to decide whether to send the user back to login.
///
/// Clones share the same connection pool, token store and refresh gate.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use twimbol_core::{ApiUrl, MemoryTokenStore};
/// use twimbol_http::{AuthenticatedClient, ClientConfig};
///
/// # async fn example() -> Result<(), twimbol_core::Error> {
/// let config = ClientConfig::new(ApiUrl::new("https://api.twimbol.test")?);
/// let client = AuthenticatedClient::new(config, Arc::new(MemoryTokenStore::new()))?;
///
/// client.login("alice", "secret").await?;
/// let feed = client.get("/api/reels/").await?;
/// println!("{}", feed.status());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AuthenticatedClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    policy: RetryPolicy,
    http: reqwest::Client,
    store: Arc<dyn TokenStore>,
    refresher: Refresher,
    gate: RefreshGate,
}

impl AuthenticatedClient {
    /// Creates a client for the configured API origin backed by `store`.
    pub fn new(config: ClientConfig, store: Arc<dyn TokenStore>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|e| TransportError::Http {
            message: format!("failed to build HTTP client: {e}"),
        })?;

        let refresher = Refresher {
            http: http.clone(),
            base_url: config.base_url.clone(),
            refresh_path: config.refresh_path.clone(),
            store: store.clone(),
        };

        Ok(Self {
            inner: Arc::new(ClientInner {
                policy: config.retry_policy(),
                config,
                http,
                store,
                refresher,
                gate: RefreshGate::default(),
            }),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Returns the shared token store.
    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.inner.store
    }

    /// Returns true if the session holds an access token.
    pub fn is_authenticated(&self) -> bool {
        self.inner.store.is_authenticated()
    }

    /// Sends a request, refreshing the session and retrying once on 401.
    ///
    /// Every HTTP status is returned as `Ok`. `Err` means the request never
    /// produced a response (transport failure), the input was invalid, or the
    /// token store could not be updated.
    ///
    /// If clearing the session after a failed refresh cannot be persisted,
    /// the store error is returned in place of the original 401. Stores are
    /// expected to drop their in-memory tokens first, so the client is
    /// already logged out when that happens.
    #[instrument(skip(self, request), fields(method = %request.method(), path = %request.path()))]
    pub async fn request(&self, request: ApiRequest) -> Result<ApiResponse> {
        let mut machine = self.inner.policy.track(request.path());

        let sent_with = self.inner.store.access_token();
        machine.begin();
        debug!(authenticated = sent_with.is_some(), "Sending request");
        let original = self.transmit(&request, sent_with.as_ref()).await?;

        if machine.on_response(original.status()) != Step::Refresh {
            return Ok(original);
        }

        let refreshed = self.refresh_for_retry(sent_with.as_ref()).await;

        match machine.on_refresh(refreshed.is_some()) {
            Step::Retry => {
                let Some(token) = refreshed else {
                    return Ok(original);
                };
                debug!("Retrying with refreshed token");
                let retried = self.transmit(&request, Some(&token)).await?;
                machine.on_response(retried.status());
                Ok(retried)
            }
            Step::ClearSession => {
                info!("Session could not be refreshed, clearing tokens");
                self.inner.store.clear()?;
                Ok(original)
            }
            _ => Ok(original),
        }
    }

    /// Like [`request`](Self::request), but gives up with
    /// [`Error::Cancelled`] as soon as `cancel` fires.
    pub async fn request_with_cancel(
        &self,
        request: ApiRequest,
        cancel: &CancellationToken,
    ) -> Result<ApiResponse> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Request cancelled by caller");
                Err(Error::Cancelled)
            }
            result = self.request(request) => result,
        }
    }

    /// Exchanges the stored refresh token for a new access token.
    ///
    /// Fails without a network call if no refresh token is stored. The
    /// session is left untouched on failure, so this can be used for
    /// proactive refreshes.
    pub async fn refresh(&self) -> Result<AccessToken> {
        self.inner.refresher.refresh().await
    }

    async fn refresh_for_retry(&self, sent_with: Option<&AccessToken>) -> Option<AccessToken> {
        match self.inner.config.refresh_mode {
            RefreshMode::Independent => match self.refresh().await {
                Ok(token) => Some(token),
                Err(e) => {
                    warn!(error = %e, "Token refresh failed");
                    None
                }
            },
            RefreshMode::SingleFlight => {
                // Another request may already have replaced the token this
                // one was sent with.
                if let Some(current) = self.inner.store.access_token()
                    && Some(&current) != sent_with
                {
                    debug!("Access token already refreshed");
                    return Some(current);
                }
                self.inner.gate.refresh(&self.inner.refresher).await
            }
        }
    }

    async fn transmit(
        &self,
        request: &ApiRequest,
        token: Option<&AccessToken>,
    ) -> Result<ApiResponse> {
        let builder = build_request(&self.inner.http, &self.inner.config.base_url, request, token)?;
        send(builder).await
    }

    // ========================================================================
    // Session lifecycle
    // ========================================================================

    /// Authenticates against the login endpoint and stores the issued tokens.
    ///
    /// The issued pair replaces the previous session entirely: if the server
    /// returns no refresh token, none is kept. A 401 from the login endpoint
    /// never triggers a refresh.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        info!("Logging in");

        let request = ApiRequest::new(Method::POST, self.inner.config.login_path.clone())
            .json(&LoginRequest { username, password })?;
        let response = self.request(request).await?;

        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::BAD_REQUEST
        ) {
            warn!(status = response.status().as_u16(), "Login rejected");
            return Err(AuthError::InvalidCredentials.into());
        }

        let body: LoginResponse = response.error_for_status()?.json()?;
        let access = body
            .access
            .filter(|access| !access.is_empty())
            .ok_or_else(|| AuthError::MalformedTokenResponse {
                reason: "missing 'access' field".to_string(),
            })?;

        self.inner.store.set_tokens(
            AccessToken::new(access),
            body.refresh.map(RefreshToken::new),
        )?;

        debug!("Login succeeded");
        Ok(())
    }

    /// Drops the local session.
    pub fn logout(&self) -> Result<()> {
        info!("Logging out");
        self.inner.store.clear()
    }

    // ========================================================================
    // Method shorthands
    // ========================================================================

    /// Sends a request with no body.
    pub async fn send(&self, method: Method, path: &str) -> Result<ApiResponse> {
        self.request(ApiRequest::new(method, ApiPath::new(path)?))
            .await
    }

    /// Sends a request with a JSON body.
    pub async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse> {
        self.request(ApiRequest::new(method, ApiPath::new(path)?).json(body)?)
            .await
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse> {
        self.send(Method::GET, path).await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<ApiResponse> {
        self.send_json(Method::POST, path, body).await
    }

    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<ApiResponse> {
        self.send_json(Method::PUT, path, body).await
    }

    pub async fn patch<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<ApiResponse> {
        self.send_json(Method::PATCH, path, body).await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse> {
        self.send(Method::DELETE, path).await
    }

    /// GETs `path` and decodes a successful JSON response.
    pub async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        self.get(path).await?.error_for_status()?.json()
    }
}

impl std::fmt::Debug for AuthenticatedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedClient")
            .field("base_url", &self.inner.config.base_url)
            .field("refresh_mode", &self.inner.config.refresh_mode)
            .field("tokens", &"[REDACTED]")
            .finish()
    }
}
