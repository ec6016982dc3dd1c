//! Access token refresh.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use twimbol_core::error::AuthError;
use twimbol_core::{AccessToken, ApiPath, ApiRequest, ApiUrl, Method, Result, TokenStore};

use crate::transport::{build_request, send};

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: Option<String>,
}

/// Everything a refresh call needs, detached from the client so a shared
/// refresh future does not keep the client alive.
#[derive(Clone)]
pub(crate) struct Refresher {
    pub(crate) http: reqwest::Client,
    pub(crate) base_url: ApiUrl,
    pub(crate) refresh_path: ApiPath,
    pub(crate) store: Arc<dyn TokenStore>,
}

impl Refresher {
    /// Exchanges the stored refresh token for a new access token.
    ///
    /// Fails without a network call when no refresh token is stored. Never
    /// clears the session; the caller decides what a failure means.
    #[instrument(skip(self), fields(path = %self.refresh_path))]
    pub(crate) async fn refresh(&self) -> Result<AccessToken> {
        let Some(refresh_token) = self.store.refresh_token() else {
            debug!("No refresh token stored");
            return Err(AuthError::RefreshTokenMissing.into());
        };

        info!("Refreshing access token");

        let request = ApiRequest::new(Method::POST, self.refresh_path.clone()).json(
            &RefreshRequest {
                refresh: refresh_token.as_str(),
            },
        )?;

        // No access token is attached: the refresh endpoint only ever sees
        // the refresh token.
        let builder = build_request(&self.http, &self.base_url, &request, None)?;
        let response = send(builder).await?;

        if !response.is_success() {
            let status = response.status().as_u16();
            warn!(status, "Refresh rejected");
            return Err(AuthError::RefreshRejected { status }.into());
        }

        let access = response
            .json::<RefreshResponse>()
            .ok()
            .and_then(|body| body.access)
            .filter(|access| !access.is_empty())
            .ok_or_else(|| AuthError::MalformedTokenResponse {
                reason: "missing 'access' field".to_string(),
            })?;

        let access = AccessToken::new(access);
        self.store.set_access_token(access.clone())?;

        debug!("Access token refreshed");
        Ok(access)
    }
}

struct InflightRefresh {
    id: u64,
    future: Shared<BoxFuture<'static, Option<AccessToken>>>,
}

/// Collapses concurrent refreshes into one network call.
#[derive(Default)]
pub(crate) struct RefreshGate {
    next_id: AtomicU64,
    inflight: Mutex<Option<InflightRefresh>>,
}

impl RefreshGate {
    /// Joins the in-flight refresh or starts one.
    ///
    /// Every waiter receives the same outcome. The slot is emptied once the
    /// refresh resolves so a later expiry triggers a fresh call.
    pub(crate) async fn refresh(&self, refresher: &Refresher) -> Option<AccessToken> {
        let (id, future) = {
            let mut slot = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
            match slot.as_ref() {
                Some(inflight) => {
                    debug!(refresh_id = inflight.id, "Joining in-flight refresh");
                    (inflight.id, inflight.future.clone())
                }
                None => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let refresher = refresher.clone();
                    let future = async move {
                        match refresher.refresh().await {
                            Ok(token) => Some(token),
                            Err(e) => {
                                warn!(error = %e, "Token refresh failed");
                                None
                            }
                        }
                    }
                    .boxed()
                    .shared();
                    debug!(refresh_id = id, "Starting shared refresh");
                    *slot = Some(InflightRefresh {
                        id,
                        future: future.clone(),
                    });
                    (id, future)
                }
            }
        };

        let outcome = future.await;

        let mut slot = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|inflight| inflight.id == id) {
            *slot = None;
        }

        outcome
    }

    #[cfg(test)]
    pub(crate) fn is_idle(&self) -> bool {
        self.inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}
