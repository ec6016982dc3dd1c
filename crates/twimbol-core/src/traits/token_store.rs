//! Token store trait.

use std::fmt::Debug;
use std::sync::Arc;

use crate::{AccessToken, RefreshToken, Result};

/// Process-wide storage for the session token pair.
///
/// Implementations must make every write visible to reads that happen after
/// it returns: a request built after a refresh completes must observe the new
/// access token. Durable implementations persist across process restarts.
pub trait TokenStore: Send + Sync + Debug {
    /// Returns the current access token, if any.
    fn access_token(&self) -> Option<AccessToken>;

    /// Returns the current refresh token, if any.
    fn refresh_token(&self) -> Option<RefreshToken>;

    /// Replaces the access token.
    fn set_access_token(&self, token: AccessToken) -> Result<()>;

    /// Replaces the refresh token.
    fn set_refresh_token(&self, token: RefreshToken) -> Result<()>;

    /// Removes both tokens.
    ///
    /// Durable stores drop their cached tokens even when the write fails.
    fn clear(&self) -> Result<()>;

    /// Replaces the whole token pair, as done after a successful login.
    ///
    /// A `None` refresh token leaves the session without one; a refresh
    /// token from an earlier session is never carried over.
    fn set_tokens(&self, access: AccessToken, refresh: Option<RefreshToken>) -> Result<()> {
        self.clear()?;
        self.set_access_token(access)?;
        if let Some(refresh) = refresh {
            self.set_refresh_token(refresh)?;
        }
        Ok(())
    }

    /// Returns true if an access token is present.
    fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }
}

impl<T: TokenStore + ?Sized> TokenStore for Arc<T> {
    fn access_token(&self) -> Option<AccessToken> {
        (**self).access_token()
    }

    fn refresh_token(&self) -> Option<RefreshToken> {
        (**self).refresh_token()
    }

    fn set_access_token(&self, token: AccessToken) -> Result<()> {
        (**self).set_access_token(token)
    }

    fn set_refresh_token(&self, token: RefreshToken) -> Result<()> {
        (**self).set_refresh_token(token)
    }

    fn clear(&self) -> Result<()> {
        (**self).clear()
    }

    fn set_tokens(&self, access: AccessToken, refresh: Option<RefreshToken>) -> Result<()> {
        (**self).set_tokens(access, refresh)
    }
}
