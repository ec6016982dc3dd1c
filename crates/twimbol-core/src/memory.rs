//! In-memory token store.

use std::sync::{PoisonError, RwLock};

use crate::traits::TokenStore;
use crate::{AccessToken, RefreshToken, Result};

/// The token pair held by a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionTokens {
    pub access_token: Option<AccessToken>,
    pub refresh_token: Option<RefreshToken>,
}

/// A non-durable [`TokenStore`] backed by a lock-guarded token pair.
///
/// Suitable for tests and short-lived processes.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<SessionTokens>,
}

impl MemoryTokenStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given tokens.
    pub fn with_tokens(access: Option<AccessToken>, refresh: Option<RefreshToken>) -> Self {
        Self {
            tokens: RwLock::new(SessionTokens {
                access_token: access,
                refresh_token: refresh,
            }),
        }
    }

    /// Returns a copy of the current token pair.
    pub fn snapshot(&self) -> SessionTokens {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update(&self, f: impl FnOnce(&mut SessionTokens)) {
        let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut tokens);
    }
}

impl TokenStore for MemoryTokenStore {
    fn access_token(&self) -> Option<AccessToken> {
        self.snapshot().access_token
    }

    fn refresh_token(&self) -> Option<RefreshToken> {
        self.snapshot().refresh_token
    }

    fn set_access_token(&self, token: AccessToken) -> Result<()> {
        self.update(|t| t.access_token = Some(token));
        Ok(())
    }

    fn set_refresh_token(&self, token: RefreshToken) -> Result<()> {
        self.update(|t| t.refresh_token = Some(token));
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.update(|t| *t = SessionTokens::default());
        Ok(())
    }

    fn set_tokens(&self, access: AccessToken, refresh: Option<RefreshToken>) -> Result<()> {
        self.update(|t| {
            t.access_token = Some(access);
            t.refresh_token = refresh;
        });
        Ok(())
    }
}
