//! JSON file token store.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use chrono::Utc;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use twimbol_core::error::StoreError;
use twimbol_core::{AccessToken, RefreshToken, Result, SessionTokens, TokenStore};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// On-disk session layout.
#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    access_token: Option<AccessToken>,
    refresh_token: Option<RefreshToken>,
    updated_at: String,
}

/// A [`TokenStore`] persisted to a JSON file.
///
/// Tokens are cached in memory and every write goes straight to disk through
/// a temp-file rename, guarded by an advisory lock file so two processes
/// sharing a session never interleave writes. Clearing the session removes
/// the file. On Unix the file is created with `0600` permissions.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    tokens: RwLock<SessionTokens>,
}

impl FileTokenStore {
    /// Opens the store at `path`, loading any session already saved there.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let tokens = Self::load(&path)?;
        debug!(
            has_access = tokens.access_token.is_some(),
            has_refresh = tokens.refresh_token.is_some(),
            "Opened token store"
        );
        Ok(Self {
            path,
            tokens: RwLock::new(tokens),
        })
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-reads the file, picking up changes made by another process.
    pub fn reload(&self) -> Result<()> {
        let loaded = Self::load(&self.path)?;
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = loaded;
        Ok(())
    }

    fn load(path: &Path) -> Result<SessionTokens> {
        if !path.exists() {
            return Ok(SessionTokens::default());
        }

        let json = fs::read_to_string(path).map_err(StoreError::from)?;
        let stored: StoredSession = serde_json::from_str(&json).map_err(StoreError::from)?;

        Ok(SessionTokens {
            access_token: stored.access_token,
            refresh_token: stored.refresh_token,
        })
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".lock");
        self.path.with_file_name(name)
    }

    /// Applies `f` to the cached tokens and persists the result.
    ///
    /// The cache lock is held across the write so concurrent updates reach
    /// the disk in the same order they were applied.
    fn update(&self, f: impl FnOnce(&mut SessionTokens)) -> Result<()> {
        let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = tokens.clone();
        f(&mut next);
        self.persist(&next)?;
        *tokens = next;
        Ok(())
    }

    fn persist(&self, tokens: &SessionTokens) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(StoreError::from)?;
        }

        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.lock_path())
            .map_err(StoreError::from)?;

        lock_file.lock_exclusive().map_err(|e| StoreError::Lock {
            message: e.to_string(),
        })?;

        let result = self.write_locked(tokens);

        if let Err(e) = lock_file.unlock() {
            warn!(error = %e, "Failed to release session lock");
        }

        result
    }

    fn write_locked(&self, tokens: &SessionTokens) -> Result<()> {
        if tokens.access_token.is_none() && tokens.refresh_token.is_none() {
            if self.path.exists() {
                fs::remove_file(&self.path).map_err(StoreError::from)?;
            }
            debug!("Removed session file");
            return Ok(());
        }

        let stored = StoredSession {
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
            updated_at: Utc::now().to_rfc3339(),
        };
        let json = serde_json::to_string_pretty(&stored).map_err(StoreError::from)?;

        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, &json).map_err(StoreError::from)?;

        #[cfg(unix)]
        {
            let mut perms = fs::metadata(&temp_path).map_err(StoreError::from)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&temp_path, perms).map_err(StoreError::from)?;
        }

        fs::rename(&temp_path, &self.path).map_err(StoreError::from)?;
        debug!("Saved session file");
        Ok(())
    }

    fn snapshot(&self) -> SessionTokens {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TokenStore for FileTokenStore {
    fn access_token(&self) -> Option<AccessToken> {
        self.snapshot().access_token
    }

    fn refresh_token(&self) -> Option<RefreshToken> {
        self.snapshot().refresh_token
    }

    fn set_access_token(&self, token: AccessToken) -> Result<()> {
        self.update(|t| t.access_token = Some(token))
    }

    fn set_refresh_token(&self, token: RefreshToken) -> Result<()> {
        self.update(|t| t.refresh_token = Some(token))
    }

    /// Empties the cache before touching the disk, so a failed removal still
    /// leaves this process logged out.
    fn clear(&self) -> Result<()> {
        let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        *tokens = SessionTokens::default();
        self.persist(&tokens)
    }

    fn set_tokens(&self, access: AccessToken, refresh: Option<RefreshToken>) -> Result<()> {
        self.update(|t| {
            t.access_token = Some(access);
            t.refresh_token = refresh;
        })
    }
}
