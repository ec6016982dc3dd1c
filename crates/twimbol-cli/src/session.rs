//! Session file location and client construction.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use tracing::debug;

use twimbol_core::ApiUrl;
use twimbol_http::{AuthenticatedClient, ClientConfig};
use twimbol_store::FileTokenStore;

use crate::cli::GlobalArgs;

/// Resolves the session file path, falling back to the platform data
/// directory.
pub fn session_path(global: &GlobalArgs) -> Result<PathBuf> {
    if let Some(path) = &global.session_file {
        return Ok(path.clone());
    }

    let dirs =
        ProjectDirs::from("", "", "twimbol").context("Could not determine data directory")?;
    Ok(dirs.data_dir().join("session.json"))
}

/// Opens the persisted token store.
pub fn open_store(global: &GlobalArgs) -> Result<Arc<FileTokenStore>> {
    let path = session_path(global)?;
    debug!(path = %path.display(), "Opening session file");
    let store = FileTokenStore::open(&path)
        .with_context(|| format!("Failed to open session file {}", path.display()))?;
    Ok(Arc::new(store))
}

/// Parses the configured API URL.
pub fn api_url(global: &GlobalArgs) -> Result<ApiUrl> {
    let raw = global
        .api_url
        .as_deref()
        .context("No API URL. Pass --api-url or set TWIMBOL_API_URL.")?;
    ApiUrl::new(raw).context("Invalid API URL")
}

/// Builds an authenticated client over the persisted session.
pub fn client(global: &GlobalArgs) -> Result<(AuthenticatedClient, Arc<FileTokenStore>)> {
    let store = open_store(global)?;
    let config = ClientConfig::new(api_url(global)?);
    let client = AuthenticatedClient::new(config, store.clone())
        .context("Failed to build HTTP client")?;
    Ok((client, store))
}
