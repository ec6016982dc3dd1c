//! Refresh token command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use twimbol_core::TokenStore;

use crate::cli::GlobalArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct RefreshTokenArgs {}

pub async fn run(_args: RefreshTokenArgs, global: &GlobalArgs) -> Result<()> {
    let (client, store) = session::client(global)?;

    if store.refresh_token().is_none() {
        anyhow::bail!("No refresh token stored. Run 'twimbol login' first.");
    }

    eprintln!("{}", "Refreshing access token...".dimmed());

    // The file store persists the new access token as part of the refresh.
    client
        .refresh()
        .await
        .context("Failed to refresh access token")?;

    output::success("Access token refreshed");
    output::field("Session", &store.path().display().to_string());

    Ok(())
}
