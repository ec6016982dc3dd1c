//! Logout command implementation.

use anyhow::{Context, Result};
use clap::Args;

use twimbol_core::TokenStore;

use crate::cli::GlobalArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct LogoutArgs {}

pub fn run(_args: LogoutArgs, global: &GlobalArgs) -> Result<()> {
    let store = session::open_store(global)?;

    if !store.is_authenticated() && store.refresh_token().is_none() {
        output::warning("No active session.");
        return Ok(());
    }

    store.clear().context("Failed to clear session")?;
    output::success("Logged out");

    Ok(())
}
