//! Whoami command implementation.

use anyhow::Result;
use clap::Args;

use twimbol_core::TokenStore;

use crate::cli::GlobalArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct WhoamiArgs {}

pub fn run(_args: WhoamiArgs, global: &GlobalArgs) -> Result<()> {
    let store = session::open_store(global)?;

    let presence = |present: bool| if present { "present" } else { "absent" };

    output::field("Session", &store.path().display().to_string());
    if let Some(api_url) = &global.api_url {
        output::field("API", api_url);
    }
    output::field(
        "Authenticated",
        if store.is_authenticated() { "yes" } else { "no" },
    );
    output::field("Access token", presence(store.access_token().is_some()));
    output::field("Refresh token", presence(store.refresh_token().is_some()));

    Ok(())
}
