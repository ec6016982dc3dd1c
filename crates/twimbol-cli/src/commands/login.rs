//! Login command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use crate::cli::GlobalArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account username
    #[arg(long)]
    pub username: String,

    /// Account password
    #[arg(long, env = "TWIMBOL_PASSWORD", hide_env_values = true)]
    pub password: String,
}

pub async fn run(args: LoginArgs, global: &GlobalArgs) -> Result<()> {
    let (client, store) = session::client(global)?;

    eprintln!("{}", "Logging in...".dimmed());

    client
        .login(&args.username, &args.password)
        .await
        .context("Failed to login")?;

    output::success("Logged in successfully");
    println!();
    output::field("API", client.config().base_url().as_str());
    output::field("Session", &store.path().display().to_string());

    Ok(())
}
