//! Subcommand implementations.

mod login;
mod logout;
mod notifications;
mod refresh_token;
mod request;
mod whoami;

use anyhow::Result;
use clap::Subcommand;

use crate::cli::GlobalArgs;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and store the session tokens
    Login(login::LoginArgs),

    /// Forget the stored session
    Logout(logout::LogoutArgs),

    /// Display the stored session
    Whoami(whoami::WhoamiArgs),

    /// Exchange the refresh token for a new access token
    RefreshToken(refresh_token::RefreshTokenArgs),

    /// Send an authenticated request
    Request(request::RequestArgs),

    /// Notification operations
    Notifications(notifications::NotificationsCommand),
}

pub async fn handle(cmd: Commands, global: &GlobalArgs) -> Result<()> {
    match cmd {
        Commands::Login(args) => login::run(args, global).await,
        Commands::Logout(args) => logout::run(args, global),
        Commands::Whoami(args) => whoami::run(args, global),
        Commands::RefreshToken(args) => refresh_token::run(args, global).await,
        Commands::Request(args) => request::run(args, global).await,
        Commands::Notifications(cmd) => notifications::handle(cmd, global).await,
    }
}
