//! Notification command implementations.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use futures_util::StreamExt;

use twimbol_core::ApiPath;
use twimbol_http::{
    DEFAULT_NOTIFICATIONS_PATH, DEFAULT_POLL_INTERVAL, Notification, NotificationPoller,
    PollerConfig,
};

use crate::cli::GlobalArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct NotificationsCommand {
    #[command(subcommand)]
    pub command: NotificationsSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum NotificationsSubcommand {
    /// Poll for notifications and print new ones as they arrive
    Watch(WatchArgs),

    /// Mark one notification, or all of them, as read
    MarkRead(MarkReadArgs),
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Seconds between polls
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: u64,

    /// Notifications endpoint
    #[arg(long, default_value = DEFAULT_NOTIFICATIONS_PATH)]
    pub path: String,

    /// Print notifications as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Poll once, print every notification and exit
    #[arg(long)]
    pub once: bool,
}

#[derive(Args, Debug)]
pub struct MarkReadArgs {
    /// Notification id
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub id: Option<u64>,

    /// Mark every notification as read
    #[arg(long)]
    pub all: bool,

    /// Notifications endpoint
    #[arg(long, default_value = DEFAULT_NOTIFICATIONS_PATH)]
    pub path: String,
}

pub async fn handle(cmd: NotificationsCommand, global: &GlobalArgs) -> Result<()> {
    match cmd.command {
        NotificationsSubcommand::Watch(args) => watch(args, global).await,
        NotificationsSubcommand::MarkRead(args) => mark_read(args, global).await,
    }
}

fn poller(global: &GlobalArgs, path: &str, interval: Duration) -> Result<NotificationPoller> {
    let (client, _store) = session::client(global)?;
    let config = PollerConfig {
        path: ApiPath::new(path).context("Invalid notifications path")?,
        interval,
    };
    NotificationPoller::new(client, config).context("Invalid poller settings")
}

async fn mark_read(args: MarkReadArgs, global: &GlobalArgs) -> Result<()> {
    let poller = poller(global, &args.path, DEFAULT_POLL_INTERVAL)?;

    match args.id {
        Some(id) => {
            poller
                .mark_read(id)
                .await
                .with_context(|| format!("Failed to mark notification {id} as read"))?;
            output::success(&format!("Notification #{id} marked as read"));
        }
        None => {
            poller
                .mark_all_read()
                .await
                .context("Failed to mark notifications as read")?;
            output::success("All notifications marked as read");
        }
    }

    Ok(())
}

async fn watch(args: WatchArgs, global: &GlobalArgs) -> Result<()> {
    let poller = poller(global, &args.path, Duration::from_secs(args.interval))?;

    if args.once {
        let batch = poller
            .poll_once()
            .await
            .context("Failed to fetch notifications")?;
        for notification in &batch.notifications {
            print_notification(notification, args.json, batch.new.contains(notification))?;
        }
        return Ok(());
    }

    eprintln!(
        "{}",
        format!("Polling {} every {}s...", args.path, args.interval).dimmed()
    );
    eprintln!("{}", "Press Ctrl+C to stop.".dimmed());
    eprintln!();

    let mut stream = Box::pin(poller.stream());
    poller.start();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            batch = stream.next() => {
                let Some(batch) = batch else { break };
                for notification in &batch.new {
                    print_notification(notification, args.json, true)?;
                }
            }
        }
    }

    poller.stop().await;
    Ok(())
}

fn print_notification(notification: &Notification, json: bool, new: bool) -> Result<()> {
    if json {
        return output::json(notification);
    }

    let tag = if new {
        "NEW".green()
    } else if notification.is_read {
        "READ".dimmed()
    } else {
        "UNREAD".yellow()
    };
    println!(
        "{} {} {}",
        tag,
        format!("#{}", notification.id).dimmed(),
        notification.message.as_deref().unwrap_or("")
    );
    Ok(())
}
