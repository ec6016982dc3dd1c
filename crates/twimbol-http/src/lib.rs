//! twimbol-http - Authenticated HTTP client for the Twimbol API.
//!
//! [`AuthenticatedClient`] attaches the session's bearer token to every
//! request and, when the API answers 401, refreshes the access token once
//! and replays the request. [`NotificationPoller`] builds a timed polling
//! loop on top of it.

mod client;
mod config;
mod poller;
mod refresh;
mod transport;

pub use client::AuthenticatedClient;
pub use config::{
    ClientConfig, DEFAULT_LOGIN_PATH, DEFAULT_REFRESH_PATH, DEFAULT_TIMEOUT, RefreshMode,
};
pub use poller::{
    DEFAULT_NOTIFICATIONS_PATH, DEFAULT_POLL_INTERVAL, Notification, NotificationBatch,
    NotificationPoller, PollerConfig,
};
pub use tokio_util::sync::CancellationToken;
