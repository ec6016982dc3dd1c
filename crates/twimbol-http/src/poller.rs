//! Background notification polling.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_core::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use twimbol_core::error::InvalidInputError;
use twimbol_core::{ApiPath, ApiRequest, Method, Result};

use crate::client::AuthenticatedClient;

/// Default notifications endpoint.
pub const DEFAULT_NOTIFICATIONS_PATH: &str = "/api/notifications/";

/// Default delay between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

const CHANNEL_CAPACITY: usize = 16;

/// A notification as returned by the API.
///
/// Only `id` is interpreted; everything else is carried through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: u64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Accepts both a bare list and a paginated `{"results": [...]}` envelope.
#[derive(Deserialize)]
#[serde(untagged)]
enum NotificationList {
    Plain(Vec<Notification>),
    Paginated { results: Vec<Notification> },
}

impl From<NotificationList> for Vec<Notification> {
    fn from(list: NotificationList) -> Self {
        match list {
            NotificationList::Plain(items) | NotificationList::Paginated { results: items } => {
                items
            }
        }
    }
}

/// The result of one poll, delivered to every subscriber.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationBatch {
    /// The full list returned by the server.
    pub notifications: Vec<Notification>,
    /// Unread notifications whose id was absent from the previous poll.
    pub new: Vec<Notification>,
}

/// Poller settings.
///
/// `interval` must be non-zero; [`NotificationPoller::new`] rejects zero.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub path: ApiPath,
    pub interval: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            path: ApiPath::from_static(DEFAULT_NOTIFICATIONS_PATH),
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

struct PollerShared {
    client: AuthenticatedClient,
    config: PollerConfig,
    sender: broadcast::Sender<NotificationBatch>,
    seen: Mutex<HashSet<u64>>,
}

impl PollerShared {
    #[instrument(skip(self), fields(path = %self.config.path))]
    async fn poll(&self) -> Result<NotificationBatch> {
        let request = ApiRequest::new(Method::GET, self.config.path.clone());
        let response = self.client.request(request).await?.error_for_status()?;
        let notifications: Vec<Notification> = response.json::<NotificationList>()?.into();

        let new = {
            let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
            let new: Vec<Notification> = notifications
                .iter()
                .filter(|n| !seen.contains(&n.id) && !n.is_read)
                .cloned()
                .collect();
            *seen = notifications.iter().map(|n| n.id).collect();
            new
        };

        debug!(total = notifications.len(), new = new.len(), "Polled notifications");

        let batch = NotificationBatch { notifications, new };
        // No subscribers is not an error.
        let _ = self.sender.send(batch.clone());
        Ok(batch)
    }
}

struct PollTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Polls the notifications endpoint on a timer and fans results out to
/// subscribers.
///
/// The first poll runs immediately on [`start`](Self::start). Requests go
/// through the [`AuthenticatedClient`], so an expired session is refreshed
/// transparently. Poll failures are logged and polling continues.
pub struct NotificationPoller {
    shared: Arc<PollerShared>,
    task: Mutex<Option<PollTask>>,
}

impl NotificationPoller {
    /// Creates a stopped poller. Fails if the interval is zero.
    pub fn new(client: AuthenticatedClient, config: PollerConfig) -> Result<Self> {
        if config.interval.is_zero() {
            return Err(InvalidInputError::Other {
                message: "notification poll interval must be non-zero".to_string(),
            }
            .into());
        }

        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Ok(Self {
            shared: Arc::new(PollerShared {
                client,
                config,
                sender,
                seen: Mutex::new(HashSet::new()),
            }),
            task: Mutex::new(None),
        })
    }

    /// Registers a new subscriber. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<NotificationBatch> {
        self.shared.sender.subscribe()
    }

    /// Subscribes as a stream. Batches missed by a slow consumer are skipped.
    pub fn stream(&self) -> impl Stream<Item = NotificationBatch> + Send + 'static {
        let mut receiver = self.subscribe();
        async_stream::stream! {
            loop {
                match receiver.recv().await {
                    Ok(batch) => yield batch,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Notification subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    /// Runs a single poll outside the timer.
    pub async fn poll_once(&self) -> Result<NotificationBatch> {
        self.shared.poll().await
    }

    /// Marks one notification as read.
    ///
    /// POSTs to `<path>/<id>/mark-read/` under the configured notifications
    /// path.
    #[instrument(skip(self))]
    pub async fn mark_read(&self, id: u64) -> Result<()> {
        let path = self.action_path(&format!("{id}/mark-read/"))?;
        self.post_action(path).await?;
        debug!(id, "Marked notification read");
        Ok(())
    }

    /// Marks every notification as read.
    ///
    /// POSTs to `<path>/mark-all-read/` under the configured notifications
    /// path.
    #[instrument(skip(self))]
    pub async fn mark_all_read(&self) -> Result<()> {
        let path = self.action_path("mark-all-read/")?;
        self.post_action(path).await?;
        debug!("Marked all notifications read");
        Ok(())
    }

    fn action_path(&self, action: &str) -> Result<ApiPath> {
        let base = self.shared.config.path.route().trim_end_matches('/');
        ApiPath::new(format!("{base}/{action}"))
    }

    async fn post_action(&self, path: ApiPath) -> Result<()> {
        let request = ApiRequest::new(Method::POST, path);
        self.shared
            .client
            .request(request)
            .await?
            .error_for_status()?;
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    /// Starts the polling loop. Returns false if it is already running.
    pub fn start(&self) -> bool {
        let mut slot = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|task| !task.handle.is_finished()) {
            return false;
        }

        let cancel = CancellationToken::new();
        let shared = self.shared.clone();
        let task_cancel = cancel.clone();
        let interval = shared.config.interval;

        info!(interval_secs = interval.as_secs(), "Starting notification polling");

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = task_cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                tokio::select! {
                    biased;
                    _ = task_cancel.cancelled() => break,
                    result = shared.poll() => {
                        if let Err(e) = result {
                            warn!(error = %e, "Notification poll failed");
                        }
                    }
                }
            }

            debug!("Notification polling stopped");
        });

        *slot = Some(PollTask { cancel, handle });
        true
    }

    /// Stops the polling loop and forgets which notifications were seen.
    ///
    /// Subscribers stay registered: receivers and streams obtained earlier
    /// keep working and receive batches again after the next
    /// [`start`](Self::start). Drop them to unsubscribe.
    pub async fn stop(&self) {
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(task) = task {
            task.cancel.cancel();
            if let Err(e) = task.handle.await {
                warn!(error = %e, "Notification polling task failed");
            }
            info!("Notification polling stopped");
        }

        self.shared
            .seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Drop for NotificationPoller {
    fn drop(&mut self) {
        if let Some(task) = self
            .task
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.cancel.cancel();
        }
    }
}

impl std::fmt::Debug for NotificationPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationPoller")
            .field("config", &self.shared.config)
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_plain_and_paginated_lists() {
        let plain: NotificationList = serde_json::from_value(json!([
            { "id": 1, "message": "hi", "is_read": false, "kind": "like" }
        ]))
        .unwrap();
        let items: Vec<Notification> = plain.into();
        assert_eq!(items[0].id, 1);
        assert_eq!(items[0].extra["kind"], "like");

        let paginated: NotificationList = serde_json::from_value(json!({
            "count": 1,
            "results": [{ "id": 2 }]
        }))
        .unwrap();
        let items: Vec<Notification> = paginated.into();
        assert_eq!(items[0].id, 2);
        assert!(!items[0].is_read);
    }

    fn poller_with(path: &str, interval: Duration) -> Result<NotificationPoller> {
        let config = crate::ClientConfig::new(twimbol_core::ApiUrl::new("http://127.0.0.1:9")?);
        let client =
            AuthenticatedClient::new(config, Arc::new(twimbol_core::MemoryTokenStore::new()))?;
        NotificationPoller::new(
            client,
            PollerConfig {
                path: ApiPath::new(path)?,
                interval,
            },
        )
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = poller_with(DEFAULT_NOTIFICATIONS_PATH, Duration::ZERO).unwrap_err();
        assert!(matches!(err, twimbol_core::Error::InvalidInput(_)));
    }

    #[test]
    fn action_paths_hang_off_the_notifications_path() {
        let poller = poller_with("/api/notifications/", DEFAULT_POLL_INTERVAL).unwrap();
        assert_eq!(
            poller.action_path("7/mark-read/").unwrap().as_str(),
            "/api/notifications/7/mark-read/"
        );

        let poller = poller_with("/inbox?unread=1", DEFAULT_POLL_INTERVAL).unwrap();
        assert_eq!(
            poller.action_path("mark-all-read/").unwrap().as_str(),
            "/inbox/mark-all-read/"
        );
    }

    #[test]
    fn default_config() {
        let config = PollerConfig::default();
        assert_eq!(config.path.as_str(), DEFAULT_NOTIFICATIONS_PATH);
        assert_eq!(config.interval, DEFAULT_POLL_INTERVAL);
    }
}
