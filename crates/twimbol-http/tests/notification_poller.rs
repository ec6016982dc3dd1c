//! Mock API tests for notification polling.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde_json::json;
use twimbol_core::{AccessToken, ApiPath, ApiUrl, MemoryTokenStore, RefreshToken};
use twimbol_http::{AuthenticatedClient, ClientConfig, NotificationPoller, PollerConfig};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn poller(server: &MockServer, interval: Duration) -> NotificationPoller {
    let config = ClientConfig::new(ApiUrl::new(server.uri()).unwrap());
    let store = Arc::new(MemoryTokenStore::with_tokens(
        Some(AccessToken::new("A1")),
        Some(RefreshToken::new("R1")),
    ));
    let client = AuthenticatedClient::new(config, store).unwrap();
    NotificationPoller::new(
        client,
        PollerConfig {
            path: ApiPath::new("/api/notifications/").unwrap(),
            interval,
        },
    )
    .unwrap()
}

#[tokio::test]
async fn test_poll_detects_new_unread() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/notifications/"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "message": "alice liked your reel", "is_read": false },
            { "id": 2, "message": "old news", "is_read": true }
        ])))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/notifications/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 3,
            "results": [
                { "id": 3, "message": "bob commented", "is_read": false },
                { "id": 1, "message": "alice liked your reel", "is_read": false },
                { "id": 2, "message": "old news", "is_read": true }
            ]
        })))
        .mount(&server)
        .await;

    let poller = poller(&server, Duration::from_secs(60));
    let mut receiver = poller.subscribe();

    let first = poller.poll_once().await.unwrap();
    assert_eq!(first.notifications.len(), 2);
    let ids: Vec<u64> = first.new.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![1]);

    let second = poller.poll_once().await.unwrap();
    assert_eq!(second.notifications.len(), 3);
    let ids: Vec<u64> = second.new.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![3]);

    // Subscribers see both batches in order.
    assert_eq!(receiver.recv().await.unwrap(), first);
    assert_eq!(receiver.recv().await.unwrap(), second);
}

#[tokio::test]
async fn test_poll_error_status_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/notifications/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let poller = poller(&server, Duration::from_secs(60));
    let err = poller.poll_once().await.unwrap_err();
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn test_start_streams_batches_until_stopped() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/notifications/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "id": 7, "message": "hi", "is_read": false }])),
        )
        .mount(&server)
        .await;

    let poller = poller(&server, Duration::from_millis(50));
    let mut stream = Box::pin(poller.stream());

    assert!(poller.start());
    assert!(!poller.start(), "second start is a no-op");
    assert!(poller.is_running());

    let first = tokio::time::timeout(Duration::from_secs(5), stream.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.new.len(), 1);

    // The same notification is not new on the next tick.
    let second = tokio::time::timeout(Duration::from_secs(5), stream.next())
        .await
        .unwrap()
        .unwrap();
    assert!(second.new.is_empty());

    poller.stop().await;
    assert!(!poller.is_running());

    // After a stop the seen set is forgotten.
    let again = poller.poll_once().await.unwrap();
    assert_eq!(again.new.len(), 1);

    // Streams taken before the stop keep receiving after a restart.
    assert!(poller.start());
    let resumed = tokio::time::timeout(Duration::from_secs(5), stream.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(resumed.notifications.len(), 1);
    poller.stop().await;
}

#[tokio::test]
async fn test_mark_read_posts_to_notification() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/notifications/7/mark-read/"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 7, "is_read": true })))
        .expect(1)
        .mount(&server)
        .await;

    let poller = poller(&server, Duration::from_secs(60));
    poller.mark_read(7).await.unwrap();
}

#[tokio::test]
async fn test_mark_all_read() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/notifications/mark-all-read/"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let poller = poller(&server, Duration::from_secs(60));
    poller.mark_all_read().await.unwrap();
}

#[tokio::test]
async fn test_mark_read_unknown_notification_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/notifications/99/mark-read/"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "detail": "Not found." })))
        .expect(1)
        .mount(&server)
        .await;

    let poller = poller(&server, Duration::from_secs(60));
    let err = poller.mark_read(99).await.unwrap_err();
    assert!(err.to_string().contains("Not found."));
}

#[tokio::test]
async fn test_zero_interval_poller_is_rejected() {
    let server = MockServer::start().await;
    let config = ClientConfig::new(ApiUrl::new(server.uri()).unwrap());
    let client = AuthenticatedClient::new(config, Arc::new(MemoryTokenStore::new())).unwrap();

    let result = NotificationPoller::new(
        client,
        PollerConfig {
            path: ApiPath::new("/api/notifications/").unwrap(),
            interval: Duration::ZERO,
        },
    );
    assert!(matches!(result, Err(twimbol_core::Error::InvalidInput(_))));
}
