//! End-to-end tests for the watch loop.
//!
//! Both collaborators run as mock servers: one plays the review API, the
//! other the Telegram Bot API.

use std::sync::Arc;
use std::time::Duration;

use notify::{Notifier, NotifyChannel, TelegramChannel};
use review_watch::{ReviewClient, ReviewStatus, StatusCatalog, WatchError, Watcher};
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const STATUS_PATH: &str = "/api/user_api/homework_statuses/";
const BOT_TOKEN: &str = "123:abc";
const CHAT_ID: &str = "42";

const REVIEWING_TEXT: &str =
    "Изменился статус проверки работы \"X\". Работа взята на проверку ревьюером.";
const APPROVED_TEXT: &str =
    "Изменился статус проверки работы \"X\". Работа проверена: ревьюеру всё понравилось. Ура!";

// =============================================================================
// Harness
// =============================================================================

struct Harness {
    api: MockServer,
    telegram: MockServer,
    watcher: Watcher,
}

async fn harness_with_telegram(reply: ResponseTemplate) -> Harness {
    let api = MockServer::start().await;
    let telegram = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{BOT_TOKEN}/sendMessage")))
        .respond_with(reply)
        .mount(&telegram)
        .await;

    let client = ReviewClient::new(format!("{}{STATUS_PATH}", api.uri()), "token").unwrap();
    let channel: Arc<dyn NotifyChannel> =
        Arc::new(TelegramChannel::new(BOT_TOKEN).with_api_base(telegram.uri()));
    let notifier = Notifier::with_channels(vec![channel], CHAT_ID);
    let watcher = Watcher::new(client, notifier, StatusCatalog::default(), 0)
        .with_interval(Duration::from_millis(20));

    Harness {
        api,
        telegram,
        watcher,
    }
}

async fn harness() -> Harness {
    harness_with_telegram(
        ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": {}})),
    )
    .await
}

/// Answer polls made with `from_date = cursor`.
async fn respond_at(api: &MockServer, cursor: i64, body: Value) {
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .and(query_param("from_date", cursor.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(api)
        .await;
}

/// Texts delivered to the mock Telegram server, in order.
async fn sent_texts(telegram: &MockServer) -> Vec<String> {
    telegram
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| {
            let body: Value = request.body_json().unwrap();
            assert_eq!(body["chat_id"], CHAT_ID);
            body["text"].as_str().unwrap().to_string()
        })
        .collect()
}

fn homework(name: &str, status: &str) -> Value {
    json!({"homework_name": name, "status": status})
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_status_change_scenario() {
    let mut h = harness().await;
    respond_at(&h.api, 0, json!({"homeworks": [homework("X", "reviewing")], "current_date": 1000})).await;
    respond_at(&h.api, 1000, json!({"homeworks": [homework("X", "reviewing")], "current_date": 2000})).await;
    respond_at(&h.api, 2000, json!({"homeworks": [homework("X", "approved")], "current_date": 3000})).await;

    // First poll: one notification, cursor follows the server.
    let report = h.watcher.run_cycle().await.unwrap();
    assert_eq!(report.sent, 1);
    assert_eq!(h.watcher.cursor(), 1000);
    assert_eq!(sent_texts(&h.telegram).await, vec![REVIEWING_TEXT]);

    // Same status again: nothing new.
    let report = h.watcher.run_cycle().await.unwrap();
    assert_eq!(report.sent, 0);
    assert_eq!(report.unchanged, 1);
    assert_eq!(h.watcher.cursor(), 2000);
    assert_eq!(sent_texts(&h.telegram).await.len(), 1);

    // Approved: exactly one more notification.
    let report = h.watcher.run_cycle().await.unwrap();
    assert_eq!(report.sent, 1);
    assert_eq!(h.watcher.cursor(), 3000);
    assert_eq!(sent_texts(&h.telegram).await, vec![REVIEWING_TEXT, APPROVED_TEXT]);
    assert_eq!(h.watcher.detector().last_status("X"), Some(ReviewStatus::Approved));
}

#[tokio::test]
async fn test_empty_list_advances_cursor_without_notifying() {
    let mut h = harness().await;
    respond_at(&h.api, 0, json!({"homeworks": [], "current_date": 1500})).await;

    let report = h.watcher.run_cycle().await.unwrap();
    assert!(report.is_idle());
    assert_eq!(h.watcher.cursor(), 1500);
    assert!(sent_texts(&h.telegram).await.is_empty());
}

#[tokio::test]
async fn test_missing_current_date_keeps_cursor() {
    let mut h = harness().await;
    respond_at(&h.api, 0, json!({"homeworks": []})).await;

    h.watcher.run_cycle().await.unwrap();
    assert_eq!(h.watcher.cursor(), 0);
}

#[tokio::test]
async fn test_missing_homeworks_key_is_reported_once() {
    let mut h = harness().await;
    respond_at(&h.api, 0, json!({"current_date": 5000})).await;

    let err = h.watcher.run_cycle().await.unwrap_err();
    assert!(matches!(err, WatchError::Shape(_)));
    assert_eq!(h.watcher.cursor(), 0);

    // The loop carries on; the identical failure is not repeated in chat.
    let err = h.watcher.run_cycle().await.unwrap_err();
    assert!(matches!(err, WatchError::Shape(_)));

    let texts = sent_texts(&h.telegram).await;
    assert_eq!(texts.len(), 1);
    assert!(texts[0].starts_with("Проблема с ботом: Malformed review API response"));
}

#[tokio::test]
async fn test_failure_reported_again_after_recovery() {
    let mut h = harness().await;
    let broken = json!({"current_date": 5000});

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(broken.clone()))
        .up_to_n_times(1)
        .mount(&h.api)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"homeworks": []})))
        .up_to_n_times(1)
        .mount(&h.api)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(broken))
        .mount(&h.api)
        .await;

    assert!(h.watcher.run_cycle().await.is_err());
    assert!(h.watcher.run_cycle().await.is_ok());
    assert!(h.watcher.run_cycle().await.is_err());

    assert_eq!(sent_texts(&h.telegram).await.len(), 2);
}

#[tokio::test]
async fn test_unknown_status_sends_no_status_message() {
    let mut h = harness().await;
    respond_at(&h.api, 0, json!({"homeworks": [homework("X", "lost")], "current_date": 1000})).await;

    let report = h.watcher.poll_once().await.unwrap();
    assert_eq!(report.sent, 0);
    assert!(matches!(
        report.failures.as_slice(),
        [WatchError::UnknownStatus(code)] if code == "lost"
    ));
    assert_eq!(h.watcher.cursor(), 1000);
    assert!(sent_texts(&h.telegram).await.is_empty());
}

#[tokio::test]
async fn test_bad_record_does_not_block_others() {
    let mut h = harness().await;
    respond_at(
        &h.api,
        0,
        json!({
            "homeworks": [homework("X", "lost"), homework("Y", "rejected")],
            "current_date": 1000
        }),
    )
    .await;

    let report = h.watcher.run_cycle().await.unwrap();
    assert_eq!(report.sent, 1);
    assert_eq!(report.failures.len(), 1);

    let texts = sent_texts(&h.telegram).await;
    assert_eq!(texts.len(), 2);
    assert_eq!(
        texts[0],
        "Изменился статус проверки работы \"Y\". Работа проверена: у ревьюера есть замечания."
    );
    assert_eq!(texts[1], "Проблема с ботом: Unknown homework status `lost`");
}

#[tokio::test]
async fn test_only_newest_entry_per_homework_is_considered() {
    let mut h = harness().await;
    respond_at(
        &h.api,
        0,
        json!({
            "homeworks": [homework("X", "approved"), homework("X", "reviewing")],
            "current_date": 1000
        }),
    )
    .await;

    let report = h.watcher.run_cycle().await.unwrap();
    assert_eq!(report.sent, 1);
    assert_eq!(sent_texts(&h.telegram).await, vec![APPROVED_TEXT]);
}

#[tokio::test]
async fn test_older_entry_not_announced_when_newest_is_unreadable() {
    let mut h = harness().await;
    respond_at(
        &h.api,
        0,
        json!({
            "homeworks": [homework("X", "lost"), homework("X", "reviewing")],
            "current_date": 1000
        }),
    )
    .await;

    let report = h.watcher.poll_once().await.unwrap();
    assert_eq!(report.sent, 0);
    assert!(matches!(
        report.failures.as_slice(),
        [WatchError::UnknownStatus(code)] if code == "lost"
    ));
    assert_eq!(h.watcher.detector().last_status("X"), None);
    assert!(sent_texts(&h.telegram).await.is_empty());
}

#[tokio::test]
async fn test_send_failure_is_swallowed() {
    let mut h = harness_with_telegram(ResponseTemplate::new(500).set_body_json(json!({
        "ok": false,
        "error_code": 500,
        "description": "Internal Server Error"
    })))
    .await;
    respond_at(&h.api, 0, json!({"homeworks": [homework("X", "reviewing")], "current_date": 1000})).await;

    let report = h.watcher.run_cycle().await.unwrap();
    assert_eq!(report.sent, 0);
    assert!(matches!(report.failures.as_slice(), [WatchError::Send(_)]));
    assert_eq!(h.watcher.cursor(), 1000);

    // The delivery failure is not relayed through the same broken channel.
    assert_eq!(h.telegram.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_server_error_leaves_cursor() {
    let mut h = harness().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&h.api)
        .await;

    let err = h.watcher.run_cycle().await.unwrap_err();
    assert!(matches!(err, WatchError::UnexpectedStatus { status: 500 }));
    assert_eq!(h.watcher.cursor(), 0);
    assert_eq!(
        sent_texts(&h.telegram).await,
        vec!["Проблема с ботом: Review API returned unexpected status 500"]
    );
}

#[tokio::test]
async fn test_run_loop_notifies_once_for_repeated_status() {
    let h = harness().await;
    respond_at(&h.api, 0, json!({"homeworks": [homework("X", "reviewing")]})).await;

    let result = tokio::time::timeout(Duration::from_millis(300), h.watcher.run()).await;
    assert!(result.is_err(), "watch loop should run until cancelled");

    let polls = h.api.received_requests().await.unwrap().len();
    assert!(polls >= 2, "expected repeated polls, got {polls}");
    assert_eq!(sent_texts(&h.telegram).await, vec![REVIEWING_TEXT]);
}
