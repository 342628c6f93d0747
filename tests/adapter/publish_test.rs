//! Outbound publish tests.

use std::time::Duration;

use chatbridge::testing::MockBackend;
use chatbridge::{AdapterError, BackendError, ChatBackendAdapter, Message, SubscriptionFilter};

fn adapter() -> ChatBackendAdapter<MockBackend> {
    ChatBackendAdapter::new(MockBackend::new("bot").with_channel("general", "c1"))
}

#[tokio::test]
async fn publish_routes_by_channel_and_returns_ref() {
    let adapter = adapter();
    let sent_ref = adapter
        .publish(&Message::outbound("c1", "hello world"))
        .await
        .expect("publish");
    assert_eq!(sent_ref, "m1");

    let sent = adapter.backend().sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].channel_id, "c1");
    assert_eq!(sent[0].body, "hello world");
}

#[tokio::test]
async fn publish_connects_lazily() {
    let adapter = adapter();
    assert!(!adapter.backend().is_connected());
    adapter
        .publish(&Message::outbound("c1", "x"))
        .await
        .expect("publish");
    assert!(adapter.backend().is_connected());
}

#[tokio::test]
async fn reply_routing_carries_thread() {
    let adapter = adapter();
    let inbound = Message {
        thread_id: Some("t7".to_owned()),
        ..Message::outbound("c1", "question")
    };
    adapter
        .publish(&inbound.reply("answer"))
        .await
        .expect("publish");

    let sent = adapter.backend().sent();
    assert_eq!(sent[0].thread_id.as_deref(), Some("t7"));
}

#[tokio::test]
async fn rejected_send_surfaces_as_send_error() {
    let adapter = adapter();
    adapter
        .backend()
        .fail_next_send(BackendError::NotFound("c-missing".to_owned()));
    let err = adapter
        .publish(&Message::outbound("c-missing", "x"))
        .await
        .expect_err("must fail");
    assert!(matches!(err, AdapterError::Send(BackendError::NotFound(_))));
}

#[tokio::test]
async fn unreachable_backend_surfaces_as_connection_error() {
    let adapter = adapter();
    adapter
        .backend()
        .fail_connect(BackendError::Unreachable("gateway down".to_owned()));
    let err = adapter
        .publish(&Message::outbound("c1", "x"))
        .await
        .expect_err("must fail");
    assert!(matches!(err, AdapterError::Connection(_)));
}

/// A rejected publish does not disturb an active subscription.
#[tokio::test]
async fn failed_publish_leaves_subscription_intact() {
    let adapter = adapter();
    let mut sub = adapter
        .subscribe(SubscriptionFilter::all())
        .await
        .expect("subscribe");

    adapter
        .backend()
        .fail_next_send(BackendError::NotFound("bad".to_owned()));
    let err = adapter
        .publish(&Message::outbound("bad", "x"))
        .await
        .expect_err("must fail");
    assert!(matches!(err, AdapterError::Send(_)));

    adapter.backend().inject_message("u1", "c1", "still flowing");
    let msg = sub
        .next_within(Duration::from_secs(1))
        .await
        .expect("no timeout")
        .expect("stream alive")
        .expect("ok message");
    assert_eq!(msg.body, "still flowing");
}

#[tokio::test]
async fn rate_limited_send_is_not_retried() {
    let adapter = adapter();
    adapter.backend().fail_next_send(BackendError::RateLimited);
    let err = adapter
        .publish(&Message::outbound("c1", "x"))
        .await
        .expect_err("must fail");
    assert!(matches!(err, AdapterError::Send(BackendError::RateLimited)));
    // No retry happened: nothing was recorded as sent.
    assert!(adapter.backend().sent().is_empty());
}
