//! Subscription filtering and resolution tests.

use std::time::Duration;

use chatbridge::testing::MockBackend;
use chatbridge::{AdapterError, ChatBackendAdapter, SubscriptionFilter};

const WAIT: Duration = Duration::from_secs(1);
const QUIET: Duration = Duration::from_millis(100);

fn two_channel_adapter() -> ChatBackendAdapter<MockBackend> {
    ChatBackendAdapter::new(
        MockBackend::new("bot")
            .with_channel("general", "c1")
            .with_channel("random", "c2"),
    )
}

/// Subscribe to `general`, inject into `general` and `random`; only the
/// `general` event is observed, the other is discarded silently.
#[tokio::test]
async fn channel_filter_admits_only_members() {
    let adapter = two_channel_adapter();
    let mut sub = adapter
        .subscribe(SubscriptionFilter::channels(["general"]))
        .await
        .expect("subscribe");

    adapter.backend().inject_message("u1", "c1", "in general");
    adapter.backend().inject_message("u1", "c2", "in random");

    let msg = sub
        .next_within(WAIT)
        .await
        .expect("no timeout")
        .expect("stream alive")
        .expect("ok message");
    assert_eq!(msg.channel_id, "c1");
    assert_eq!(msg.body, "in general");

    // Nothing else arrives: the c2 event was filtered, not queued.
    assert!(matches!(
        sub.next_within(QUIET).await,
        Err(AdapterError::Timeout { .. })
    ));
}

#[tokio::test]
async fn skip_own_drops_bot_authored_messages() {
    let adapter = two_channel_adapter();
    let mut sub = adapter
        .subscribe(SubscriptionFilter::all())
        .await
        .expect("subscribe");

    adapter.backend().inject_message("bot", "c1", "from myself");
    adapter.backend().inject_message("u2", "c1", "from a user");

    let msg = sub
        .next_within(WAIT)
        .await
        .expect("no timeout")
        .expect("stream alive")
        .expect("ok message");
    assert_eq!(msg.author_id, "u2");
}

#[tokio::test]
async fn skip_own_disabled_delivers_bot_messages() {
    let adapter = two_channel_adapter();
    let mut sub = adapter
        .subscribe(SubscriptionFilter::all().skip_own(false))
        .await
        .expect("subscribe");

    adapter.backend().inject_message("bot", "c1", "echo");

    let msg = sub
        .next_within(WAIT)
        .await
        .expect("no timeout")
        .expect("stream alive")
        .expect("ok message");
    assert_eq!(msg.author_id, "bot");
}

#[tokio::test]
async fn skip_history_drops_pre_subscription_events() {
    let adapter = two_channel_adapter();
    let mut sub = adapter
        .subscribe(SubscriptionFilter::all())
        .await
        .expect("subscribe");

    // Replayed history: explicit timestamp well before the subscription.
    adapter.backend().inject(serde_json::json!({
        "author_id": "u1",
        "channel_id": "c1",
        "body": "old news",
        "timestamp": "2020-01-01T00:00:00Z",
    }));
    adapter.backend().inject_message("u1", "c1", "fresh");

    let msg = sub
        .next_within(WAIT)
        .await
        .expect("no timeout")
        .expect("stream alive")
        .expect("ok message");
    assert_eq!(msg.body, "fresh");
}

#[tokio::test]
async fn skip_history_disabled_delivers_replayed_events() {
    let adapter = two_channel_adapter();
    let mut sub = adapter
        .subscribe(SubscriptionFilter::all().skip_history(false))
        .await
        .expect("subscribe");

    adapter.backend().inject(serde_json::json!({
        "author_id": "u1",
        "channel_id": "c1",
        "body": "old news",
        "timestamp": "2020-01-01T00:00:00Z",
    }));

    let msg = sub
        .next_within(WAIT)
        .await
        .expect("no timeout")
        .expect("stream alive")
        .expect("ok message");
    assert_eq!(msg.body, "old news");
}

/// Unknown names surface a resolution error listing every failure; the
/// filter is never silently emptied.
#[tokio::test]
async fn unknown_channel_name_is_a_resolution_error() {
    let adapter = two_channel_adapter();
    let err = adapter
        .subscribe(SubscriptionFilter::channels(["general", "nope", "also-nope"]))
        .await
        .expect_err("must fail");
    match err {
        AdapterError::Resolution { unresolved } => {
            assert_eq!(unresolved, vec!["also-nope".to_owned(), "nope".to_owned()]);
        }
        other => panic!("expected Resolution, got {other:?}"),
    }
}

#[tokio::test]
async fn channel_ids_pass_through_resolution() {
    let adapter = two_channel_adapter();
    let mut sub = adapter
        .subscribe(SubscriptionFilter::channels(["c2"]))
        .await
        .expect("ids resolve to themselves");

    adapter.backend().inject_message("u1", "c2", "hi");
    let msg = sub
        .next_within(WAIT)
        .await
        .expect("no timeout")
        .expect("stream alive")
        .expect("ok message");
    assert_eq!(msg.channel_id, "c2");
}

/// A malformed payload is skipped with a warning; the subscription keeps
/// delivering later events.
#[tokio::test]
async fn malformed_payload_does_not_kill_the_stream() {
    let adapter = two_channel_adapter();
    let mut sub = adapter
        .subscribe(SubscriptionFilter::all())
        .await
        .expect("subscribe");

    adapter.backend().inject(serde_json::json!({ "body": 5 }));
    adapter.backend().inject_message("u1", "c1", "still alive");

    let msg = sub
        .next_within(WAIT)
        .await
        .expect("no timeout")
        .expect("stream alive")
        .expect("ok message");
    assert_eq!(msg.body, "still alive");
}

#[tokio::test]
async fn delivery_preserves_backend_order() {
    let adapter = two_channel_adapter();
    let mut sub = adapter
        .subscribe(SubscriptionFilter::all())
        .await
        .expect("subscribe");

    for body in ["first", "second", "third"] {
        adapter.backend().inject_message("u1", "c1", body);
    }
    for expected in ["first", "second", "third"] {
        let msg = sub
            .next_within(WAIT)
            .await
            .expect("no timeout")
            .expect("stream alive")
            .expect("ok message");
        assert_eq!(msg.body, expected);
    }
}

/// Two concurrent subscriptions share one connection and each sees the
/// events its own filter admits.
#[tokio::test]
async fn multiple_subscriptions_share_one_connection() {
    let adapter = two_channel_adapter();
    let mut general = adapter
        .subscribe(SubscriptionFilter::channels(["general"]))
        .await
        .expect("subscribe general");
    let mut random = adapter
        .subscribe(SubscriptionFilter::channels(["random"]))
        .await
        .expect("subscribe random");

    adapter.backend().inject_message("u1", "c1", "to general");
    adapter.backend().inject_message("u1", "c2", "to random");

    let g = general
        .next_within(WAIT)
        .await
        .expect("no timeout")
        .expect("stream alive")
        .expect("ok message");
    let r = random
        .next_within(WAIT)
        .await
        .expect("no timeout")
        .expect("stream alive")
        .expect("ok message");
    assert_eq!(g.body, "to general");
    assert_eq!(r.body, "to random");
}
