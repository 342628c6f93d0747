//! Minimal end-to-end demo: react with a wave to any message saying hello.
//!
//! Uses the in-memory [`MockBackend`] so it runs without credentials. A real
//! integration substitutes a backend implementing [`chatbridge::ChatBackend`].
//!
//! ```text
//! cargo run --example hello
//! ```

use std::time::Duration;

use chatbridge::testing::MockBackend;
use chatbridge::{ChatBackendAdapter, SubscriptionFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    chatbridge::logging::init_stderr();

    let backend = MockBackend::new("bot").with_channel("general", "c1");
    let adapter = ChatBackendAdapter::new(backend);

    let mut messages = adapter
        .subscribe(SubscriptionFilter::channels(["general"]))
        .await?;

    // Simulate two inbound messages.
    adapter.backend().inject_message("u1", "c1", "hello everyone");
    adapter.backend().inject_message("u2", "c1", "unrelated chatter");

    while let Ok(Some(msg)) = messages.next_within(Duration::from_millis(200)).await {
        let msg = msg?;
        println!("[{}] {}: {}", msg.channel_id, msg.author_id, msg.body);
        if msg.body.to_lowercase().contains("hello") {
            let sent_ref = adapter.publish(&msg.reply("").with_reaction("👋")).await?;
            println!("reacted with a wave ({sent_ref})");
        }
    }

    for record in adapter.backend().sent() {
        println!(
            "sent -> channel={} reaction={:?}",
            record.channel_id, record.reaction
        );
    }

    adapter.disconnect().await?;
    Ok(())
}
