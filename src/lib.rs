//! chatbridge — a streaming adapter seam for chat backends.
//!
//! Bridges a push-based chat backend (connect / receive-loop / send) to a
//! pull/subscribe consumer model: channel-name resolution, self-message
//! filtering, history suppression, and presence publication with timeout.
//! The platform specifics (wire protocol, rate limiting, reconnection) live
//! behind the [`ChatBackend`] trait; this crate is the thin seam on top.
//!
//! ```no_run
//! use chatbridge::{ChatBackendAdapter, SubscriptionFilter};
//! use chatbridge::testing::MockBackend;
//!
//! # async fn run() -> Result<(), chatbridge::AdapterError> {
//! let adapter = ChatBackendAdapter::new(MockBackend::new("bot").with_channel("general", "c1"));
//! let mut messages = adapter.subscribe(SubscriptionFilter::channels(["general"])).await?;
//! while let Some(msg) = messages.next().await {
//!     let msg = msg?;
//!     adapter.publish(&msg.reply("hello!")).await?;
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod adapter;
pub mod backend;
pub mod config;
pub mod error;
pub mod logging;
pub mod mention;
pub mod testing;
pub mod types;

pub use adapter::{ChatBackendAdapter, Subscription, SubscriptionFilter, DEFAULT_PRESENCE_TIMEOUT};
pub use backend::{ChatBackend, RawEvent};
pub use config::{Config, RawConfig};
pub use error::{AdapterError, BackendError, ConfigError};
pub use mention::{mention_channel, mention_everyone, mention_here, mention_role, mention_user};
pub use types::{
    Activity, ActivityKind, ChannelKind, Message, PresenceStatus, PresenceUpdate,
};
