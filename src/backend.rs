//! The backend collaborator contract consumed by the adapter.
//!
//! A backend owns the platform specifics: transport, authentication, rate
//! limiting, reconnection. The adapter only relies on the small surface
//! defined by [`ChatBackend`]. The in-memory [`MockBackend`] in
//! [`crate::testing`] implements it for tests and demos.
//!
//! [`MockBackend`]: crate::testing::MockBackend

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::error::BackendError;
use crate::types::{Activity, Message};

/// A raw inbound record pushed by the backend's receive loop.
///
/// The payload is opaque JSON; the adapter parses it into a [`Message`] and
/// drops records that do not parse. `observed_at` is stamped by the backend
/// when the event was received and is used for history suppression.
#[derive(Debug, Clone)]
pub struct RawEvent {
    /// When the backend observed the event.
    pub observed_at: DateTime<Utc>,
    /// The event body as delivered by the platform.
    pub payload: serde_json::Value,
}

impl RawEvent {
    /// Wrap a payload observed now.
    pub fn now(payload: serde_json::Value) -> Self {
        RawEvent {
            observed_at: Utc::now(),
            payload,
        }
    }
}

/// Contract the adapter expects from a chat backend.
///
/// All methods take `&self`; implementations manage interior state. The
/// adapter establishes at most one live connection per instance and calls
/// [`connect`](ChatBackend::connect) once per connection.
#[async_trait]
pub trait ChatBackend: Send + Sync + 'static {
    /// Establish the connection and hand back the inbound event feed.
    ///
    /// The feed ends (the channel closes) when the connection drops or
    /// [`disconnect`](ChatBackend::disconnect) is called. Reconnection and
    /// replay policy live inside the backend, not the adapter.
    async fn connect(&self) -> Result<mpsc::Receiver<RawEvent>, BackendError>;

    /// Tear down the connection. Idempotent.
    async fn disconnect(&self) -> Result<(), BackendError>;

    /// The backend's own authenticated user id.
    ///
    /// Captured once per connection by the adapter and cached; used for
    /// self-message filtering.
    async fn authenticated_identity(&self) -> Result<String, BackendError>;

    /// Resolve a channel name or id to a stable channel id.
    ///
    /// Ids pass through unchanged. Unknown names fail with
    /// [`BackendError::NotFound`].
    async fn resolve_channel(&self, name_or_id: &str) -> Result<String, BackendError>;

    /// Send an outbound message, routed by the message's channel and thread
    /// fields. Returns the backend's reference for the sent message.
    async fn send(&self, channel_id: &str, message: &Message) -> Result<String, BackendError>;

    /// Update presence. The adapter owns the acknowledgment timeout.
    async fn set_presence(
        &self,
        status: &str,
        activity: Option<&Activity>,
    ) -> Result<(), BackendError>;
}
