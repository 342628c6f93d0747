//! The adapter seam: one backend connection multiplexed to many subscribers.
//!
//! [`ChatBackendAdapter`] bridges a push-based [`ChatBackend`] to a
//! pull/subscribe consumer model. One pump task reads the backend's event
//! feed, parses raw payloads into [`Message`]s, and fans them out over a
//! broadcast channel; each [`Subscription`] runs a relay task that applies
//! its filter and forwards into the bounded channel the consumer reads.
//!
//! The adapter is a thin seam: it never retries, never spawns workers beyond
//! the pump and relays, and leaves reconnection policy to the backend.

use std::collections::BTreeSet;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_stream::Stream;
use tracing::{debug, info, warn};

use crate::backend::{ChatBackend, RawEvent};
use crate::error::{AdapterError, BackendError};
use crate::types::{Activity, ActivityKind, ChannelKind, Message, PresenceUpdate};

/// Default bound for presence acknowledgment.
pub const DEFAULT_PRESENCE_TIMEOUT: Duration = Duration::from_secs(5);

/// Broadcast capacity between the pump and subscription relays.
const EVENT_BUFFER: usize = 256;

/// Bound of the per-subscription delivery channel.
const SUBSCRIPTION_BUFFER: usize = 64;

// ---------------------------------------------------------------------------
// Subscription filter
// ---------------------------------------------------------------------------

/// What a subscription wants to see. Immutable once the subscription is
/// active.
#[derive(Debug, Clone)]
pub struct SubscriptionFilter {
    /// Channel names or ids to include; empty means all channels.
    /// Names are resolved to ids when the subscription is established.
    pub channels: BTreeSet<String>,
    /// Drop messages authored by the backend's own identity.
    pub skip_own: bool,
    /// Drop messages observed before the subscription started.
    pub skip_history: bool,
}

impl Default for SubscriptionFilter {
    fn default() -> Self {
        SubscriptionFilter {
            channels: BTreeSet::new(),
            skip_own: true,
            skip_history: true,
        }
    }
}

impl SubscriptionFilter {
    /// Subscribe to every channel (own and historical messages still skipped).
    pub fn all() -> Self {
        SubscriptionFilter::default()
    }

    /// Subscribe to the given channels, by name or id.
    pub fn channels<I, S>(channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SubscriptionFilter {
            channels: channels.into_iter().map(Into::into).collect(),
            ..SubscriptionFilter::default()
        }
    }

    /// Set whether messages from the authenticated identity are dropped.
    #[must_use]
    pub fn skip_own(mut self, skip: bool) -> Self {
        self.skip_own = skip;
        self
    }

    /// Set whether messages observed before subscription start are dropped.
    #[must_use]
    pub fn skip_history(mut self, skip: bool) -> Self {
        self.skip_history = skip;
        self
    }
}

/// A filter with names resolved and connect-time facts captured.
#[derive(Debug)]
struct ResolvedFilter {
    channel_ids: BTreeSet<String>,
    skip_own: bool,
    skip_history: bool,
    own_identity: String,
    started_at: DateTime<Utc>,
}

impl ResolvedFilter {
    /// Whether a message passes the filter. Pure; order-preserving by
    /// construction since it only ever drops.
    fn admits(&self, msg: &Message) -> bool {
        if self.skip_own && msg.author_id == self.own_identity {
            return false;
        }
        if self.skip_history && msg.timestamp < self.started_at {
            return false;
        }
        if !self.channel_ids.is_empty() && !self.channel_ids.contains(&msg.channel_id) {
            return false;
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Wire parsing
// ---------------------------------------------------------------------------

/// Shape of the raw payload the backend feed delivers.
///
/// `author_id` and `channel_id` are mandatory; everything else defaults.
#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    author: String,
    author_id: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    channel: String,
    channel_id: String,
    #[serde(default)]
    kind: ChannelKind,
    #[serde(default)]
    body: String,
    #[serde(default)]
    reaction: Option<String>,
    #[serde(default)]
    thread_id: Option<String>,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
}

/// Parse a raw event into a [`Message`].
///
/// Missing timestamps fall back to the backend's observation time. The raw
/// payload is retained on the message for downstream consumers that need
/// platform fields the normalized shape drops.
fn parse_event(raw: &RawEvent) -> Result<Message, AdapterError> {
    let wire: WireMessage = serde_json::from_value(raw.payload.clone())?;
    Ok(Message {
        author: wire.author,
        author_id: wire.author_id,
        tags: wire.tags,
        channel: wire.channel,
        channel_id: wire.channel_id,
        channel_kind: wire.kind,
        body: wire.body,
        reaction: wire.reaction,
        thread_id: wire.thread_id,
        timestamp: wire.timestamp.unwrap_or(raw.observed_at),
        raw: Some(raw.payload.clone()),
    })
}

/// Map a presence update's text onto an activity when none is set.
///
/// Backends carry free-form status text as a custom activity; an explicit
/// activity wins over status text.
fn presence_activity(update: &PresenceUpdate) -> Option<Activity> {
    if let Some(activity) = &update.activity {
        return Some(activity.clone());
    }
    update.status_text.as_ref().map(|text| Activity {
        kind: ActivityKind::Custom,
        name: text.clone(),
    })
}

// ---------------------------------------------------------------------------
// Connection state
// ---------------------------------------------------------------------------

/// Fan-out item between the pump and subscription relays.
#[derive(Debug, Clone)]
enum StreamEvent {
    /// A parsed inbound message.
    Inbound(Message),
    /// The connection dropped unexpectedly; terminal for every subscription.
    Lost(String),
}

/// One live backend connection.
struct Connection {
    /// The backend's authenticated identity, captured once at connect.
    identity: String,
    events: broadcast::Sender<StreamEvent>,
    pump: JoinHandle<()>,
}

enum ConnState {
    Disconnected,
    Connected(Arc<Connection>),
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// Bridges one push-based chat backend to many stream consumers.
///
/// The connection is established lazily on the first `subscribe` or
/// `publish` call and shared by every subscription spawned from this
/// instance. The adapter never retries; connection failures surface once per
/// triggering call as typed errors.
pub struct ChatBackendAdapter<B: ChatBackend> {
    backend: Arc<B>,
    state: Mutex<ConnState>,
}

impl<B: ChatBackend> ChatBackendAdapter<B> {
    /// Wrap a backend. No connection is made until first use.
    pub fn new(backend: B) -> Self {
        ChatBackendAdapter {
            backend: Arc::new(backend),
            state: Mutex::new(ConnState::Disconnected),
        }
    }

    /// Access the wrapped backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Establish the connection if none is live, returning the shared handle.
    async fn ensure_connected(&self) -> Result<Arc<Connection>, AdapterError> {
        let mut state = self.state.lock().await;
        if let ConnState::Connected(conn) = &*state {
            if !conn.pump.is_finished() {
                return Ok(Arc::clone(conn));
            }
            // The previous connection dropped; establish a fresh one.
            debug!("previous connection ended, reconnecting");
        }

        debug!("establishing backend connection");
        let feed = self
            .backend
            .connect()
            .await
            .map_err(AdapterError::Connection)?;
        let identity = self
            .backend
            .authenticated_identity()
            .await
            .map_err(AdapterError::Connection)?;

        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let pump = tokio::spawn(pump_loop(feed, events.clone()));
        let conn = Arc::new(Connection {
            identity,
            events,
            pump,
        });
        info!(identity = %conn.identity, "backend connected");
        *state = ConnState::Connected(Arc::clone(&conn));
        Ok(conn)
    }

    /// Subscribe to inbound messages matching `filter`.
    ///
    /// Connects lazily, resolves channel names against the backend directory,
    /// and returns an active stream handle immediately; events arrive
    /// asynchronously. If any name fails to resolve the whole call fails with
    /// [`AdapterError::Resolution`] listing every unresolved name.
    pub async fn subscribe(
        &self,
        filter: SubscriptionFilter,
    ) -> Result<Subscription, AdapterError> {
        let conn = self.ensure_connected().await?;

        let mut channel_ids = BTreeSet::new();
        let mut unresolved = Vec::new();
        for entry in &filter.channels {
            match self.backend.resolve_channel(entry).await {
                Ok(id) => {
                    channel_ids.insert(id);
                }
                Err(BackendError::NotFound(_)) => unresolved.push(entry.clone()),
                Err(e) => return Err(AdapterError::Connection(e)),
            }
        }
        if !unresolved.is_empty() {
            return Err(AdapterError::Resolution { unresolved });
        }

        let resolved = ResolvedFilter {
            channel_ids,
            skip_own: filter.skip_own,
            skip_history: filter.skip_history,
            own_identity: conn.identity.clone(),
            started_at: Utc::now(),
        };
        debug!(?resolved, "subscription established");

        let mut events = conn.events.subscribe();
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let relay = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(StreamEvent::Inbound(msg)) => {
                        if !resolved.admits(&msg) {
                            continue;
                        }
                        if tx.send(Ok(msg)).await.is_err() {
                            break; // consumer gone
                        }
                    }
                    Ok(StreamEvent::Lost(reason)) => {
                        let _ = tx.send(Err(AdapterError::ConnectionLost(reason))).await;
                        break;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "slow subscription consumer, dropped oldest events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break, // clean disconnect
                }
            }
        });

        Ok(Subscription { rx, relay })
    }

    /// Send a message, routed by its channel and thread fields.
    ///
    /// Returns the backend's reference for the sent message. No retry: a
    /// rejection surfaces as [`AdapterError::Send`], an unreachable backend
    /// as [`AdapterError::Connection`]. Retry and backoff policy belong to
    /// the backend or the caller, not this seam.
    pub async fn publish(&self, message: &Message) -> Result<String, AdapterError> {
        self.ensure_connected().await?;
        match self.backend.send(&message.channel_id, message).await {
            Ok(sent_ref) => {
                debug!(channel_id = %message.channel_id, %sent_ref, "message published");
                Ok(sent_ref)
            }
            Err(e @ BackendError::Unreachable(_)) => Err(AdapterError::Connection(e)),
            Err(e) => Err(AdapterError::Send(e)),
        }
    }

    /// Publish a presence update bounded by [`DEFAULT_PRESENCE_TIMEOUT`].
    pub async fn publish_presence(&self, update: &PresenceUpdate) -> Result<(), AdapterError> {
        self.publish_presence_within(update, DEFAULT_PRESENCE_TIMEOUT)
            .await
    }

    /// Publish a presence update bounded by `limit`.
    ///
    /// The bound covers the whole operation including a lazy connect, so a
    /// hung connect cannot leave the adapter connecting forever; the state
    /// only becomes connected after the backend succeeds.
    pub async fn publish_presence_within(
        &self,
        update: &PresenceUpdate,
        limit: Duration,
    ) -> Result<(), AdapterError> {
        let op = async {
            self.ensure_connected().await?;
            let activity = presence_activity(update);
            self.backend
                .set_presence(update.status.as_wire_str(), activity.as_ref())
                .await
                .map_err(|e| match e {
                    e @ BackendError::Unreachable(_) => AdapterError::Connection(e),
                    e => AdapterError::Send(e),
                })
        };
        match tokio::time::timeout(limit, op).await {
            Ok(result) => result,
            Err(_) => Err(AdapterError::Timeout { limit }),
        }
    }

    /// Tear down the live connection, if any. Idempotent.
    ///
    /// Active subscriptions end cleanly (their streams return `None`); an
    /// in-flight `publish` on another task is not interrupted.
    pub async fn disconnect(&self) -> Result<(), AdapterError> {
        let mut state = self.state.lock().await;
        if let ConnState::Connected(conn) = std::mem::replace(&mut *state, ConnState::Disconnected)
        {
            conn.pump.abort();
            self.backend
                .disconnect()
                .await
                .map_err(AdapterError::Connection)?;
            info!("backend disconnected");
        }
        Ok(())
    }
}

/// Read the backend feed, parse, and fan out until the feed ends.
///
/// Malformed payloads are logged and skipped; a single bad event never
/// terminates the long-lived subscriptions downstream. The feed ending while
/// the pump is still alive means the connection dropped, which is broadcast
/// as a terminal [`StreamEvent::Lost`]. A deliberate disconnect aborts the
/// pump first, so subscriptions see a clean close instead.
async fn pump_loop(mut feed: mpsc::Receiver<RawEvent>, events: broadcast::Sender<StreamEvent>) {
    while let Some(raw) = feed.recv().await {
        match parse_event(&raw) {
            // Send fails only when no subscription is listening; fine.
            Ok(msg) => {
                let _ = events.send(StreamEvent::Inbound(msg));
            }
            Err(e) => warn!(error = %e, "dropping malformed inbound payload"),
        }
    }
    warn!("backend event feed closed unexpectedly");
    let _ = events.send(StreamEvent::Lost("backend event feed closed".to_owned()));
}

// ---------------------------------------------------------------------------
// Subscription handle
// ---------------------------------------------------------------------------

/// A live subscription: a lazy, unbounded, non-restartable sequence of
/// inbound messages.
///
/// Yields `Ok(Message)` for each admitted event, a single terminal
/// `Err(AdapterError::ConnectionLost)` if the connection drops, then ends.
/// A clean [`ChatBackendAdapter::disconnect`] ends the stream without an
/// error. Dropping the handle cancels delivery promptly.
pub struct Subscription {
    rx: mpsc::Receiver<Result<Message, AdapterError>>,
    relay: JoinHandle<()>,
}

impl Subscription {
    /// Wait for the next item, or `None` when the stream has ended.
    pub async fn next(&mut self) -> Option<Result<Message, AdapterError>> {
        self.rx.recv().await
    }

    /// Race the next item against a timer.
    ///
    /// Returns `Err(AdapterError::Timeout)` if nothing arrives within
    /// `limit`; the subscription remains usable afterwards.
    pub async fn next_within(
        &mut self,
        limit: Duration,
    ) -> Result<Option<Result<Message, AdapterError>>, AdapterError> {
        match tokio::time::timeout(limit, self.rx.recv()).await {
            Ok(item) => Ok(item),
            Err(_) => Err(AdapterError::Timeout { limit }),
        }
    }

    /// Stop delivery. Equivalent to dropping the handle; in-flight
    /// `publish` calls on the same adapter are unaffected.
    pub fn cancel(self) {
        // Drop does the work.
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.relay.abort();
    }
}

impl Stream for Subscription {
    type Item = Result<Message, AdapterError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
