//! In-memory backend for tests and demos.
//!
//! [`MockBackend`] implements the full [`ChatBackend`] contract against
//! in-process state: a channel directory, a recorded outbox, recorded
//! presence updates, and an injectable inbound feed. Failure injection
//! hooks cover the error paths the adapter must surface.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::backend::{ChatBackend, RawEvent};
use crate::error::BackendError;
use crate::types::{Activity, Message};

/// Capacity of the mock inbound feed.
const FEED_BUFFER: usize = 64;

/// A message the mock recorded as sent.
#[derive(Debug, Clone)]
pub struct SentRecord {
    /// Channel the message was routed to.
    pub channel_id: String,
    /// Message body.
    pub body: String,
    /// Reaction emoji, if any.
    pub reaction: Option<String>,
    /// Thread routing, if any.
    pub thread_id: Option<String>,
    /// The reference returned to the sender.
    pub sent_ref: String,
}

/// A presence update the mock recorded.
#[derive(Debug, Clone)]
pub struct PresenceRecord {
    /// Wire status string.
    pub status: String,
    /// Activity, if any.
    pub activity: Option<Activity>,
}

#[derive(Default)]
struct Inner {
    connected: bool,
    directory: HashMap<String, String>,
    channel_ids: HashSet<String>,
    feed: Option<mpsc::Sender<RawEvent>>,
    sent: Vec<SentRecord>,
    presence: Vec<PresenceRecord>,
    fail_connect: Option<BackendError>,
    fail_send: VecDeque<BackendError>,
    presence_delay: Option<Duration>,
    next_ref: u64,
}

/// An in-memory [`ChatBackend`] with injectable events and failures.
pub struct MockBackend {
    identity: String,
    inner: Mutex<Inner>,
}

impl MockBackend {
    /// Create a mock whose authenticated identity is `identity`.
    pub fn new(identity: impl Into<String>) -> Self {
        MockBackend {
            identity: identity.into(),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Register a channel in the directory, builder style.
    #[must_use]
    pub fn with_channel(self, name: impl Into<String>, id: impl Into<String>) -> Self {
        self.add_channel(name, id);
        self
    }

    /// Register a channel in the directory.
    pub fn add_channel(&self, name: impl Into<String>, id: impl Into<String>) {
        let mut inner = self.lock();
        let id = id.into();
        inner.directory.insert(name.into(), id.clone());
        inner.channel_ids.insert(id);
    }

    /// Inject a raw inbound payload into the feed.
    ///
    /// # Panics
    ///
    /// Panics if the backend is not connected or the feed is full; both
    /// indicate a broken test setup.
    pub fn inject(&self, payload: serde_json::Value) {
        let tx = {
            let inner = self.lock();
            inner.feed.clone().expect("inject before connect")
        };
        tx.try_send(RawEvent::now(payload))
            .expect("mock feed full or closed");
    }

    /// Inject a well-formed message payload.
    pub fn inject_message(&self, author_id: &str, channel_id: &str, body: &str) {
        self.inject(serde_json::json!({
            "author": author_id,
            "author_id": author_id,
            "channel_id": channel_id,
            "kind": "public",
            "body": body,
        }));
    }

    /// Drop the inbound feed, simulating an unexpected connection loss.
    pub fn drop_connection(&self) {
        let mut inner = self.lock();
        inner.feed = None;
        inner.connected = false;
    }

    /// Make the next `connect` call fail with `err`.
    pub fn fail_connect(&self, err: BackendError) {
        self.lock().fail_connect = Some(err);
    }

    /// Queue a failure for the next `send` call.
    pub fn fail_next_send(&self, err: BackendError) {
        self.lock().fail_send.push_back(err);
    }

    /// Delay every `set_presence` call by `delay` before acknowledging.
    pub fn set_presence_delay(&self, delay: Duration) {
        self.lock().presence_delay = Some(delay);
    }

    /// Snapshot of everything sent through this backend.
    pub fn sent(&self) -> Vec<SentRecord> {
        self.lock().sent.clone()
    }

    /// Snapshot of recorded presence updates.
    pub fn presence_updates(&self) -> Vec<PresenceRecord> {
        self.lock().presence.clone()
    }

    /// Whether the mock considers itself connected.
    pub fn is_connected(&self) -> bool {
        self.lock().connected
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("mock backend lock poisoned")
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn connect(&self) -> Result<mpsc::Receiver<RawEvent>, BackendError> {
        let mut inner = self.lock();
        if let Some(err) = inner.fail_connect.take() {
            return Err(err);
        }
        let (tx, rx) = mpsc::channel(FEED_BUFFER);
        inner.feed = Some(tx);
        inner.connected = true;
        Ok(rx)
    }

    async fn disconnect(&self) -> Result<(), BackendError> {
        let mut inner = self.lock();
        inner.feed = None;
        inner.connected = false;
        Ok(())
    }

    async fn authenticated_identity(&self) -> Result<String, BackendError> {
        Ok(self.identity.clone())
    }

    async fn resolve_channel(&self, name_or_id: &str) -> Result<String, BackendError> {
        let inner = self.lock();
        if inner.channel_ids.contains(name_or_id) {
            return Ok(name_or_id.to_owned());
        }
        inner
            .directory
            .get(name_or_id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(name_or_id.to_owned()))
    }

    async fn send(&self, channel_id: &str, message: &Message) -> Result<String, BackendError> {
        let mut inner = self.lock();
        if let Some(err) = inner.fail_send.pop_front() {
            return Err(err);
        }
        if !inner.connected {
            return Err(BackendError::Unreachable("not connected".to_owned()));
        }
        inner.next_ref = inner.next_ref.wrapping_add(1);
        let sent_ref = format!("m{}", inner.next_ref);
        inner.sent.push(SentRecord {
            channel_id: channel_id.to_owned(),
            body: message.body.clone(),
            reaction: message.reaction.clone(),
            thread_id: message.thread_id.clone(),
            sent_ref: sent_ref.clone(),
        });
        Ok(sent_ref)
    }

    async fn set_presence(
        &self,
        status: &str,
        activity: Option<&Activity>,
    ) -> Result<(), BackendError> {
        let delay = self.lock().presence_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.lock().presence.push(PresenceRecord {
            status: status.to_owned(),
            activity: activity.cloned(),
        });
        Ok(())
    }
}
