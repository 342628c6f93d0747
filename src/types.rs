//! Core message and presence types shared by the adapter and backends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of channel a message was observed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// A channel visible to the whole workspace or guild.
    Public,
    /// A direct or group conversation.
    Private,
    /// A thread hanging off another channel.
    Thread,
}

impl Default for ChannelKind {
    fn default() -> Self {
        ChannelKind::Public
    }
}

/// A normalized chat message, inbound or outbound.
///
/// Inbound messages are built by the adapter from raw backend events and are
/// never mutated after construction. Outbound messages use the same shape but
/// a separate construction path ([`Message::outbound`], [`Message::reply`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Display name of the author, empty for outbound messages.
    #[serde(default)]
    pub author: String,
    /// Stable backend identifier of the author.
    #[serde(default)]
    pub author_id: String,
    /// Identifiers of entities mentioned in the body.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Human-readable channel name.
    #[serde(default)]
    pub channel: String,
    /// Stable backend identifier of the channel.
    pub channel_id: String,
    /// Kind of channel the message belongs to.
    #[serde(default)]
    pub channel_kind: ChannelKind,
    /// Parsed text payload.
    #[serde(default)]
    pub body: String,
    /// Emoji reaction to attach or that was attached.
    #[serde(default)]
    pub reaction: Option<String>,
    /// Thread identifier, if the message lives in a thread.
    #[serde(default)]
    pub thread_id: Option<String>,
    /// When the backend observed the message.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Opaque raw payload as delivered by the backend, if retained.
    #[serde(default)]
    pub raw: Option<serde_json::Value>,
}

impl Message {
    /// Build an outbound message targeting a channel by id.
    pub fn outbound(channel_id: impl Into<String>, body: impl Into<String>) -> Self {
        Message {
            author: String::new(),
            author_id: String::new(),
            tags: Vec::new(),
            channel: String::new(),
            channel_id: channel_id.into(),
            channel_kind: ChannelKind::Public,
            body: body.into(),
            reaction: None,
            thread_id: None,
            timestamp: Utc::now(),
            raw: None,
        }
    }

    /// Build a reply to this message, preserving channel and thread routing.
    pub fn reply(&self, body: impl Into<String>) -> Self {
        Message {
            thread_id: self.thread_id.clone(),
            channel: self.channel.clone(),
            channel_kind: self.channel_kind,
            ..Message::outbound(self.channel_id.clone(), body)
        }
    }

    /// Attach a reaction emoji, consuming and returning the message.
    #[must_use]
    pub fn with_reaction(mut self, emoji: impl Into<String>) -> Self {
        self.reaction = Some(emoji.into());
        self
    }
}

/// Presence status for the authenticated identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    /// Actively available.
    Online,
    /// Away from keyboard.
    Idle,
    /// Do not disturb.
    Dnd,
    /// Appearing offline.
    Offline,
}

impl PresenceStatus {
    /// The wire string backends expect for this status.
    ///
    /// Pure mapping, kept out of the async seam so it can be tested directly.
    pub fn as_wire_str(self) -> &'static str {
        match self {
            PresenceStatus::Online => "online",
            PresenceStatus::Idle => "idle",
            PresenceStatus::Dnd => "dnd",
            PresenceStatus::Offline => "offline",
        }
    }
}

/// Activity kind attached to a presence update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    /// "Playing {name}".
    Playing,
    /// "Streaming {name}".
    Streaming,
    /// "Listening to {name}".
    Listening,
    /// "Watching {name}".
    Watching,
    /// "Competing in {name}".
    Competing,
    /// Free-form custom status.
    Custom,
}

/// An activity descriptor shown alongside presence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    /// Kind of activity.
    pub kind: ActivityKind,
    /// Activity label.
    pub name: String,
}

/// A presence update. Transient; only the latest value matters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceUpdate {
    /// The status to publish.
    pub status: PresenceStatus,
    /// Optional free-form status text.
    pub status_text: Option<String>,
    /// Optional activity descriptor.
    pub activity: Option<Activity>,
}

impl PresenceUpdate {
    /// A bare status update with no text or activity.
    pub fn status(status: PresenceStatus) -> Self {
        PresenceUpdate {
            status,
            status_text: None,
            activity: None,
        }
    }
}
