//! Discord-style mention markup helpers.
//!
//! Pure string formatting; no backend involvement. Useful when composing
//! outbound message bodies.

/// Mention a user by id: `<@id>`.
pub fn mention_user(user_id: &str) -> String {
    format!("<@{user_id}>")
}

/// Mention a channel by id: `<#id>`.
pub fn mention_channel(channel_id: &str) -> String {
    format!("<#{channel_id}>")
}

/// Mention a role by id: `<@&id>`.
pub fn mention_role(role_id: &str) -> String {
    format!("<@&{role_id}>")
}

/// Mention everyone in the channel.
pub fn mention_everyone() -> &'static str {
    "@everyone"
}

/// Mention everyone currently online in the channel.
pub fn mention_here() -> &'static str {
    "@here"
}
