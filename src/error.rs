//! Error taxonomy for the adapter seam.
//!
//! Backend rejections are typed separately ([`BackendError`]) from the
//! adapter-level failures callers see ([`AdapterError`]), so a backend
//! implementation never has to know how its errors surface downstream.

use std::time::Duration;

use thiserror::Error;

/// Errors a backend collaborator may return from its contract methods.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// The named channel or user does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The backend rejected the call due to rate limiting.
    #[error("rate limited")]
    RateLimited,

    /// The authenticated identity lacks permission for the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The backend is unreachable or the connection is down.
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    /// Any other backend API failure.
    #[error("backend API error: {0}")]
    Api(String),
}

/// Errors surfaced to callers of the adapter.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// One or more channel names could not be resolved to ids.
    ///
    /// All unresolved names are reported; the filter is never silently
    /// truncated to the names that did resolve.
    #[error("could not resolve channels: {}", unresolved.join(", "))]
    Resolution {
        /// The names that failed to resolve.
        unresolved: Vec<String>,
    },

    /// The backend rejected an outbound message.
    #[error("send rejected")]
    Send(#[source] BackendError),

    /// The backend did not acknowledge within the allowed bound.
    #[error("backend did not acknowledge within {limit:?}")]
    Timeout {
        /// The bound that elapsed.
        limit: Duration,
    },

    /// The backend could not be reached for the operation.
    #[error("connection failed")]
    Connection(#[source] BackendError),

    /// An established connection dropped mid-subscription.
    ///
    /// Delivered as the terminal item on a subscription stream so consumers
    /// can tell a failed stream from one that ended cleanly.
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// A raw inbound payload could not be parsed into a [`Message`].
    ///
    /// Recovered locally by the adapter (logged and skipped); never
    /// propagated to subscription consumers.
    ///
    /// [`Message`]: crate::types::Message
    #[error("malformed inbound payload")]
    Parse(#[from] serde_json::Error),
}

/// Errors from configuration validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither `token` nor `token_file` yielded a token.
    #[error("no token configured: set `token` or `token_file`")]
    MissingToken,

    /// The token is present but malformed.
    #[error("invalid token: {0}")]
    InvalidToken(String),
}
