//! Configuration in two explicit steps: load raw values (all I/O here),
//! then validate into a canonical immutable [`Config`].
//!
//! Precedence: env vars > config file > defaults. The legacy behaviour of a
//! token field that is transparently a file path is replaced by the explicit
//! `token_file` field; when both are set, the inline `token` wins.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Default presence acknowledgment bound, in seconds.
const DEFAULT_PRESENCE_TIMEOUT_SECS: u64 = 5;

/// Default capacity of the inbound event fan-out buffer.
const DEFAULT_EVENT_BUFFER: usize = 256;

// ---------------------------------------------------------------------------
// Raw config (step 1: I/O)
// ---------------------------------------------------------------------------

/// Raw configuration as read from TOML and the environment.
///
/// All I/O happens in [`RawConfig::load`], including the optional token-file
/// indirection. Nothing here is validated yet.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// Bot token, inline.
    pub token: Option<String>,
    /// Path to a file whose trimmed contents are the token.
    pub token_file: Option<PathBuf>,
    /// Gateway intents to request, e.g. `["guilds", "guild_messages"]`.
    pub intents: Vec<String>,
    /// Presence acknowledgment bound in seconds.
    pub presence_timeout_secs: Option<u64>,
    /// Capacity of the inbound event fan-out buffer.
    pub event_buffer: Option<usize>,
}

impl RawConfig {
    /// Load raw configuration from a TOML file, then apply env overrides and
    /// resolve the token-file indirection.
    ///
    /// A missing config file yields defaults (env overrides still apply).
    pub fn load(path: &Path) -> Result<Self> {
        let mut raw = match std::fs::read_to_string(path) {
            Ok(contents) => {
                tracing::info!(path = %path.display(), "loading config from file");
                toml::from_str(&contents).context("failed to parse config TOML")?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("no config file found, using defaults");
                RawConfig::default()
            }
            Err(e) => return Err(anyhow::anyhow!("failed to read config file: {e}")),
        };
        raw.apply_overrides(|key| std::env::var(key).ok());
        raw.read_token_file()?;
        Ok(raw)
    }

    /// Apply environment variable overrides (env > file > defaults).
    ///
    /// Takes a resolver function so tests can inject values without touching
    /// the process environment.
    pub fn apply_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("CHATBRIDGE_TOKEN") {
            self.token = Some(v);
        }
        if let Some(v) = env("CHATBRIDGE_TOKEN_FILE") {
            self.token_file = Some(PathBuf::from(v));
        }
        if let Some(v) = env("CHATBRIDGE_PRESENCE_TIMEOUT_SECS") {
            match v.parse() {
                Ok(n) => self.presence_timeout_secs = Some(n),
                Err(_) => tracing::warn!(
                    var = "CHATBRIDGE_PRESENCE_TIMEOUT_SECS",
                    value = %v,
                    "ignoring invalid env override"
                ),
            }
        }
    }

    /// Resolve the token-file indirection, if configured and no inline token
    /// is set. The remaining I/O step before validation.
    pub fn read_token_file(&mut self) -> Result<()> {
        if self.token.is_some() {
            return Ok(());
        }
        if let Some(path) = &self.token_file {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read token file {}", path.display()))?;
            self.token = Some(contents.trim().to_owned());
        }
        Ok(())
    }

    /// Validate and normalise into the canonical immutable [`Config`].
    ///
    /// Pure: performs no I/O. Intents are lowercased and deduplicated.
    pub fn validate(self) -> std::result::Result<Config, crate::error::ConfigError> {
        use crate::error::ConfigError;

        let token = self.token.ok_or(ConfigError::MissingToken)?;
        if token.is_empty() {
            return Err(ConfigError::MissingToken);
        }
        if token.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidToken(
                "token must not contain whitespace".to_owned(),
            ));
        }

        let mut intents: Vec<String> = self
            .intents
            .iter()
            .map(|i| i.trim().to_ascii_lowercase())
            .filter(|i| !i.is_empty())
            .collect();
        intents.sort();
        intents.dedup();

        Ok(Config {
            token,
            intents,
            presence_timeout: Duration::from_secs(
                self.presence_timeout_secs
                    .unwrap_or(DEFAULT_PRESENCE_TIMEOUT_SECS),
            ),
            event_buffer: self.event_buffer.unwrap_or(DEFAULT_EVENT_BUFFER),
        })
    }
}

// ---------------------------------------------------------------------------
// Canonical config (step 2: validated, immutable)
// ---------------------------------------------------------------------------

/// Validated, immutable configuration.
///
/// Construct via [`RawConfig::validate`]. The token is redacted from the
/// `Debug` output.
#[derive(Clone)]
pub struct Config {
    token: String,
    intents: Vec<String>,
    presence_timeout: Duration,
    event_buffer: usize,
}

impl Config {
    /// The bot token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Normalised gateway intents.
    pub fn intents(&self) -> &[String] {
        &self.intents
    }

    /// Presence acknowledgment bound.
    pub fn presence_timeout(&self) -> Duration {
        self.presence_timeout
    }

    /// Capacity of the inbound event fan-out buffer.
    pub fn event_buffer(&self) -> usize {
        self.event_buffer
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("token", &"<redacted>")
            .field("intents", &self.intents)
            .field("presence_timeout", &self.presence_timeout)
            .field("event_buffer", &self.event_buffer)
            .finish()
    }
}
