//! Transport configuration.
//!
//! Provides a type-safe interface for the relay URL, heartbeat intervals,
//! reconnection policy, and broker destination prefixes.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use syncparty_chat::TransportConfig;
//!
//! let config = TransportConfig::new("wss://relay.example.com/ws/websocket")
//!     .with_heartbeat(Duration::from_secs(10), Duration::from_secs(10))
//!     .with_reconnect(Duration::from_secs(1), 10);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default relay endpoint (raw WebSocket behind the SockJS endpoint).
pub const DEFAULT_URL: &str = "ws://localhost:8080/ws/websocket";

/// Default outbound heartbeat interval.
const DEFAULT_HEARTBEAT_OUTGOING: Duration = Duration::from_millis(4000);

/// Default inbound heartbeat interval.
const DEFAULT_HEARTBEAT_INCOMING: Duration = Duration::from_millis(4000);

/// Fixed delay before each reconnect attempt.
const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3000);

/// Reconnect attempts before settling into `Failed`.
const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Timeout for the CONNECT/CONNECTED exchange.
const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

/// Largest JSON body accepted by `send` (the relay's default message
/// size limit).
const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024;

/// Broker prefix for subscribe destinations.
const DEFAULT_TOPIC_PREFIX: &str = "/topic/";

/// Broker prefix for publish destinations.
const DEFAULT_APP_PREFIX: &str = "/app/";

// ============================================================================
// TransportConfig
// ============================================================================

/// Configuration for a [`Transport`](super::Transport).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Relay WebSocket URL (`ws://` or `wss://`).
    pub url: String,

    /// How often we promise to send heartbeats. Zero disables.
    pub heartbeat_outgoing: Duration,

    /// How often we want the relay to send heartbeats. Zero disables.
    pub heartbeat_incoming: Duration,

    /// Delay before each reconnect attempt.
    pub reconnect_delay: Duration,

    /// Reconnect attempts after an unexpected disconnect. Zero disables
    /// automatic reconnection.
    pub max_reconnect_attempts: u32,

    /// Upper bound on the STOMP handshake.
    pub handshake_timeout: Duration,

    /// Largest JSON body, in bytes, that `send` will publish.
    pub max_frame_size: usize,

    /// Prefix applied to subscribe destinations.
    pub topic_prefix: String,

    /// Prefix applied to publish destinations.
    pub app_prefix: String,

    /// Value of the CONNECT `host` header. Defaults to the URL host.
    pub host: Option<String>,

    /// Optional CONNECT `login` header.
    pub login: Option<String>,

    /// Optional CONNECT `passcode` header.
    pub passcode: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::new(DEFAULT_URL)
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl TransportConfig {
    /// Creates a configuration for the given relay URL with default settings.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            heartbeat_outgoing: DEFAULT_HEARTBEAT_OUTGOING,
            heartbeat_incoming: DEFAULT_HEARTBEAT_INCOMING,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            topic_prefix: DEFAULT_TOPIC_PREFIX.to_owned(),
            app_prefix: DEFAULT_APP_PREFIX.to_owned(),
            host: None,
            login: None,
            passcode: None,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl TransportConfig {
    /// Sets outbound and inbound heartbeat intervals.
    #[inline]
    #[must_use]
    pub fn with_heartbeat(mut self, outgoing: Duration, incoming: Duration) -> Self {
        self.heartbeat_outgoing = outgoing;
        self.heartbeat_incoming = incoming;
        self
    }

    /// Sets the reconnect delay and attempt bound.
    #[inline]
    #[must_use]
    pub fn with_reconnect(mut self, delay: Duration, max_attempts: u32) -> Self {
        self.reconnect_delay = delay;
        self.max_reconnect_attempts = max_attempts;
        self
    }

    /// Sets the handshake timeout.
    #[inline]
    #[must_use]
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Sets the largest body `send` will publish.
    #[inline]
    #[must_use]
    pub fn with_max_frame_size(mut self, bytes: usize) -> Self {
        self.max_frame_size = bytes;
        self
    }

    /// Sets broker destination prefixes.
    #[inline]
    #[must_use]
    pub fn with_prefixes(mut self, topic: impl Into<String>, app: impl Into<String>) -> Self {
        self.topic_prefix = topic.into();
        self.app_prefix = app.into();
        self
    }

    /// Overrides the CONNECT `host` header.
    #[inline]
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets CONNECT credentials.
    #[inline]
    #[must_use]
    pub fn with_credentials(mut self, login: impl Into<String>, passcode: impl Into<String>) -> Self {
        self.login = Some(login.into());
        self.passcode = Some(passcode.into());
        self
    }
}

// ============================================================================
// Validation & Destinations
// ============================================================================

impl TransportConfig {
    /// Validates the configuration and returns the parsed relay URL.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the URL does not parse or is not `ws`/`wss`
    /// - [`Error::Config`] if the handshake timeout or frame size limit is zero
    pub fn validate(&self) -> Result<Url> {
        let url = Url::parse(&self.url)
            .map_err(|e| Error::config(format!("Invalid relay URL '{}': {e}", self.url)))?;

        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(Error::config(format!(
                "Relay URL must use ws:// or wss://, got '{}'",
                url.scheme()
            )));
        }

        if self.handshake_timeout.is_zero() {
            return Err(Error::config("Handshake timeout must be greater than zero"));
        }

        if self.max_frame_size == 0 {
            return Err(Error::config("Max frame size must be greater than zero"));
        }

        Ok(url)
    }

    /// Returns the CONNECT `host` header value.
    #[must_use]
    pub fn host_header(&self, url: &Url) -> String {
        self.host
            .clone()
            .or_else(|| url.host_str().map(str::to_owned))
            .unwrap_or_else(|| "/".to_owned())
    }

    /// Maps a logical subscribe destination to the broker destination.
    #[inline]
    #[must_use]
    pub fn topic_destination(&self, destination: &str) -> String {
        format!("{}{destination}", self.topic_prefix)
    }

    /// Maps a logical publish destination to the broker destination.
    #[inline]
    #[must_use]
    pub fn app_destination(&self, destination: &str) -> String {
        format!("{}{destination}", self.app_prefix)
    }
}

// ============================================================================
// Tests
// ============================================================================
