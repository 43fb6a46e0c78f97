//! Connection state.

use std::fmt;

/// Lifecycle state of a [`Transport`](super::Transport).
///
/// ```text
/// Disconnected ──connect()──► Connecting ──ok──► Connected
///      ▲                          │                 │
///      │                        error          unexpected loss
///  disconnect()                   ▼                 ▼
///   (any state)                Failed ◄──bound── Reconnecting ──ok──► Connected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No socket; initial state and the state after `disconnect()`.
    #[default]
    Disconnected,
    /// Explicit `connect()` in flight.
    Connecting,
    /// Handshake complete; operations allowed.
    Connected,
    /// Lost unexpectedly; automatic retries scheduled.
    Reconnecting,
    /// Explicit connect failed or retries exhausted. Terminal until
    /// `connect()`.
    Failed,
}

impl ConnectionState {
    /// Returns `true` when operations are allowed.
    #[inline]
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns the state name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
