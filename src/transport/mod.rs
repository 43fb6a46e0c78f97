//! STOMP-over-WebSocket transport layer.
//!
//! This module owns the single connection to the chat relay: handshake,
//! heartbeats, topic subscriptions, publishing, and automatic
//! reconnection.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Transport      │                              │  Chat relay     │
//! │                 │     STOMP over WebSocket     │  (STOMP broker) │
//! │  Link           │◄────────────────────────────►│                 │
//! │  → event loop   │   /topic/...  ◄──  /app/...  │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Connector::connect` - Open the socket
//! 2. `CONNECT` / `CONNECTED` - Negotiate version and heartbeats
//! 3. `Link` - Event loop reads frames and writes queued commands
//! 4. On unexpected loss: `Reconnecting`, fixed delay, bounded attempts
//! 5. `Transport::disconnect` - `UNSUBSCRIBE`, `DISCONNECT`, close
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `client` | Public [`Transport`] handle and reconnection |
//! | `config` | [`TransportConfig`] |
//! | `connection` | Handshake, heartbeat negotiation, event loop |
//! | `connector` | Socket establishment seam |
//! | `state` | [`ConnectionState`] |

// ============================================================================
// Submodules
// ============================================================================

/// Public transport handle.
pub mod client;

/// Transport configuration.
pub mod config;

/// Handshake and per-socket event loop.
pub(crate) mod connection;

/// Socket establishment.
pub mod connector;

/// Connection lifecycle state.
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Re-exports
// ============================================================================

pub use client::Transport;
pub use config::{DEFAULT_URL, TransportConfig};
pub use connector::{Connector, Socket, SocketSink, SocketStream, WebSocketConnector};
pub use state::ConnectionState;
