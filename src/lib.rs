//! SyncParty chat - Resilient STOMP-over-WebSocket chat client.
//!
//! This library connects a co-watching room's participants to the chat
//! relay and keeps them connected.
//!
//! # Architecture
//!
//! Three layers, bottom to top:
//!
//! - **Transport**: one STOMP connection with heartbeats, topic
//!   subscriptions, publishing, and bounded fixed-delay reconnection
//! - **Room Session**: one user's membership of one room (subscribe,
//!   `JOIN`, chat, `LEAVE`) with wire-to-domain message translation
//! - **Message Dispatcher**: fan-out of translated messages to listeners
//!
//! Key design principles:
//!
//! - Explicit ownership: no global instances; callers own their sessions
//! - One event loop task per physical connection
//! - Chat sends while disconnected fail loudly, never silently drop
//! - Reconnection is invisible while it succeeds within the bound
//!
//! # Quick Start
//!
//! ```no_run
//! use syncparty_chat::{Result, RoomSession, TransportConfig, generate_user_id};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let session = RoomSession::from_config(TransportConfig::default())?;
//!
//!     let user_id = generate_user_id();
//!     session.initialize("ABC123", &user_id, "Alice").await?;
//!
//!     let _handle = session.on_message(|message| {
//!         println!("{}: {}", message.user_name, message.message);
//!     });
//!
//!     session.send_message("hello")?;
//!     session.leave().await;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`chat`] | [`RoomSession`], [`MessageDispatcher`], [`ChatMessage`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | STOMP frame codec and relay payloads |
//! | [`transport`] | [`Transport`] connection management |

// ============================================================================
// Modules
// ============================================================================

/// Room chat layer: sessions, listeners, messages.
pub mod chat;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for subscriptions and listeners.
pub mod identifiers;

/// STOMP frames and relay payloads.
pub mod protocol;

/// Connection to the relay.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Chat types
pub use chat::{
    ChatMessage, ListenerHandle, MessageDispatcher, RoomInfo, RoomSession, generate_user_id,
    profile_image_url, random_profile_image,
};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ListenerId, SubscriptionId};

// Protocol types
pub use protocol::{FrameType, OutboundFrame, WireFrame};

// Transport types
pub use transport::{ConnectionState, Connector, Transport, TransportConfig, WebSocketConnector};
