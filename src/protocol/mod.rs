//! Relay wire protocol.
//!
//! The relay is a STOMP 1.2 broker reached over WebSocket. Each WebSocket
//! text message carries one or more STOMP frames; chat payloads travel as
//! JSON frame bodies.
//!
//! # Protocol Overview
//!
//! | STOMP Frame | Direction | Purpose |
//! |-------------|-----------|---------|
//! | `CONNECT` / `CONNECTED` | Client ↔ Relay | Handshake and heartbeat negotiation |
//! | `SUBSCRIBE` / `UNSUBSCRIBE` | Client → Relay | Topic membership |
//! | `SEND` | Client → Relay | Publish a JSON payload |
//! | `MESSAGE` | Relay → Client | Topic delivery |
//! | `ERROR` | Relay → Client | Fatal error, connection closes |
//!
//! # Destinations
//!
//! | Logical name | Broker destination | Payload |
//! |--------------|--------------------|---------|
//! | `room.<code>.chat` | `/topic/room.<code>.chat` | [`WireFrame`] (inbound) |
//! | `room.join` | `/app/room.join` | [`OutboundFrame`] type `JOIN` |
//! | `room.leave` | `/app/room.leave` | [`OutboundFrame`] type `LEAVE` |
//! | `chat.send` | `/app/chat.send` | [`OutboundFrame`] type `CHAT` |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `destination` | Destination names shared with the relay |
//! | `frame` | STOMP frame codec |
//! | `message` | JSON chat payloads |

// ============================================================================
// Submodules
// ============================================================================

/// Destination names shared with the relay.
pub mod destination;

/// STOMP frame codec.
pub mod frame;

/// JSON chat payloads.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use destination::{CHAT_SEND, ROOM_JOIN, ROOM_LEAVE, room_chat_topic};
pub use frame::{Command, Frame, HEARTBEAT, decode_all};
pub use message::{FrameType, OutboundFrame, WireFrame, parse_server_timestamp};
