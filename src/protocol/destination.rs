//! Destination names shared with the relay.
//!
//! These strings are a contract with the relay server. Broker prefixes
//! (`/topic/`, `/app/`) are applied by the transport configuration.

/// Publish target announcing that a user joined a room.
pub const ROOM_JOIN: &str = "room.join";

/// Publish target announcing that a user left a room.
pub const ROOM_LEAVE: &str = "room.leave";

/// Publish target for outbound chat messages.
pub const CHAT_SEND: &str = "chat.send";

/// Returns the chat topic for a room: `room.<code>.chat`.
#[inline]
#[must_use]
pub fn room_chat_topic(room_code: &str) -> String {
    format!("room.{room_code}.chat")
}
