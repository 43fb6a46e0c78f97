//! JSON chat payloads exchanged with the relay.
//!
//! # Format
//!
//! Inbound (any type):
//! ```json
//! {
//!   "roomCode": "ABC123",
//!   "userId": "u2",
//!   "username": "Bob",
//!   "message": "hi",
//!   "timestamp": "2024-01-01T00:00:00.000Z",
//!   "type": "CHAT"
//! }
//! ```
//!
//! Outbound omits `timestamp`; `message` is only present on `CHAT`.

// ============================================================================
// Imports
// ============================================================================

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// FrameType
// ============================================================================

/// Payload type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FrameType {
    /// User chat message.
    Chat,
    /// User joined the room.
    Join,
    /// User left the room.
    Leave,
    /// Relay-generated notice.
    System,
}

// ============================================================================
// WireFrame
// ============================================================================

/// Payload delivered by the relay on a room's chat topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireFrame {
    /// Room the frame belongs to.
    pub room_code: String,

    /// Sender's user ID.
    pub user_id: String,

    /// Sender's display name.
    pub username: String,

    /// Message text (absent on presence frames).
    #[serde(default)]
    pub message: Option<String>,

    /// Server clock, ISO-8601.
    pub timestamp: String,

    /// Payload type.
    #[serde(rename = "type")]
    pub frame_type: FrameType,
}

impl WireFrame {
    /// Returns the server timestamp as epoch milliseconds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timestamp`] if the timestamp cannot be parsed.
    #[inline]
    pub fn epoch_millis(&self) -> Result<i64> {
        parse_server_timestamp(&self.timestamp)
    }
}

// ============================================================================
// OutboundFrame
// ============================================================================

/// Payload published by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundFrame {
    /// Room the frame targets.
    pub room_code: String,

    /// Sender's user ID.
    pub user_id: String,

    /// Sender's display name.
    pub username: String,

    /// Message text, `CHAT` only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Payload type.
    #[serde(rename = "type")]
    pub frame_type: FrameType,
}

impl OutboundFrame {
    /// Creates a `JOIN` announcement.
    #[must_use]
    pub fn join(room_code: &str, user_id: &str, username: &str) -> Self {
        Self::presence(room_code, user_id, username, FrameType::Join)
    }

    /// Creates a `LEAVE` announcement.
    #[must_use]
    pub fn leave(room_code: &str, user_id: &str, username: &str) -> Self {
        Self::presence(room_code, user_id, username, FrameType::Leave)
    }

    /// Creates a `CHAT` message.
    #[must_use]
    pub fn chat(room_code: &str, user_id: &str, username: &str, message: impl Into<String>) -> Self {
        Self {
            room_code: room_code.to_owned(),
            user_id: user_id.to_owned(),
            username: username.to_owned(),
            message: Some(message.into()),
            frame_type: FrameType::Chat,
        }
    }

    fn presence(room_code: &str, user_id: &str, username: &str, frame_type: FrameType) -> Self {
        Self {
            room_code: room_code.to_owned(),
            user_id: user_id.to_owned(),
            username: username.to_owned(),
            message: None,
            frame_type,
        }
    }
}

// ============================================================================
// Timestamps
// ============================================================================

/// Parses a relay timestamp into epoch milliseconds.
///
/// Accepts RFC 3339 (`2024-01-01T00:00:00.000Z`, offsets allowed) and the
/// zone-less form the relay emits for `LocalDateTime`
/// (`2024-01-01T00:00:00.123456`), which is read as UTC.
///
/// # Errors
///
/// Returns [`Error::Timestamp`] if neither form matches.
pub fn parse_server_timestamp(value: &str) -> Result<i64> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.timestamp_millis());
    }

    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc().timestamp_millis())
        .map_err(|_| Error::timestamp(value))
}

// ============================================================================
// Tests
// ============================================================================
