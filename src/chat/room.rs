//! Room and user identity inputs.
//!
//! [`RoomInfo`] is the payload returned by the room lookup/creation
//! service; the chat layer only needs its invite code.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Room descriptor returned by the room service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
    /// Server-side room identifier.
    pub room_id: String,

    /// Code shared with other participants.
    pub invite_code: String,
}

impl RoomInfo {
    /// Returns the room code used for chat destinations.
    #[inline]
    #[must_use]
    pub fn room_code(&self) -> &str {
        &self.invite_code
    }
}

/// Generates a fresh user ID (UUID v4).
#[inline]
#[must_use]
pub fn generate_user_id() -> String {
    Uuid::new_v4().to_string()
}
