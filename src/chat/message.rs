//! Domain chat message.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::protocol::{FrameType, WireFrame};

// ============================================================================
// ChatMessage
// ============================================================================

/// A chat message as seen by listeners.
///
/// Produced from an inbound `CHAT` frame by [`ChatMessage::from_wire`].
///
/// The `id` is derived as `<userId>-<epochMillis>`, so two messages from the
/// same user within one millisecond share an id. Listeners that dedupe by
/// id should be aware of this.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Derived message identifier.
    pub id: String,

    /// Sender's user ID.
    pub user_id: String,

    /// Sender's display name.
    pub user_name: String,

    /// Profile image filename. Empty until resolved by the caller.
    pub profile_image: String,

    /// Message text.
    pub message: String,

    /// Server timestamp, epoch milliseconds.
    pub timestamp: i64,
}

impl ChatMessage {
    /// Translates a relay `CHAT` frame.
    ///
    /// A `CHAT` frame without a `message` field yields an empty message.
    ///
    /// # Errors
    ///
    /// - [`Error::Decode`] if the frame is not a `CHAT` frame
    /// - [`Error::Timestamp`] if the server timestamp cannot be parsed
    pub fn from_wire(frame: &WireFrame) -> Result<Self> {
        if frame.frame_type != FrameType::Chat {
            return Err(Error::decode(format!(
                "Expected CHAT frame, got {:?}",
                frame.frame_type
            )));
        }

        let timestamp = frame.epoch_millis()?;

        Ok(Self {
            id: format!("{}-{timestamp}", frame.user_id),
            user_id: frame.user_id.clone(),
            user_name: frame.username.clone(),
            profile_image: String::new(),
            message: frame.message.clone().unwrap_or_default(),
            timestamp,
        })
    }

    /// Returns a copy with the profile image filled in.
    #[must_use]
    pub fn with_profile_image(mut self, profile_image: impl Into<String>) -> Self {
        self.profile_image = profile_image.into();
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
