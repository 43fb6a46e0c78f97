//! Room chat layer.
//!
//! Built on [`Transport`](crate::transport::Transport): one
//! [`RoomSession`] per room membership, translating relay payloads into
//! [`ChatMessage`] values and fanning them out to listeners.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `dispatcher` | [`MessageDispatcher`] listener registry |
//! | `message` | [`ChatMessage`] and translation |
//! | `profile` | Profile image pool |
//! | `room` | [`RoomInfo`] and user ID generation |
//! | `session` | [`RoomSession`] |

// ============================================================================
// Submodules
// ============================================================================

/// Listener registry.
pub mod dispatcher;

/// Domain chat message.
pub mod message;

/// Profile image helpers.
pub mod profile;

/// Room identity inputs.
pub mod room;

/// Room membership.
pub mod session;

// ============================================================================
// Re-exports
// ============================================================================

pub use dispatcher::{Listener, ListenerHandle, MessageDispatcher};
pub use message::ChatMessage;
pub use profile::{PROFILE_IMAGES, all_profile_images, profile_image_url, random_profile_image};
pub use room::{RoomInfo, generate_user_id};
pub use session::RoomSession;
