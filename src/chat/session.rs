//! Room session.
//!
//! A [`RoomSession`] binds one [`Transport`] to one user's membership of
//! one room. It subscribes to the room's chat topic, announces `JOIN` and
//! `LEAVE`, publishes chat messages, and fans translated inbound messages
//! out through its [`MessageDispatcher`].
//!
//! # Lifecycle
//!
//! ```text
//! inactive ──initialize()──► active ──leave()──► inactive
//!     ▲            │
//!     └── failure ─┘   (connect, subscribe, or JOIN failed)
//! ```
//!
//! A session is either fully inactive or fully active; a failed
//! [`initialize`](RoomSession::initialize) rolls back whatever it had done.

// ============================================================================
// Imports
// ============================================================================

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::identifiers::SubscriptionId;
use crate::protocol::{CHAT_SEND, FrameType, OutboundFrame, ROOM_JOIN, ROOM_LEAVE, WireFrame, room_chat_topic};
use crate::transport::{Transport, TransportConfig};

use super::dispatcher::{ListenerHandle, MessageDispatcher};
use super::message::ChatMessage;

// ============================================================================
// ActiveRoom
// ============================================================================

/// Membership fields, present only while active.
#[derive(Debug, Clone)]
struct ActiveRoom {
    room_code: String,
    user_id: String,
    username: String,
    subscription: SubscriptionId,
}

// ============================================================================
// RoomSession
// ============================================================================

/// One user's chat membership of one room.
///
/// # Example
///
/// ```ignore
/// use syncparty_chat::{RoomSession, TransportConfig};
///
/// let session = RoomSession::from_config(TransportConfig::default())?;
/// session.initialize("ABC123", "u1", "Alice").await?;
///
/// let handle = session.on_message(|message| {
///     println!("{}: {}", message.user_name, message.message);
/// });
///
/// session.send_message("hello")?;
///
/// handle.remove();
/// session.leave().await;
/// ```
pub struct RoomSession {
    transport: Transport,
    dispatcher: MessageDispatcher,
    active: Mutex<Option<ActiveRoom>>,
}

// ============================================================================
// RoomSession - Constructors
// ============================================================================

impl RoomSession {
    /// Creates an inactive session over `transport`.
    ///
    /// The session takes over the transport's lifecycle: it connects on
    /// [`initialize`](Self::initialize) and disconnects on
    /// [`leave`](Self::leave).
    #[must_use]
    pub fn new(transport: Transport) -> Self {
        Self {
            transport,
            dispatcher: MessageDispatcher::new(),
            active: Mutex::new(None),
        }
    }

    /// Creates an inactive session with its own WebSocket transport.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn from_config(config: TransportConfig) -> Result<Self> {
        Ok(Self::new(Transport::new(config)?))
    }
}

// ============================================================================
// RoomSession - Public API
// ============================================================================

impl RoomSession {
    /// Joins `room_code` as `user_id` / `username`.
    ///
    /// Connects the transport, subscribes to `room.<room_code>.chat`, and
    /// publishes a `JOIN` announcement, in that order. If any step fails
    /// the session stays inactive, the transport is disconnected, and the
    /// error is returned.
    ///
    /// # Errors
    ///
    /// - [`Error::Protocol`] if the session is already active
    /// - any error from [`Transport::connect`], [`Transport::subscribe`],
    ///   or [`Transport::send`]
    pub async fn initialize(&self, room_code: &str, user_id: &str, username: &str) -> Result<()> {
        if let Some(active) = self.active.lock().as_ref() {
            return Err(Error::protocol(format!(
                "Session already active in room {}; call leave() first",
                active.room_code
            )));
        }

        match self.join(room_code, user_id, username).await {
            Ok(subscription) => {
                *self.active.lock() = Some(ActiveRoom {
                    room_code: room_code.to_owned(),
                    user_id: user_id.to_owned(),
                    username: username.to_owned(),
                    subscription,
                });
                info!(%room_code, %user_id, "Joined room");
                Ok(())
            }
            Err(e) => {
                warn!(%room_code, error = %e, "Failed to join room");
                self.transport.disconnect().await;
                Err(e)
            }
        }
    }

    /// Registers a listener for chat messages in the current room.
    ///
    /// Listeners survive until removed through the returned handle or
    /// until [`leave`](Self::leave).
    pub fn on_message<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(ChatMessage) + Send + Sync + 'static,
    {
        self.dispatcher.register(listener)
    }

    /// Publishes a chat message to the current room.
    ///
    /// # Errors
    ///
    /// - [`Error::NotInitialized`] if the session is not active
    /// - [`Error::NotConnected`] if the transport is not connected
    pub fn send_message(&self, text: &str) -> Result<()> {
        let frame = {
            let active = self.active.lock();
            let room = active.as_ref().ok_or(Error::NotInitialized)?;
            OutboundFrame::chat(&room.room_code, &room.user_id, &room.username, text)
        };

        self.transport.send(CHAT_SEND, &frame)
    }

    /// Leaves the current room.
    ///
    /// Publishes a `LEAVE` announcement (failure is logged, not returned),
    /// unsubscribes, disconnects the transport, and removes every listener.
    /// Calling it on an inactive session is a no-op.
    pub async fn leave(&self) {
        let room = self.active.lock().take();

        if let Some(room) = &room {
            let frame = OutboundFrame::leave(&room.room_code, &room.user_id, &room.username);
            if let Err(e) = self.transport.send(ROOM_LEAVE, &frame) {
                warn!(room_code = %room.room_code, error = %e, "Failed to send LEAVE");
            }
            self.transport.unsubscribe(room.subscription);
        }

        self.transport.disconnect().await;
        self.dispatcher.clear();

        if let Some(room) = room {
            info!(room_code = %room.room_code, "Left room");
        }
    }

    /// Returns `true` while the session is active.
    #[inline]
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Returns `true` if the underlying transport is connected.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Returns the active room code.
    #[must_use]
    pub fn room_code(&self) -> Option<String> {
        self.active.lock().as_ref().map(|room| room.room_code.clone())
    }

    /// Returns the underlying transport.
    #[inline]
    #[must_use]
    pub fn transport(&self) -> &Transport {
        &self.transport
    }
}

// ============================================================================
// RoomSession - Internal
// ============================================================================

impl RoomSession {
    /// Runs connect, subscribe, JOIN. Undoes the subscription if JOIN fails.
    async fn join(&self, room_code: &str, user_id: &str, username: &str) -> Result<SubscriptionId> {
        self.transport.connect().await?;

        let dispatcher = self.dispatcher.clone();
        let subscription = self
            .transport
            .subscribe(room_chat_topic(room_code), move |frame: WireFrame| {
                handle_frame(&dispatcher, &frame);
            })?;

        let join = OutboundFrame::join(room_code, user_id, username);
        if let Err(e) = self.transport.send(ROOM_JOIN, &join) {
            self.transport.unsubscribe(subscription);
            return Err(e);
        }

        Ok(subscription)
    }
}

/// Translates a relay frame and dispatches it. Only `CHAT` is surfaced;
/// presence and system frames are reserved and dropped.
fn handle_frame(dispatcher: &MessageDispatcher, frame: &WireFrame) {
    match frame.frame_type {
        FrameType::Chat => match ChatMessage::from_wire(frame) {
            Ok(message) => dispatcher.dispatch(&message),
            Err(e) => warn!(
                room_code = %frame.room_code,
                user_id = %frame.user_id,
                error = %e,
                "Dropping untranslatable chat frame"
            ),
        },
        other => debug!(
            room_code = %frame.room_code,
            user_id = %frame.user_id,
            frame_type = ?other,
            "Ignoring non-chat frame"
        ),
    }
}

// ============================================================================
// Tests
// ============================================================================
