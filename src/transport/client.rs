//! Connection-managing transport.
//!
//! [`Transport`] owns at most one physical connection to the relay and
//! routes inbound `MESSAGE` frames to subscriptions by ID.
//!
//! # Reconnection
//!
//! An unexpected loss while `Connected` (peer close, socket error, relay
//! `ERROR`, missed heartbeat) moves the transport to `Reconnecting`. After
//! a fixed delay a new socket is dialed; a failed attempt schedules the
//! next one. After `max_reconnect_attempts` failures the transport settles
//! in `Failed` and stays there until the caller invokes
//! [`Transport::connect`]. Live subscriptions are re-issued on every new
//! socket.
//!
//! # Thread Safety
//!
//! `Transport` is `Send + Sync` and cheap to clone; clones share one
//! connection. State, subscriptions, and the current link sit behind a
//! single mutex. Callbacks run on the event loop task with no lock held.

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::{IdAllocator, SubscriptionId};
use crate::protocol::{Command, Frame};

use super::config::TransportConfig;
use super::connection::{Link, LinkExit, handshake};
use super::connector::{Connector, WebSocketConnector};
use super::state::ConnectionState;

// ============================================================================
// Types
// ============================================================================

/// Decoded-body callback stored per subscription.
type BodyCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// A live topic subscription.
struct Subscription {
    /// Logical destination, e.g. `room.ABC123.chat`.
    destination: String,
    /// Broker destination, e.g. `/topic/room.ABC123.chat`.
    wire_destination: String,
    /// Decodes the body and invokes the caller's callback.
    callback: BodyCallback,
}

/// Mutable transport state, guarded by one mutex.
#[derive(Default)]
struct Inner {
    state: ConnectionState,
    link: Option<Link>,
    subscriptions: FxHashMap<SubscriptionId, Subscription>,
    reconnect_attempts: u32,
    reconnect_task: Option<JoinHandle<()>>,
    exhausted: bool,
}

/// State shared by clones and background tasks.
struct Shared {
    config: TransportConfig,
    url: Url,
    connector: Arc<dyn Connector>,
    inner: Mutex<Inner>,
    state_tx: watch::Sender<ConnectionState>,
    ids: IdAllocator,
    generation: AtomicU64,
}

// ============================================================================
// Transport
// ============================================================================

/// Connection to the relay with subscribe/publish primitives.
///
/// # Example
///
/// ```ignore
/// use syncparty_chat::{Transport, TransportConfig};
///
/// let transport = Transport::new(TransportConfig::default())?;
/// transport.connect().await?;
///
/// let id = transport.subscribe("room.ABC123.chat", |frame: serde_json::Value| {
///     println!("{frame}");
/// })?;
/// transport.send("chat.send", &serde_json::json!({ "message": "hi" }))?;
///
/// transport.unsubscribe(id);
/// transport.disconnect().await;
/// ```
#[derive(Clone)]
pub struct Transport {
    shared: Arc<Shared>,
}

// ============================================================================
// Transport - Constructors
// ============================================================================

impl Transport {
    /// Creates a transport that dials the relay over WebSocket.
    ///
    /// Does not connect; call [`connect`](Self::connect).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn new(config: TransportConfig) -> Result<Self> {
        Self::with_connector(config, Arc::new(WebSocketConnector))
    }

    /// Creates a transport with a custom [`Connector`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn with_connector(config: TransportConfig, connector: Arc<dyn Connector>) -> Result<Self> {
        let url = config.validate()?;
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                url,
                connector,
                inner: Mutex::new(Inner::default()),
                state_tx,
                ids: IdAllocator::default(),
                generation: AtomicU64::new(0),
            }),
        })
    }
}

// ============================================================================
// Transport - Public API
// ============================================================================

impl Transport {
    /// Connects to the relay.
    ///
    /// No-op if already connected. A pending automatic reconnect is
    /// cancelled in favour of this attempt. A failed call is not retried;
    /// the transport moves to `Failed`.
    ///
    /// # Errors
    ///
    /// - [`Error::HandshakeFailed`] if the relay rejects the CONNECT frame
    /// - [`Error::ConnectionTimeout`] if the handshake does not complete
    /// - [`Error::Connection`] if another `connect()` is already in flight
    ///   or the socket cannot be opened
    pub async fn connect(&self) -> Result<()> {
        {
            let mut inner = self.shared.inner.lock();
            match inner.state {
                ConnectionState::Connected => return Ok(()),
                ConnectionState::Connecting => {
                    return Err(Error::connection("Connection attempt already in progress"));
                }
                _ => {}
            }

            if let Some(task) = inner.reconnect_task.take() {
                task.abort();
            }
            inner.exhausted = false;
            self.shared.set_state(&mut inner, ConnectionState::Connecting);
        }

        match self.shared.establish(ConnectionState::Connecting).await {
            Ok(()) => Ok(()),
            Err(e) => {
                let mut inner = self.shared.inner.lock();
                if inner.state == ConnectionState::Connecting {
                    self.shared.set_state(&mut inner, ConnectionState::Failed);
                }
                warn!(error = %e, url = %self.shared.url, "Connect failed");
                Err(e)
            }
        }
    }

    /// Subscribes to a logical destination.
    ///
    /// Every inbound message on the destination is JSON-decoded into `T`
    /// and passed to `callback`. Bodies that fail to decode are logged and
    /// dropped; the subscription stays live.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] unless the transport is connected.
    pub fn subscribe<T, F>(&self, destination: impl Into<String>, callback: F) -> Result<SubscriptionId>
    where
        T: DeserializeOwned,
        F: Fn(T) + Send + Sync + 'static,
    {
        let destination = destination.into();
        let wire_destination = self.shared.config.topic_destination(&destination);

        let log_destination = destination.clone();
        let callback: BodyCallback = Arc::new(move |body: &str| {
            match serde_json::from_str::<T>(body) {
                Ok(payload) => callback(payload),
                Err(e) => warn!(
                    destination = %log_destination,
                    error = %e,
                    "Failed to decode message body, dropping frame"
                ),
            }
        });

        let mut inner = self.shared.inner.lock();
        let link = match (&inner.state, &inner.link) {
            (ConnectionState::Connected, Some(link)) => link,
            _ => return Err(Error::NotConnected),
        };

        let id = self.shared.ids.next_subscription();
        link.write(Frame::subscribe(id, &wire_destination))?;

        debug!(%id, %destination, "Subscribed");

        inner.subscriptions.insert(
            id,
            Subscription {
                destination,
                wire_destination,
                callback,
            },
        );

        Ok(id)
    }

    /// Removes a subscription. Unknown or already-removed IDs are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut inner = self.shared.inner.lock();

        let Some(subscription) = inner.subscriptions.remove(&id) else {
            trace!(%id, "Unsubscribe for unknown subscription");
            return;
        };

        if let Some(link) = &inner.link {
            let _ = link.write(Frame::unsubscribe(id));
        }

        debug!(%id, destination = %subscription.destination, "Unsubscribed");
    }

    /// Publishes a JSON body to a logical destination.
    ///
    /// Fire-and-forget: returns once the frame is queued on the socket.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] unless the transport is connected
    /// - [`Error::Json`] if `body` cannot be serialized
    /// - [`Error::FrameTooLarge`] if the body exceeds `max_frame_size`
    pub fn send<B>(&self, destination: &str, body: &B) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        let json = serde_json::to_string(body)?;
        let limit = self.shared.config.max_frame_size;
        if json.len() > limit {
            return Err(Error::frame_too_large(json.len(), limit));
        }
        let wire_destination = self.shared.config.app_destination(destination);

        let inner = self.shared.inner.lock();
        let link = match (&inner.state, &inner.link) {
            (ConnectionState::Connected, Some(link)) => link,
            _ => return Err(Error::NotConnected),
        };

        link.write(Frame::send(&wire_destination, json))?;
        debug!(%destination, "Message sent");
        Ok(())
    }

    /// Disconnects from the relay. Safe from any state.
    ///
    /// Cancels any pending reconnect, unsubscribes everything, sends
    /// `DISCONNECT`, and closes the socket.
    pub async fn disconnect(&self) {
        let link = {
            let mut inner = self.shared.inner.lock();

            if let Some(task) = inner.reconnect_task.take() {
                task.abort();
            }

            let subscriptions = std::mem::take(&mut inner.subscriptions);
            let link = inner.link.take();

            if let Some(link) = &link {
                for id in subscriptions.keys() {
                    let _ = link.write(Frame::unsubscribe(*id));
                }
            }

            if inner.state == ConnectionState::Disconnected && link.is_none() {
                return;
            }

            inner.reconnect_attempts = 0;
            inner.exhausted = false;
            self.shared.set_state(&mut inner, ConnectionState::Disconnected);
            link
        };

        if let Some(link) = link {
            link.shutdown().await;
        }

        info!("Disconnected and cleaned up");
    }

    /// Returns `true` if the transport is connected.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.shared.inner.lock().state.is_connected()
    }

    /// Returns the current connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.shared.inner.lock().state
    }

    /// Returns a receiver that observes every state transition.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    /// Waits until the transport is connected or has given up.
    ///
    /// Returns immediately if connected. While connecting or reconnecting,
    /// waits for the outcome.
    ///
    /// # Errors
    ///
    /// - [`Error::ReconnectExhausted`] if automatic reconnection gave up
    /// - [`Error::NotConnected`] if the transport is disconnected or the
    ///   last explicit connect failed
    pub async fn wait_connected(&self) -> Result<()> {
        let mut rx = self.watch_state();

        loop {
            let state = *rx.borrow_and_update();
            match state {
                ConnectionState::Connected => return Ok(()),
                ConnectionState::Disconnected => return Err(Error::NotConnected),
                ConnectionState::Failed => {
                    let inner = self.shared.inner.lock();
                    return Err(if inner.exhausted {
                        Error::reconnect_exhausted(inner.reconnect_attempts)
                    } else {
                        Error::NotConnected
                    });
                }
                ConnectionState::Connecting | ConnectionState::Reconnecting => {}
            }

            if rx.changed().await.is_err() {
                return Err(Error::NotConnected);
            }
        }
    }

    /// Returns the number of live subscriptions.
    #[inline]
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.shared.inner.lock().subscriptions.len()
    }

    /// Returns the reconnect attempts made since the last successful connect.
    #[inline]
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.inner.lock().reconnect_attempts
    }

    /// Returns the transport configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &TransportConfig {
        &self.shared.config
    }
}

// ============================================================================
// Shared - Connection Management
// ============================================================================

impl Shared {
    /// Records a state transition and notifies watchers.
    fn set_state(&self, inner: &mut Inner, state: ConnectionState) {
        if inner.state != state {
            debug!(from = %inner.state, to = %state, "Connection state changed");
        }
        inner.state = state;
        self.state_tx.send_replace(state);
    }

    /// Opens a socket, performs the handshake, and installs the link.
    ///
    /// Aborts without installing anything if the state moved away from
    /// `expected` while the socket was being opened (e.g. `disconnect()`).
    async fn establish(self: &Arc<Self>, expected: ConnectionState) -> Result<()> {
        let mut socket = self.connector.connect(&self.url).await?;
        let handshake = handshake(&mut socket, &self.config, &self.url).await?;
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;

        let mut inner = self.inner.lock();
        if inner.state != expected {
            return Err(Error::connection("Connection attempt cancelled"));
        }

        let on_frame = {
            let weak = Arc::downgrade(self);
            Box::new(move |frame: Frame| {
                if let Some(shared) = weak.upgrade() {
                    shared.route(frame);
                }
            })
        };
        let on_exit = {
            let weak = Arc::downgrade(self);
            move |exit: LinkExit| {
                if let Some(shared) = weak.upgrade() {
                    shared.handle_link_exit(generation, exit);
                }
            }
        };

        let link = Link::spawn(socket, handshake.heartbeat, generation, on_frame, on_exit);

        for (id, subscription) in &inner.subscriptions {
            link.write(Frame::subscribe(*id, &subscription.wire_destination))?;
        }
        if !inner.subscriptions.is_empty() {
            debug!(count = inner.subscriptions.len(), "Re-issued subscriptions");
        }

        inner.link = Some(link);
        inner.reconnect_attempts = 0;
        inner.exhausted = false;
        self.set_state(&mut inner, ConnectionState::Connected);

        info!(
            url = %self.url,
            version = handshake.version.as_deref().unwrap_or("1.0"),
            "Connected"
        );

        Ok(())
    }

    /// Delivers an inbound frame to its subscription.
    fn route(&self, frame: Frame) {
        match frame.command {
            Command::Message => {
                let callback = {
                    let inner = self.inner.lock();
                    let by_id = frame
                        .header("subscription")
                        .and_then(|id| id.parse::<SubscriptionId>().ok())
                        .and_then(|id| inner.subscriptions.get(&id));
                    let by_destination = || {
                        let destination = frame.header("destination")?;
                        inner
                            .subscriptions
                            .values()
                            .find(|s| s.wire_destination == destination)
                    };
                    by_id
                        .or_else(by_destination)
                        .map(|s| Arc::clone(&s.callback))
                };

                match callback {
                    Some(callback) => callback(&frame.body),
                    None => debug!(
                        subscription = frame.header("subscription").unwrap_or_default(),
                        "Message for unknown subscription"
                    ),
                }
            }

            Command::Receipt => {
                trace!(receipt = frame.header("receipt-id").unwrap_or_default(), "Receipt");
            }

            other => warn!(command = %other, "Ignoring unexpected frame"),
        }
    }

    /// Reacts to an event loop stopping.
    fn handle_link_exit(self: &Arc<Self>, generation: u64, exit: LinkExit) {
        let mut inner = self.inner.lock();

        let current = inner
            .link
            .as_ref()
            .is_some_and(|link| link.generation() == generation);
        if !current {
            return;
        }
        inner.link = None;

        if exit.is_requested() || inner.state != ConnectionState::Connected {
            return;
        }

        match &exit {
            LinkExit::Failed(e) => warn!(error = %e, "Connection lost: socket failure"),
            LinkExit::RelayError(message) => warn!(%message, "Connection lost: relay error"),
            LinkExit::HeartbeatTimeout => warn!("Connection lost: heartbeat missed"),
            LinkExit::Closed => warn!("Connection lost: closed by relay"),
            LinkExit::Shutdown => {}
        }
        self.schedule_reconnect(&mut inner);
    }

    /// Moves to `Reconnecting` and spawns the retry loop.
    fn schedule_reconnect(self: &Arc<Self>, inner: &mut Inner) {
        self.set_state(inner, ConnectionState::Reconnecting);

        let weak = Arc::downgrade(self);
        inner.reconnect_task = Some(tokio::spawn(Self::reconnect_loop(weak)));
    }

    /// Retries with a fixed delay until connected or out of attempts.
    async fn reconnect_loop(weak: Weak<Self>) {
        loop {
            let (delay, attempt, max) = {
                let Some(shared) = weak.upgrade() else {
                    return;
                };
                let mut inner = shared.inner.lock();

                if inner.state != ConnectionState::Reconnecting {
                    return;
                }

                let max = shared.config.max_reconnect_attempts;
                if inner.reconnect_attempts >= max {
                    error!(attempts = inner.reconnect_attempts, "Max reconnect attempts reached");
                    inner.exhausted = true;
                    inner.reconnect_task = None;
                    shared.set_state(&mut inner, ConnectionState::Failed);
                    return;
                }

                inner.reconnect_attempts += 1;
                (shared.config.reconnect_delay, inner.reconnect_attempts, max)
            };

            info!(attempt, max, ?delay, "Reconnecting...");
            sleep(delay).await;

            let Some(shared) = weak.upgrade() else {
                return;
            };

            match shared.establish(ConnectionState::Reconnecting).await {
                Ok(()) => {
                    info!(attempt, "Reconnected");
                    return;
                }
                Err(e) => warn!(attempt, error = %e, "Reconnect attempt failed"),
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use serde_json::{Value, json};
    use tokio::sync::mpsc;

    use crate::transport::testing::{Behavior, MockRelay, test_config};

    fn transport(relay: &MockRelay) -> Transport {
        Transport::with_connector(test_config(), relay.connector()).expect("valid config")
    }

    async fn wait_for_state(transport: &Transport, expected: ConnectionState) {
        let mut rx = transport.watch_state();
        tokio::time::timeout(
            Duration::from_secs(60),
            rx.wait_for(|state| *state == expected),
        )
        .await
        .expect("state reached in time")
        .expect("watch open");
    }

    #[tokio::test]
    async fn test_connect_negotiates() {
        let relay = MockRelay::new();
        let transport = transport(&relay);

        assert_eq!(transport.state(), ConnectionState::Disconnected);
        transport.connect().await.expect("connect");

        assert!(transport.is_connected());
        let connect = relay.wait_for_command(Command::Connect).await;
        assert_eq!(connect.header("accept-version"), Some("1.2"));
        assert_eq!(connect.header("host"), Some("relay.test"));
        assert_eq!(connect.header("heart-beat"), Some("0,0"));
    }

    #[tokio::test]
    async fn test_connect_when_connected_is_noop() {
        let relay = MockRelay::new();
        let transport = transport(&relay);

        transport.connect().await.expect("connect");
        transport.connect().await.expect("second connect");

        assert_eq!(relay.connect_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_rejected_fails_without_retry() {
        let relay = MockRelay::new();
        relay.push_behavior(Behavior::Reject("bad credentials".into()));
        let transport = transport(&relay);

        let err = transport.connect().await.unwrap_err();
        assert!(matches!(err, Error::HandshakeFailed { ref message } if message == "bad credentials"));
        assert_eq!(transport.state(), ConnectionState::Failed);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(relay.connect_count(), 1);
        assert!(matches!(transport.wait_connected().await, Err(Error::NotConnected)));
    }

    #[tokio::test]
    async fn test_connect_refused_fails() {
        let relay = MockRelay::new();
        relay.push_behavior(Behavior::Refuse);
        let transport = transport(&relay);

        assert!(transport.connect().await.is_err());
        assert_eq!(transport.state(), ConnectionState::Failed);

        transport.connect().await.expect("explicit connect recovers");
        assert!(transport.is_connected());
    }

    #[tokio::test]
    async fn test_operations_require_connection() {
        let relay = MockRelay::new();
        let transport = transport(&relay);

        let subscribe = transport.subscribe("room.A.chat", |_: Value| {});
        assert!(matches!(subscribe, Err(Error::NotConnected)));

        let send = transport.send("chat.send", &json!({}));
        assert!(matches!(send, Err(Error::NotConnected)));
    }

    #[tokio::test]
    async fn test_subscription_ids_are_unique() {
        let relay = MockRelay::new();
        let transport = transport(&relay);
        transport.connect().await.expect("connect");

        let mut ids = Vec::new();
        for _ in 0..20 {
            ids.push(transport.subscribe("room.A.chat", |_: Value| {}).expect("subscribe"));
        }
        let first = ids[0];
        transport.unsubscribe(first);
        ids.push(transport.subscribe("room.A.chat", |_: Value| {}).expect("subscribe"));

        let mut deduped = ids.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), ids.len());
    }

    #[tokio::test]
    async fn test_messages_routed_to_subscription() {
        let relay = MockRelay::new();
        let transport = transport(&relay);
        transport.connect().await.expect("connect");

        let (tx, mut rx) = mpsc::unbounded_channel();
        transport
            .subscribe("room.A.chat", move |value: Value| {
                let _ = tx.send(value);
            })
            .expect("subscribe");
        relay.wait_for_subscription("/topic/room.A.chat").await;

        relay.publish("/topic/room.A.chat", r#"{"n":1}"#);
        relay.publish("/topic/room.A.chat", r#"{"n":2}"#);

        assert_eq!(rx.recv().await, Some(json!({"n": 1})));
        assert_eq!(rx.recv().await, Some(json!({"n": 2})));
    }

    #[tokio::test]
    async fn test_decode_failure_keeps_subscription() {
        let relay = MockRelay::new();
        let transport = transport(&relay);
        transport.connect().await.expect("connect");

        let (tx, mut rx) = mpsc::unbounded_channel();
        transport
            .subscribe("room.A.chat", move |value: Value| {
                let _ = tx.send(value);
            })
            .expect("subscribe");
        relay.wait_for_subscription("/topic/room.A.chat").await;

        relay.publish("/topic/room.A.chat", "{not json");
        relay.publish("/topic/room.A.chat", r#"{"ok":true}"#);

        assert_eq!(rx.recv().await, Some(json!({"ok": true})));
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent() {
        let relay = MockRelay::new();
        let transport = transport(&relay);
        transport.connect().await.expect("connect");

        let (tx, mut rx) = mpsc::unbounded_channel();
        let removed = transport.subscribe("room.A.chat", |_: Value| {}).expect("subscribe");
        transport
            .subscribe("room.A.chat", move |value: Value| {
                let _ = tx.send(value);
            })
            .expect("subscribe");

        transport.unsubscribe(removed);
        transport.unsubscribe(removed);
        transport.unsubscribe(SubscriptionId::new(9_999));

        assert_eq!(transport.subscription_count(), 1);
        relay.wait_for_command(Command::Unsubscribe).await;
        assert_eq!(relay.count_command(Command::Unsubscribe), 1);

        relay.publish("/topic/room.A.chat", r#"{"still":"here"}"#);
        assert_eq!(rx.recv().await, Some(json!({"still": "here"})));
    }

    #[tokio::test]
    async fn test_send_publishes_json() {
        let relay = MockRelay::new();
        let transport = transport(&relay);
        transport.connect().await.expect("connect");

        transport
            .send("chat.send", &json!({"message": "hello"}))
            .expect("send");

        let frame = relay.wait_for_command(Command::Send).await;
        assert_eq!(frame.header("destination"), Some("/app/chat.send"));
        assert_eq!(frame.header("content-type"), Some("application/json"));
        assert_eq!(
            serde_json::from_str::<Value>(&frame.body).expect("json"),
            json!({"message": "hello"})
        );
    }

    #[tokio::test]
    async fn test_send_rejects_oversized_body() {
        let relay = MockRelay::new();
        let config = test_config().with_max_frame_size(32);
        let transport =
            Transport::with_connector(config, relay.connector()).expect("valid config");
        transport.connect().await.expect("connect");

        let err = transport
            .send("chat.send", &json!({"message": "x".repeat(64)}))
            .unwrap_err();
        assert!(matches!(err, Error::FrameTooLarge { limit: 32, .. }));

        transport.send("chat.send", &json!({"m": "ok"})).expect("small body");
        relay.wait_for_command(Command::Send).await;
        assert_eq!(relay.count_command(Command::Send), 1);
        assert!(transport.is_connected());
    }

    #[tokio::test]
    async fn test_disconnect_cleans_up() {
        let relay = MockRelay::new();
        let transport = transport(&relay);
        transport.connect().await.expect("connect");
        transport.subscribe("room.A.chat", |_: Value| {}).expect("subscribe");

        transport.disconnect().await;

        assert_eq!(transport.state(), ConnectionState::Disconnected);
        assert_eq!(transport.subscription_count(), 0);
        relay.wait_for_command(Command::Disconnect).await;
        assert_eq!(relay.count_command(Command::Unsubscribe), 1);
        assert!(matches!(
            transport.subscribe("room.A.chat", |_: Value| {}),
            Err(Error::NotConnected)
        ));

        // Safe to repeat, and from a never-connected transport.
        transport.disconnect().await;
        self::transport(&relay).disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnects_and_resubscribes() {
        let relay = MockRelay::new();
        let transport = transport(&relay);
        transport.connect().await.expect("connect");

        let (tx, mut rx) = mpsc::unbounded_channel();
        transport
            .subscribe("room.A.chat", move |value: Value| {
                let _ = tx.send(value);
            })
            .expect("subscribe");
        relay.wait_for_subscription("/topic/room.A.chat").await;

        relay.drop_connection();
        wait_for_state(&transport, ConnectionState::Reconnecting).await;
        wait_for_state(&transport, ConnectionState::Connected).await;

        assert_eq!(relay.connect_count(), 2);
        assert_eq!(transport.reconnect_attempts(), 0);

        relay.wait_for_subscription("/topic/room.A.chat").await;
        relay.publish("/topic/room.A.chat", r#"{"after":"reconnect"}"#);
        assert_eq!(rx.recv().await, Some(json!({"after": "reconnect"})));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_bound_settles_in_failed() {
        let relay = MockRelay::new();
        let transport = transport(&relay);
        transport.connect().await.expect("connect");

        relay.set_default_behavior(Behavior::Refuse);
        relay.drop_connection();

        wait_for_state(&transport, ConnectionState::Failed).await;
        let max = test_config().max_reconnect_attempts;
        assert_eq!(relay.connect_count(), 1 + max as usize);
        assert!(matches!(
            transport.wait_connected().await,
            Err(Error::ReconnectExhausted { attempts }) if attempts == max
        ));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(relay.connect_count(), 1 + max as usize);
        assert!(matches!(transport.send("chat.send", &json!({})), Err(Error::NotConnected)));

        relay.set_default_behavior(Behavior::Accept);
        transport.connect().await.expect("explicit connect after exhaustion");
        assert!(transport.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_rejected_by_relay_counts_attempts() {
        let relay = MockRelay::new();
        let transport = transport(&relay);
        transport.connect().await.expect("connect");

        relay.set_default_behavior(Behavior::Reject("maintenance".into()));
        relay.drop_connection();

        wait_for_state(&transport, ConnectionState::Failed).await;
        assert_eq!(
            relay.connect_count(),
            1 + test_config().max_reconnect_attempts as usize
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_within_bound() {
        let relay = MockRelay::new();
        let transport = transport(&relay);
        transport.connect().await.expect("connect");

        relay.push_behavior(Behavior::Refuse);
        relay.push_behavior(Behavior::Refuse);
        relay.drop_connection();

        wait_for_state(&transport, ConnectionState::Reconnecting).await;
        wait_for_state(&transport, ConnectionState::Connected).await;
        assert_eq!(relay.connect_count(), 4);
        assert_eq!(transport.reconnect_attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_cancels_reconnect() {
        let relay = MockRelay::new();
        let transport = transport(&relay);
        transport.connect().await.expect("connect");

        relay.drop_connection();
        wait_for_state(&transport, ConnectionState::Reconnecting).await;
        transport.disconnect().await;

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(transport.state(), ConnectionState::Disconnected);
        assert_eq!(relay.connect_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_disconnect_does_not_reconnect() {
        let relay = MockRelay::new();
        let transport = transport(&relay);
        transport.connect().await.expect("connect");

        transport.disconnect().await;
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(transport.state(), ConnectionState::Disconnected);
        assert_eq!(relay.connect_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missed_heartbeat_triggers_reconnect() {
        let relay = MockRelay::new();
        relay.set_server_heart_beat("1000,0");
        let config = test_config().with_heartbeat(Duration::ZERO, Duration::from_millis(1000));
        let transport =
            Transport::with_connector(config, relay.connector()).expect("valid config");
        transport.connect().await.expect("connect");

        wait_for_state(&transport, ConnectionState::Reconnecting).await;
        wait_for_state(&transport, ConnectionState::Connected).await;
        assert!(relay.connect_count() >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sends_outbound_heartbeats() {
        let relay = MockRelay::new();
        relay.set_server_heart_beat("0,500");
        let config = test_config().with_heartbeat(Duration::from_millis(500), Duration::ZERO);
        let transport =
            Transport::with_connector(config, relay.connector()).expect("valid config");
        transport.connect().await.expect("connect");

        tokio::time::sleep(Duration::from_millis(1750)).await;
        assert!(relay.heartbeat_count() >= 2);
        assert!(transport.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_relay_error_frame_triggers_reconnect() {
        let relay = MockRelay::new();
        let transport = transport(&relay);
        transport.connect().await.expect("connect");

        relay.send_error("session expired");
        wait_for_state(&transport, ConnectionState::Reconnecting).await;
        wait_for_state(&transport, ConnectionState::Connected).await;
        assert_eq!(relay.connect_count(), 2);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let relay = MockRelay::new();
        let config = TransportConfig::new("http://relay.test/ws");
        assert!(matches!(
            Transport::with_connector(config, relay.connector()),
            Err(Error::Config { .. })
        ));
    }
}
