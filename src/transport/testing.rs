//! In-memory STOMP relay for tests.
//!
//! [`MockRelay`] hands out a [`Connector`] whose sockets are channel pairs.
//! A background task per socket answers the handshake, tracks
//! subscriptions, and records every frame the client writes.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{sink, stream};
use parking_lot::Mutex;
use tokio::sync::{Notify, mpsc};
use url::Url;

use crate::error::{Error, Result};
use crate::protocol::{Command, Frame, decode_all};

use super::config::TransportConfig;
use super::connector::{Connector, Socket};

// ============================================================================
// Constants
// ============================================================================

/// Upper bound for any relay-side wait.
const WAIT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Helpers
// ============================================================================

/// Configuration used by transport and session tests: no heartbeats, short
/// reconnect delay, three attempts.
pub(crate) fn test_config() -> TransportConfig {
    TransportConfig::new("ws://relay.test/ws/websocket")
        .with_heartbeat(Duration::ZERO, Duration::ZERO)
        .with_reconnect(Duration::from_millis(100), 3)
        .with_handshake_timeout(Duration::from_secs(5))
}

// ============================================================================
// Behavior
// ============================================================================

/// How the relay answers one connection attempt.
#[derive(Debug, Clone, Default)]
pub(crate) enum Behavior {
    /// Reply `CONNECTED`.
    #[default]
    Accept,
    /// Reply `ERROR` with the message, then close.
    Reject(String),
    /// Fail to open the socket.
    Refuse,
}

// ============================================================================
// RelayState
// ============================================================================

struct LiveConnection {
    id: usize,
    to_client: mpsc::UnboundedSender<Result<String>>,
    /// `(subscription id, destination)` pairs.
    subscriptions: Vec<(String, String)>,
}

struct RelayState {
    script: VecDeque<Behavior>,
    default_behavior: Behavior,
    server_heart_beat: String,
    connects: usize,
    received: Vec<Frame>,
    heartbeats: usize,
    live: Option<LiveConnection>,
    next_message_id: u64,
}

impl Default for RelayState {
    fn default() -> Self {
        Self {
            script: VecDeque::new(),
            default_behavior: Behavior::Accept,
            server_heart_beat: "0,0".to_owned(),
            connects: 0,
            received: Vec::new(),
            heartbeats: 0,
            live: None,
            next_message_id: 0,
        }
    }
}

impl RelayState {
    fn send_to_live(&self, frame: &Frame) {
        if let Some(live) = &self.live {
            let _ = live.to_client.send(Ok(frame.encode()));
        }
    }
}

// ============================================================================
// MockRelay
// ============================================================================

/// Scriptable in-memory relay.
#[derive(Clone, Default)]
pub(crate) struct MockRelay {
    state: Arc<Mutex<RelayState>>,
    notify: Arc<Notify>,
}

impl MockRelay {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns a connector that dials this relay.
    pub(crate) fn connector(&self) -> Arc<dyn Connector> {
        Arc::new(MockConnector {
            relay: self.clone(),
        })
    }

    /// Queues the behavior for the next connection attempt.
    pub(crate) fn push_behavior(&self, behavior: Behavior) {
        self.state.lock().script.push_back(behavior);
    }

    /// Sets the behavior used once the queue is empty.
    pub(crate) fn set_default_behavior(&self, behavior: Behavior) {
        self.state.lock().default_behavior = behavior;
    }

    /// Sets the `heart-beat` header sent in `CONNECTED`.
    pub(crate) fn set_server_heart_beat(&self, value: &str) {
        self.state.lock().server_heart_beat = value.to_owned();
    }

    /// Closes the current socket from the relay side.
    pub(crate) fn drop_connection(&self) {
        self.state.lock().live = None;
    }

    /// Sends an `ERROR` frame on the current socket.
    pub(crate) fn send_error(&self, message: &str) {
        let frame = Frame::new(Command::Error).with_header("message", message);
        self.state.lock().send_to_live(&frame);
    }

    /// Delivers a `MESSAGE` to every live subscription on `destination`.
    pub(crate) fn publish(&self, destination: &str, body: &str) {
        let mut state = self.state.lock();

        let targets: Vec<String> = state
            .live
            .as_ref()
            .map(|live| {
                live.subscriptions
                    .iter()
                    .filter(|(_, d)| d == destination)
                    .map(|(id, _)| id.clone())
                    .collect()
            })
            .unwrap_or_default();

        for subscription in targets {
            state.next_message_id += 1;
            let frame = Frame::new(Command::Message)
                .with_header("destination", destination)
                .with_header("subscription", subscription)
                .with_header("message-id", state.next_message_id.to_string())
                .with_header("content-type", "application/json")
                .with_body(body);
            state.send_to_live(&frame);
        }
    }

    /// Number of connection attempts, refused ones included.
    pub(crate) fn connect_count(&self) -> usize {
        self.state.lock().connects
    }

    /// Number of heartbeat-only messages received.
    pub(crate) fn heartbeat_count(&self) -> usize {
        self.state.lock().heartbeats
    }

    /// Number of received frames with `command`.
    pub(crate) fn count_command(&self, command: Command) -> usize {
        self.state
            .lock()
            .received
            .iter()
            .filter(|f| f.command == command)
            .count()
    }

    /// All received frames with `command`, in arrival order.
    pub(crate) fn frames(&self, command: Command) -> Vec<Frame> {
        self.state
            .lock()
            .received
            .iter()
            .filter(|f| f.command == command)
            .cloned()
            .collect()
    }

    /// Waits for the first frame with `command`.
    pub(crate) async fn wait_for_command(&self, command: Command) -> Frame {
        self.wait_until(|state| {
            state
                .received
                .iter()
                .find(|f| f.command == command)
                .cloned()
        })
        .await
    }

    /// Waits for `count` frames with `command`.
    pub(crate) async fn wait_for_count(&self, command: Command, count: usize) {
        self.wait_until(|state| {
            let seen = state.received.iter().filter(|f| f.command == command).count();
            (seen >= count).then_some(())
        })
        .await;
    }

    /// Waits until the current socket subscribes to `destination`.
    pub(crate) async fn wait_for_subscription(&self, destination: &str) {
        self.wait_until(|state| {
            state
                .live
                .as_ref()
                .and_then(|live| live.subscriptions.iter().find(|(_, d)| d == destination))
                .map(|_| ())
        })
        .await;
    }

    async fn wait_until<T>(&self, mut check: impl FnMut(&RelayState) -> Option<T>) -> T {
        let wait = async {
            loop {
                let notified = self.notify.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();

                if let Some(value) = check(&self.state.lock()) {
                    return value;
                }
                notified.await;
            }
        };

        tokio::time::timeout(WAIT_TIMEOUT, wait)
            .await
            .expect("relay condition not reached in time")
    }
}

// ============================================================================
// MockConnector
// ============================================================================

struct MockConnector {
    relay: MockRelay,
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, _url: &Url) -> Result<Socket> {
        let (id, behavior) = {
            let mut state = self.relay.state.lock();
            state.connects += 1;
            let behavior = match state.script.pop_front() {
                Some(behavior) => behavior,
                None => state.default_behavior.clone(),
            };
            (state.connects, behavior)
        };
        self.relay.notify.notify_waiters();

        if matches!(behavior, Behavior::Refuse) {
            return Err(Error::connection("connection refused"));
        }

        let (client_tx, server_rx) = mpsc::unbounded_channel::<String>();
        let (server_tx, client_rx) = mpsc::unbounded_channel::<Result<String>>();

        self.relay.state.lock().live = Some(LiveConnection {
            id,
            to_client: server_tx,
            subscriptions: Vec::new(),
        });

        tokio::spawn(serve(self.relay.clone(), id, server_rx, behavior));

        let sink = sink::unfold(client_tx, |tx, text: String| async move {
            tx.send(text).map_err(|_| Error::ConnectionClosed)?;
            Ok::<_, Error>(tx)
        });
        let stream = stream::unfold(client_rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });

        Ok(Socket::new(sink, stream))
    }
}

/// Relay side of one socket.
async fn serve(
    relay: MockRelay,
    id: usize,
    mut from_client: mpsc::UnboundedReceiver<String>,
    behavior: Behavior,
) {
    while let Some(text) = from_client.recv().await {
        let Ok(frames) = decode_all(&text) else {
            continue;
        };

        {
            let mut state = relay.state.lock();
            let is_live = state.live.as_ref().is_some_and(|live| live.id == id);

            if frames.is_empty() {
                state.heartbeats += 1;
            }

            for frame in frames {
                match frame.command {
                    Command::Connect if is_live => match &behavior {
                        Behavior::Reject(message) => {
                            let error = Frame::new(Command::Error).with_header("message", message.as_str());
                            state.send_to_live(&error);
                            state.live = None;
                        }
                        _ => {
                            let connected = Frame::new(Command::Connected)
                                .with_header("version", "1.2")
                                .with_header("heart-beat", state.server_heart_beat.clone());
                            state.send_to_live(&connected);
                        }
                    },

                    Command::Subscribe if is_live => {
                        let sub_id = frame.header("id").unwrap_or_default().to_owned();
                        let destination = frame.header("destination").unwrap_or_default().to_owned();
                        if let Some(live) = state.live.as_mut() {
                            live.subscriptions.push((sub_id, destination));
                        }
                    }

                    Command::Unsubscribe if is_live => {
                        let sub_id = frame.header("id").unwrap_or_default().to_owned();
                        if let Some(live) = state.live.as_mut() {
                            live.subscriptions.retain(|(id, _)| *id != sub_id);
                        }
                    }

                    _ => {}
                }

                state.received.push(frame);
            }
        }

        relay.notify.notify_waiters();
    }
}
