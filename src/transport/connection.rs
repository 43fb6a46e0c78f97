//! STOMP handshake and per-socket event loop.
//!
//! Each physical connection is driven by one tokio task that handles:
//!
//! - Incoming text messages (decoded into STOMP frames)
//! - Outgoing frames queued by the transport
//! - Outbound heartbeats when the socket is idle
//! - Inbound heartbeat deadline (missed window = socket failure)
//!
//! The task reports why it stopped through a [`LinkExit`] so the transport
//! can tell an explicit shutdown from an unexpected loss.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, interval_at, sleep, timeout};
use tracing::{debug, error, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::protocol::{Command, Frame, HEARTBEAT, decode_all};

use super::config::TransportConfig;
use super::connector::{Socket, SocketStream};

// ============================================================================
// Constants
// ============================================================================

/// STOMP version we speak.
const ACCEPT_VERSION: &str = "1.2";

/// Multiplier on the inbound heartbeat interval before declaring the
/// socket dead.
const HEARTBEAT_TOLERANCE: u32 = 2;

/// Placeholder period for disabled timers; their select branches are
/// never polled.
const IDLE_PERIOD: Duration = Duration::from_secs(3600);

// ============================================================================
// Types
// ============================================================================

/// Callback for every non-heartbeat frame received after the handshake.
pub(crate) type FrameHandler = Box<dyn Fn(Frame) + Send + Sync>;

// ============================================================================
// Heartbeat
// ============================================================================

/// Negotiated heartbeat intervals. `None` means disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct Heartbeat {
    /// How often we write a heartbeat.
    pub(crate) outgoing: Option<Duration>,
    /// How often the relay writes one.
    pub(crate) incoming: Option<Duration>,
}

impl Heartbeat {
    /// Combines our `heart-beat` offer with the relay's reply.
    ///
    /// Each direction uses the larger of the two values, or is disabled if
    /// either side sent zero.
    pub(crate) fn negotiate(
        client_outgoing: Duration,
        client_incoming: Duration,
        server_header: Option<&str>,
    ) -> Result<Self> {
        let (server_outgoing, server_incoming) = match server_header {
            Some(value) => parse_heart_beat(value)?,
            None => (0, 0),
        };

        let pick = |ours: Duration, theirs_ms: u64| {
            if ours.is_zero() || theirs_ms == 0 {
                None
            } else {
                Some(ours.max(Duration::from_millis(theirs_ms)))
            }
        };

        Ok(Self {
            outgoing: pick(client_outgoing, server_incoming),
            incoming: pick(client_incoming, server_outgoing),
        })
    }

    /// Inbound silence allowed before the socket is considered dead.
    #[inline]
    pub(crate) fn inbound_window(&self) -> Option<Duration> {
        self.incoming.map(|interval| interval * HEARTBEAT_TOLERANCE)
    }
}

/// Parses a `heart-beat: <cx>,<cy>` header value.
fn parse_heart_beat(value: &str) -> Result<(u64, u64)> {
    let invalid = || Error::protocol(format!("Invalid heart-beat header: {value}"));

    let (outgoing, incoming) = value.split_once(',').ok_or_else(invalid)?;
    let outgoing = outgoing.trim().parse().map_err(|_| invalid())?;
    let incoming = incoming.trim().parse().map_err(|_| invalid())?;

    Ok((outgoing, incoming))
}

// ============================================================================
// Handshake
// ============================================================================

/// Result of a successful CONNECT/CONNECTED exchange.
#[derive(Debug, Clone)]
pub(crate) struct Handshake {
    /// Negotiated heartbeat intervals.
    pub(crate) heartbeat: Heartbeat,
    /// Protocol version the relay chose.
    pub(crate) version: Option<String>,
}

/// Performs the STOMP handshake on a freshly opened socket.
///
/// # Errors
///
/// - [`Error::HandshakeFailed`] if the relay answers with `ERROR`
/// - [`Error::ConnectionTimeout`] if no reply arrives within the timeout
/// - [`Error::ConnectionClosed`] if the socket closes first
/// - [`Error::Protocol`] on any other reply
pub(crate) async fn handshake(
    socket: &mut Socket,
    config: &TransportConfig,
    url: &Url,
) -> Result<Handshake> {
    let mut connect = Frame::new(Command::Connect)
        .with_header("accept-version", ACCEPT_VERSION)
        .with_header("host", config.host_header(url))
        .with_header(
            "heart-beat",
            format!(
                "{},{}",
                config.heartbeat_outgoing.as_millis(),
                config.heartbeat_incoming.as_millis()
            ),
        );

    if let Some(login) = &config.login {
        connect = connect.with_header("login", login.as_str());
    }
    if let Some(passcode) = &config.passcode {
        connect = connect.with_header("passcode", passcode.as_str());
    }

    let exchange = async {
        socket.sink.send(connect.encode()).await?;
        next_frame(&mut socket.stream).await
    };

    let reply = timeout(config.handshake_timeout, exchange)
        .await
        .map_err(|_| Error::connection_timeout(config.handshake_timeout.as_millis() as u64))??;

    match reply.command {
        Command::Connected => {
            let heartbeat = Heartbeat::negotiate(
                config.heartbeat_outgoing,
                config.heartbeat_incoming,
                reply.header("heart-beat"),
            )?;

            debug!(
                version = reply.header("version").unwrap_or("1.0"),
                ?heartbeat,
                "STOMP handshake completed"
            );

            Ok(Handshake {
                heartbeat,
                version: reply.header("version").map(str::to_owned),
            })
        }

        Command::Error => Err(Error::handshake_failed(relay_error_message(&reply))),

        other => Err(Error::protocol(format!("Expected CONNECTED, got {other}"))),
    }
}

/// Reads until the first non-heartbeat frame.
async fn next_frame(stream: &mut SocketStream) -> Result<Frame> {
    while let Some(text) = stream.next().await {
        let mut frames = decode_all(&text?)?;
        if !frames.is_empty() {
            return Ok(frames.swap_remove(0));
        }
    }

    Err(Error::ConnectionClosed)
}

/// Extracts the human-readable message of an `ERROR` frame.
fn relay_error_message(frame: &Frame) -> String {
    match frame.header("message") {
        Some(message) if !message.is_empty() => message.to_owned(),
        _ if !frame.body.is_empty() => frame.body.clone(),
        _ => "STOMP connection error".to_owned(),
    }
}

// ============================================================================
// LinkExit
// ============================================================================

/// Why an event loop stopped.
#[derive(Debug)]
pub(crate) enum LinkExit {
    /// Shutdown requested by the transport.
    Shutdown,
    /// Peer closed the socket.
    Closed,
    /// Socket read or write failed.
    Failed(Error),
    /// Relay sent an `ERROR` frame.
    RelayError(String),
    /// No inbound traffic within the heartbeat window.
    HeartbeatTimeout,
}

impl LinkExit {
    /// Returns `true` if the transport asked for this exit.
    #[inline]
    pub(crate) fn is_requested(&self) -> bool {
        matches!(self, Self::Shutdown)
    }
}

// ============================================================================
// LinkCommand
// ============================================================================

/// Internal commands for the event loop.
enum LinkCommand {
    /// Write a frame.
    Write(Frame),
    /// Send DISCONNECT, close the socket, then ack.
    Shutdown(oneshot::Sender<()>),
}

// ============================================================================
// Link
// ============================================================================

/// Handle to one running event loop.
///
/// Dropping the handle closes the command channel, which stops the loop.
pub(crate) struct Link {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<LinkCommand>,
    /// Distinguishes this socket from earlier ones on the same transport.
    generation: u64,
}

impl Link {
    /// Spawns the event loop for a handshaken socket.
    ///
    /// `on_exit` runs on the event loop task after the loop stops.
    pub(crate) fn spawn<F>(
        socket: Socket,
        heartbeat: Heartbeat,
        generation: u64,
        on_frame: FrameHandler,
        on_exit: F,
    ) -> Self
    where
        F: FnOnce(LinkExit) + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let exit = run_event_loop(socket, command_rx, heartbeat, on_frame).await;
            debug!(generation, ?exit, "Event loop terminated");
            on_exit(exit);
        });

        Self {
            command_tx,
            generation,
        }
    }

    /// Returns the generation this link was spawned with.
    #[inline]
    pub(crate) const fn generation(&self) -> u64 {
        self.generation
    }

    /// Queues a frame for writing. Returns once queued.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] if the event loop has stopped.
    pub(crate) fn write(&self, frame: Frame) -> Result<()> {
        self.command_tx
            .send(LinkCommand::Write(frame))
            .map_err(|_| Error::NotConnected)
    }

    /// Sends DISCONNECT, closes the socket and waits for the loop to stop.
    pub(crate) async fn shutdown(self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.command_tx.send(LinkCommand::Shutdown(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

// ============================================================================
// Event Loop
// ============================================================================

/// Event loop that handles socket I/O.
async fn run_event_loop(
    socket: Socket,
    mut command_rx: mpsc::UnboundedReceiver<LinkCommand>,
    heartbeat: Heartbeat,
    on_frame: FrameHandler,
) -> LinkExit {
    let Socket {
        mut sink,
        mut stream,
    } = socket;

    let outgoing_period = heartbeat.outgoing.unwrap_or(IDLE_PERIOD);
    let mut outgoing = interval_at(Instant::now() + outgoing_period, outgoing_period);

    let inbound_window = heartbeat.inbound_window();
    let deadline = sleep(inbound_window.unwrap_or(IDLE_PERIOD));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            // Incoming messages from relay
            inbound = stream.next() => {
                match inbound {
                    Some(Ok(text)) => {
                        if let Some(window) = inbound_window {
                            deadline.as_mut().reset(Instant::now() + window);
                        }

                        let frames = match decode_all(&text) {
                            Ok(frames) => frames,
                            Err(e) => {
                                warn!(error = %e, "Dropping undecodable message");
                                continue;
                            }
                        };

                        for frame in frames {
                            if frame.command == Command::Error {
                                let message = relay_error_message(&frame);
                                error!(%message, "Relay sent ERROR frame");
                                return LinkExit::RelayError(message);
                            }
                            on_frame(frame);
                        }
                    }

                    Some(Err(e)) => {
                        error!(error = %e, "WebSocket error");
                        return LinkExit::Failed(e);
                    }

                    None => {
                        debug!("WebSocket stream ended");
                        return LinkExit::Closed;
                    }
                }
            }

            // Commands from the transport
            command = command_rx.recv() => {
                match command {
                    Some(LinkCommand::Write(frame)) => {
                        let command = frame.command;
                        if let Err(e) = sink.send(frame.encode()).await {
                            error!(error = %e, %command, "Failed to write frame");
                            return LinkExit::Failed(e);
                        }
                        outgoing.reset();
                        trace!(%command, "Frame sent");
                    }

                    Some(LinkCommand::Shutdown(done)) => {
                        debug!("Shutdown command received");
                        let _ = sink.send(Frame::disconnect().encode()).await;
                        let _ = sink.close().await;
                        let _ = done.send(());
                        return LinkExit::Shutdown;
                    }

                    None => {
                        debug!("Command channel closed");
                        let _ = sink.close().await;
                        return LinkExit::Shutdown;
                    }
                }
            }

            _ = outgoing.tick(), if heartbeat.outgoing.is_some() => {
                if let Err(e) = sink.send(HEARTBEAT.to_owned()).await {
                    error!(error = %e, "Failed to write heartbeat");
                    return LinkExit::Failed(e);
                }
                trace!("Heartbeat sent");
            }

            () = &mut deadline, if inbound_window.is_some() => {
                warn!(window = ?inbound_window, "Inbound heartbeat missed");
                return LinkExit::HeartbeatTimeout;
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
