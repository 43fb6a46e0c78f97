//! Socket establishment.
//!
//! [`Connector`] is the seam between the transport state machine and the
//! physical socket. [`WebSocketConnector`] dials the relay with
//! `tokio-tungstenite`; tests plug in an in-memory relay instead.

// ============================================================================
// Imports
// ============================================================================

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{Sink, SinkExt, Stream, StreamExt, future};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Types
// ============================================================================

/// Outbound half of a socket: one text message per item.
pub type SocketSink = Pin<Box<dyn Sink<String, Error = Error> + Send>>;

/// Inbound half of a socket: one text message per item. The stream ends
/// when the peer closes.
pub type SocketStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

// ============================================================================
// Socket
// ============================================================================

/// A connected, text-oriented socket.
pub struct Socket {
    pub(crate) sink: SocketSink,
    pub(crate) stream: SocketStream,
}

impl Socket {
    /// Wraps a sink/stream pair.
    pub fn new<S, R>(sink: S, stream: R) -> Self
    where
        S: Sink<String, Error = Error> + Send + 'static,
        R: Stream<Item = Result<String>> + Send + 'static,
    {
        Self {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        }
    }
}

// ============================================================================
// Connector
// ============================================================================

/// Opens physical connections to the relay.
///
/// Called once per `connect()` and once per reconnect attempt.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a new socket to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] (or a wrapped IO/WebSocket error) if the
    /// socket cannot be opened.
    async fn connect(&self, url: &Url) -> Result<Socket>;
}

// ============================================================================
// WebSocketConnector
// ============================================================================

/// Production connector over `tokio-tungstenite`.
///
/// Binary, ping and pong messages are filtered out; tungstenite answers
/// pings itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketConnector;

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, url: &Url) -> Result<Socket> {
        let (ws_stream, response) = connect_async(url.as_str())
            .await
            .map_err(|e| Error::connection(format!("WebSocket connect to {url} failed: {e}")))?;

        debug!(%url, status = %response.status(), "WebSocket connection established");

        let (ws_write, ws_read) = ws_stream.split();

        let sink = ws_write
            .with(|text: String| future::ready(Ok::<_, Error>(Message::Text(text.into()))));

        let stream = ws_read.filter_map(|message| {
            future::ready(match message {
                Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
                Ok(_) => None,
                Err(e) => Some(Err(Error::from(e))),
            })
        });

        Ok(Socket::new(sink, stream))
    }
}
