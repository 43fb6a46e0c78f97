//! STOMP 1.2 frame codec.
//!
//! A frame is a command line, header lines, a blank line, and a body
//! terminated by NUL:
//!
//! ```text
//! SEND
//! destination:/app/chat.send
//! content-type:application/json
//! content-length:42
//!
//! {"roomCode":"ABC123", ...}^@
//! ```
//!
//! A lone EOL between frames is a heartbeat. Header names and values are
//! escaped (`\\`, `\n`, `\r`, `\c`) on every frame except
//! `CONNECT`/`CONNECTED`.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::identifiers::SubscriptionId;

// ============================================================================
// Constants
// ============================================================================

/// Outbound heartbeat payload.
pub const HEARTBEAT: &str = "\n";

/// Body length header.
const CONTENT_LENGTH: &str = "content-length";

/// Content type of every JSON body we send.
const JSON_CONTENT_TYPE: &str = "application/json";

// ============================================================================
// Command
// ============================================================================

/// STOMP frame command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Client handshake.
    Connect,
    /// Client handshake (STOMP 1.2 alias).
    Stomp,
    /// Relay handshake reply.
    Connected,
    /// Publish.
    Send,
    /// Join a destination.
    Subscribe,
    /// Leave a destination.
    Unsubscribe,
    /// Graceful close.
    Disconnect,
    /// Topic delivery.
    Message,
    /// Receipt for a frame carrying a `receipt` header.
    Receipt,
    /// Fatal relay error.
    Error,
}

impl Command {
    /// Returns the wire name of the command.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Stomp => "STOMP",
            Self::Connected => "CONNECTED",
            Self::Send => "SEND",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Disconnect => "DISCONNECT",
            Self::Message => "MESSAGE",
            Self::Receipt => "RECEIPT",
            Self::Error => "ERROR",
        }
    }

    /// Handshake frames carry raw header values.
    #[inline]
    const fn escapes_headers(self) -> bool {
        !matches!(self, Self::Connect | Self::Stomp | Self::Connected)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "CONNECT" => Self::Connect,
            "STOMP" => Self::Stomp,
            "CONNECTED" => Self::Connected,
            "SEND" => Self::Send,
            "SUBSCRIBE" => Self::Subscribe,
            "UNSUBSCRIBE" => Self::Unsubscribe,
            "DISCONNECT" => Self::Disconnect,
            "MESSAGE" => Self::Message,
            "RECEIPT" => Self::Receipt,
            "ERROR" => Self::Error,
            other => return Err(Error::decode(format!("Unknown STOMP command: {other}"))),
        })
    }
}

// ============================================================================
// Frame
// ============================================================================

/// A single STOMP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame command.
    pub command: Command,

    /// Headers in wire order. Repeated names are allowed; the first wins.
    pub headers: Vec<(String, String)>,

    /// Frame body (JSON for chat payloads).
    pub body: String,
}

impl Frame {
    /// Creates a frame with no headers and an empty body.
    #[inline]
    #[must_use]
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Appends a header.
    #[inline]
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the body.
    #[inline]
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns the first value of a header.
    #[inline]
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Builds a `SUBSCRIBE` frame.
    #[must_use]
    pub fn subscribe(id: SubscriptionId, destination: &str) -> Self {
        Self::new(Command::Subscribe)
            .with_header("id", id.to_string())
            .with_header("destination", destination)
    }

    /// Builds an `UNSUBSCRIBE` frame.
    #[must_use]
    pub fn unsubscribe(id: SubscriptionId) -> Self {
        Self::new(Command::Unsubscribe).with_header("id", id.to_string())
    }

    /// Builds a `SEND` frame carrying a JSON body.
    #[must_use]
    pub fn send(destination: &str, json: impl Into<String>) -> Self {
        Self::new(Command::Send)
            .with_header("destination", destination)
            .with_header("content-type", JSON_CONTENT_TYPE)
            .with_body(json)
    }

    /// Builds a `DISCONNECT` frame.
    #[inline]
    #[must_use]
    pub fn disconnect() -> Self {
        Self::new(Command::Disconnect)
    }

    /// Encodes the frame to its wire form.
    ///
    /// Adds `content-length` when the body is non-empty and the header is
    /// not already present.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');

        let escape = self.command.escapes_headers();
        for (name, value) in &self.headers {
            if escape {
                push_escaped(&mut out, name);
                out.push(':');
                push_escaped(&mut out, value);
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }

        if !self.body.is_empty() && self.header(CONTENT_LENGTH).is_none() {
            out.push_str(CONTENT_LENGTH);
            out.push(':');
            out.push_str(&self.body.len().to_string());
            out.push('\n');
        }

        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }
}

// ============================================================================
// Decoding
// ============================================================================

/// Decodes every frame in one WebSocket text message.
///
/// Heartbeat EOLs before, between, and after frames are skipped, so a
/// heartbeat-only message yields an empty vector.
///
/// # Errors
///
/// Returns [`Error::Decode`] on an unknown command, a malformed header,
/// an invalid escape sequence, or a frame without its NUL terminator.
pub fn decode_all(text: &str) -> Result<Vec<Frame>> {
    let mut frames = Vec::new();
    let mut rest = text;

    loop {
        rest = rest.trim_start_matches(['\r', '\n']);
        if rest.is_empty() {
            return Ok(frames);
        }

        let (frame, remaining) = decode_one(rest)?;
        frames.push(frame);
        rest = remaining;
    }
}

/// Decodes one frame and returns the unconsumed input.
fn decode_one(input: &str) -> Result<(Frame, &str)> {
    let (command_line, mut rest) = take_line(input)?;
    let command: Command = command_line.parse()?;
    let escape = command.escapes_headers();

    let mut headers = Vec::new();
    loop {
        let (line, remaining) = take_line(rest)?;
        rest = remaining;

        if line.is_empty() {
            break;
        }

        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| Error::decode(format!("Malformed header line: {line}")))?;

        if escape {
            headers.push((unescape(name)?, unescape(value)?));
        } else {
            headers.push((name.to_owned(), value.to_owned()));
        }
    }

    let content_length = headers
        .iter()
        .find(|(name, _)| name == CONTENT_LENGTH)
        .map(|(_, value)| {
            value
                .parse::<usize>()
                .map_err(|_| Error::decode(format!("Invalid content-length: {value}")))
        })
        .transpose()?;

    let body_end = match content_length {
        Some(len) => {
            if rest.as_bytes().get(len) != Some(&0) || !rest.is_char_boundary(len) {
                return Err(Error::decode(format!(
                    "Body does not match content-length {len}"
                )));
            }
            len
        }
        None => rest
            .find('\0')
            .ok_or_else(|| Error::decode("Unterminated frame: missing NUL"))?,
    };

    let frame = Frame {
        command,
        headers,
        body: rest[..body_end].to_owned(),
    };

    Ok((frame, &rest[body_end + 1..]))
}

/// Splits off one line, accepting both LF and CRLF.
fn take_line(input: &str) -> Result<(&str, &str)> {
    let end = input
        .find('\n')
        .ok_or_else(|| Error::decode("Unterminated frame: missing EOL"))?;
    let line = &input[..end];
    Ok((line.strip_suffix('\r').unwrap_or(line), &input[end + 1..]))
}

// ============================================================================
// Header Escaping
// ============================================================================

fn push_escaped(out: &mut String, raw: &str) {
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
}

fn unescape(raw: &str) -> Result<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('c') => out.push(':'),
            other => {
                return Err(Error::decode(format!(
                    "Invalid header escape: \\{}",
                    other.map(String::from).unwrap_or_default()
                )));
            }
        }
    }

    Ok(out)
}

// ============================================================================
// Tests
// ============================================================================
