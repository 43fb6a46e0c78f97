//! Error types for the SyncParty chat client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use syncparty_chat::{Result, RoomSession};
//!
//! async fn example(session: &RoomSession) -> Result<()> {
//!     session.initialize("ABC123", "u1", "Alice").await?;
//!     session.send_message("hello")?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | State | [`Error::NotConnected`], [`Error::NotInitialized`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`], [`Error::HandshakeFailed`], [`Error::ReconnectExhausted`] |
//! | Protocol | [`Error::Protocol`], [`Error::FrameTooLarge`], [`Error::Decode`], [`Error::Timestamp`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when transport configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // State Errors
    // ========================================================================
    /// Operation attempted while the transport is not connected.
    #[error("Transport is not connected")]
    NotConnected,

    /// Chat operation attempted on an inactive room session.
    #[error("Room session is not initialized")]
    NotInitialized,

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Handshake did not complete in time.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Connection closed while an operation was in flight.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Relay rejected the STOMP CONNECT frame.
    #[error("Handshake failed: {message}")]
    HandshakeFailed {
        /// Message reported by the relay.
        message: String,
    },

    /// Reconnection gave up after the configured number of attempts.
    ///
    /// Terminal until the caller invokes `connect()` again.
    #[error("Reconnect attempts exhausted after {attempts} attempts")]
    ReconnectExhausted {
        /// Number of attempts made.
        attempts: u32,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Protocol violation or unexpected frame.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// Outbound body exceeds the configured frame size limit.
    #[error("Frame of {size} bytes exceeds the {limit} byte limit")]
    FrameTooLarge {
        /// Encoded body size.
        size: usize,
        /// Configured limit.
        limit: usize,
    },

    /// Malformed inbound frame or payload.
    ///
    /// Never propagated to listeners; the frame is dropped.
    #[error("Decode error: {message}")]
    Decode {
        /// Description of the decode failure.
        message: String,
    },

    /// Server timestamp could not be parsed.
    #[error("Invalid timestamp: {value}")]
    Timestamp {
        /// The raw timestamp string.
        value: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a handshake failed error.
    #[inline]
    pub fn handshake_failed(message: impl Into<String>) -> Self {
        Self::HandshakeFailed {
            message: message.into(),
        }
    }

    /// Creates a reconnect exhausted error.
    #[inline]
    pub fn reconnect_exhausted(attempts: u32) -> Self {
        Self::ReconnectExhausted { attempts }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a frame too large error.
    #[inline]
    pub fn frame_too_large(size: usize, limit: usize) -> Self {
        Self::FrameTooLarge { size, limit }
    }

    /// Creates a decode error.
    #[inline]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Creates an invalid timestamp error.
    #[inline]
    pub fn timestamp(value: impl Into<String>) -> Self {
        Self::Timestamp {
            value: value.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::HandshakeFailed { .. }
                | Self::ReconnectExhausted { .. }
                | Self::NotConnected
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if the error came from a malformed inbound frame.
    #[inline]
    #[must_use]
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            Self::Decode { .. } | Self::Timestamp { .. } | Self::Json(_)
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed once the caller reconnects or retries.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotConnected
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::ReconnectExhausted { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::connection("refused");
        assert_eq!(err.to_string(), "Connection failed: refused");
        assert_eq!(
            Error::NotConnected.to_string(),
            "Transport is not connected"
        );
        assert_eq!(
            Error::NotInitialized.to_string(),
            "Room session is not initialized"
        );
    }

    #[test]
    fn test_handshake_failed_display() {
        let err = Error::handshake_failed("bad credentials");
        assert_eq!(err.to_string(), "Handshake failed: bad credentials");
    }

    #[test]
    fn test_frame_too_large_display() {
        let err = Error::frame_too_large(70_000, 65_536);
        assert_eq!(
            err.to_string(),
            "Frame of 70000 bytes exceeds the 65536 byte limit"
        );
        assert!(!err.is_connection_error());
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::NotConnected.is_connection_error());
        assert!(Error::reconnect_exhausted(5).is_connection_error());
        assert!(Error::handshake_failed("x").is_connection_error());
        assert!(!Error::NotInitialized.is_connection_error());
        assert!(!Error::config("x").is_connection_error());
    }

    #[test]
    fn test_is_decode_error() {
        assert!(Error::decode("bad").is_decode_error());
        assert!(Error::timestamp("yesterday").is_decode_error());
        assert!(!Error::NotConnected.is_decode_error());
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::NotConnected.is_recoverable());
        assert!(Error::reconnect_exhausted(5).is_recoverable());
        assert!(!Error::config("x").is_recoverable());
        assert!(!Error::handshake_failed("x").is_recoverable());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::ConnectionRefused, "refused");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
        assert!(err.is_decode_error());
    }
}
