//! Transport error types.

use std::time::Duration;

use thiserror::Error;
use tincan_core::ProtocolError;

/// Errors that can occur on the server connection.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The TCP handshake failed.
    #[error("connection failed: {addr} - {reason}")]
    ConnectionFailed {
        /// The address that failed to connect.
        addr: String,
        /// Reason for failure.
        reason: String,
    },

    /// The TCP handshake did not finish in time.
    #[error("connection to {addr} timed out after {timeout:?}")]
    Timeout {
        /// The address that timed out.
        addr: String,
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// The connection or the outbound queue is already closed.
    #[error("connection closed: {reason}")]
    ConnectionClosed {
        /// Reason for closure.
        reason: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),

    /// Framing, parsing or formatting failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl TransportError {
    /// Creates a [`TransportError::ConnectionClosed`].
    pub fn closed(reason: impl Into<String>) -> Self {
        Self::ConnectionClosed {
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
