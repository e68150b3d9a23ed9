//! Connection lifecycle state.

use std::fmt;

/// Lifecycle state of the bot's single server connection.
///
/// ```text
/// Disconnected ─▶ Connecting ─▶ Registering ─▶ Ready ─▶ Stopping ─▶ Disconnected
/// ```
///
/// `Ready` is entered once the server acknowledges registration (`001`).
/// `Stopping` is entered by an explicit stop request; the event loop exits
/// after the batch of messages it is currently processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No connection is open.
    #[default]
    Disconnected,
    /// The transport handshake is in progress.
    Connecting,
    /// Registration messages were sent; waiting for the server's acknowledgment.
    Registering,
    /// Registered and processing messages.
    Ready,
    /// A stop was requested; the loop exits after the in-flight batch.
    Stopping,
}

impl ConnectionState {
    /// Returns true while the event loop should keep running.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Registering | Self::Ready)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Registering => write!(f, "Registering"),
            Self::Ready => write!(f, "Ready"),
            Self::Stopping => write!(f, "Stopping"),
        }
    }
}
