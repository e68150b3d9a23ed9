//! Thread-safe outbound queue.
//!
//! Collaborators never write to the socket themselves. They push validated
//! lines into an [`Outbound`] handle; the event loop owns the matching
//! [`OutboundReceiver`] and writes the lines in enqueue order.
//!
//! ```rust,ignore
//! let (outbound, mut rx) = Outbound::channel();
//!
//! // From any thread:
//! outbound.privmsg("#chan", "hello")?;
//!
//! // In the event loop:
//! while let Some(line) = rx.recv().await {
//!     connection.send(&line).await?;
//! }
//! ```

use tokio::sync::mpsc;
use tracing::trace;

use tincan_core::codec::format;

use crate::error::{TransportError, TransportResult};

/// Receiving half of the outbound queue.
pub type OutboundReceiver = mpsc::UnboundedReceiver<String>;

/// Cloneable sending half of the outbound queue.
///
/// Every method validates the complete output before queuing anything, so a
/// rejected call leaves the queue untouched.
#[derive(Debug, Clone)]
pub struct Outbound {
    tx: mpsc::UnboundedSender<String>,
}

impl Outbound {
    /// Creates a connected handle and receiver pair.
    pub fn channel() -> (Self, OutboundReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queues a raw protocol line (without terminator).
    ///
    /// # Errors
    ///
    /// [`TransportError::Protocol`] if the line is too long or contains a line
    /// break, [`TransportError::ConnectionClosed`] if the receiver is gone.
    pub fn send(&self, line: impl Into<String>) -> TransportResult<()> {
        let line = line.into();
        format::check_line(&line)?;
        self.enqueue(line)
    }

    /// Queues a chat message, split into as many lines as needed.
    pub fn privmsg(&self, target: &str, text: &str) -> TransportResult<()> {
        for line in format::privmsg(target, text)? {
            self.enqueue(line)?;
        }
        Ok(())
    }

    /// Queues `JOIN <channel>`.
    pub fn join(&self, channel: &str) -> TransportResult<()> {
        self.send(format::join(channel))
    }

    /// Queues `PONG <token>`.
    pub fn pong(&self, token: &str) -> TransportResult<()> {
        self.send(format::pong(token))
    }

    /// Queues `QUIT [:reason]`.
    pub fn quit(&self, reason: Option<&str>) -> TransportResult<()> {
        self.send(format::quit(reason))
    }

    /// Returns true once the receiver has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn enqueue(&self, line: String) -> TransportResult<()> {
        trace!(line = %line, "Queueing outbound line");
        self.tx
            .send(line)
            .map_err(|_| TransportError::closed("outbound queue receiver dropped"))
    }
}
