//! Unified error types for the tincan core.
//!
//! This module provides the error types shared by the codec and the event bus.
//! Transport-level errors live in `tincan-transport`; command registration
//! errors live in `tincan-framework`.

use thiserror::Error;

use crate::framework::event_bus::ObserverId;

/// Boxed error returned by observer callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// =============================================================================
// Protocol Errors
// =============================================================================

/// Errors raised while framing, parsing, or formatting protocol lines.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The peer closed the connection (a read returned zero bytes).
    #[error("receive failed, connection reset by peer")]
    ConnectionReset,

    /// The origin tag was not followed by a space.
    #[error("received message has malformed prefix: {line:?}")]
    MalformedPrefix {
        /// The offending line.
        line: String,
    },

    /// The line carries no command token.
    #[error("received message has no command: {line:?}")]
    MissingCommand {
        /// The offending line.
        line: String,
    },

    /// An outbound line would exceed the wire ceiling.
    #[error("message is too long to send ({len} > {limit} bytes)")]
    MessageTooLong {
        /// Length of the rejected line in bytes, excluding the terminator.
        len: usize,
        /// The ceiling that was exceeded.
        limit: usize,
    },

    /// An inbound line exceeded [`MAX_INBOUND_LINE_LEN`](crate::codec::frame::MAX_INBOUND_LINE_LEN)
    /// bytes, terminated or not.
    #[error("received line is too long ({len} > {limit} bytes)")]
    LineTooLong {
        /// Bytes buffered for the line when it was rejected.
        len: usize,
        /// The ceiling that was exceeded.
        limit: usize,
    },

    /// An outbound line contains an embedded line terminator.
    #[error("message contains a line break")]
    EmbeddedLineBreak,

    /// An identifier could not be parsed as `nick!user@host`.
    #[error("malformed identifier {input:?}, should be of form 'nick!user@example.org'")]
    MalformedPrincipal {
        /// The rejected input.
        input: String,
    },
}

// =============================================================================
// Registry Errors
// =============================================================================

/// Errors raised by observer registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The observer was never registered or has already been removed.
    #[error("observer {0} is not registered")]
    ObserverNotRegistered(ObserverId),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
