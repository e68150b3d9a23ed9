//! # Tincan Transport
//!
//! The network side of the tincan IRC bot.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  tincan-runtime     │  (event loop, observers, commands)
//! ├─────────────────────┤
//! │  tincan-transport   │  <- This crate (Connection, Outbound)
//! ├─────────────────────┤
//! │  tincan-core        │  (framing, parsing, formatting)
//! ├─────────────────────┤
//! │  Network (TCP)      │
//! └─────────────────────┘
//! ```
//!
//! - [`Connection`] owns the socket. It is generic over the stream type so the
//!   event loop can be driven by an in-memory mock in tests.
//! - [`Outbound`] is the cloneable, thread-safe queue every collaborator sends
//!   through. The event loop drains it into the connection.

pub mod connection;
pub mod error;
pub mod outbound;

pub use connection::{Connection, DEFAULT_CONNECT_TIMEOUT, WIRE_TARGET};
pub use error::{TransportError, TransportResult};
pub use outbound::{Outbound, OutboundReceiver};
