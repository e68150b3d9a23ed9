//! # Tincan Core
//!
//! The protocol engine of the tincan IRC bot.
//!
//! This crate has no I/O of its own. It provides the pieces that turn a byte
//! stream into dispatched messages and back:
//!
//! ## Foundation Layer
//!
//! - [`Message`]: a parsed protocol line (origin, command, parameters)
//! - [`Principal`]: the `(nick, host)` identity authorization is checked against
//! - [`ConnectionState`]: the connection lifecycle
//!
//! ## Codec Layer
//!
//! - [`FrameReader`]: CR LF framing over fragmented reads
//! - [`codec::format`]: outbound line construction with the 510-byte ceiling
//!
//! ## Framework Layer
//!
//! - [`EventBus`]: observers keyed by wildcard `(origin, command)` patterns,
//!   dispatched in registration order
//!
//! ## Data Flow
//!
//! ```text
//! ┌───────┐    ┌─────────────┐    ┌─────────┐    ┌──────────┐    ┌──────────┐
//! │ bytes │───▶│ FrameReader │───▶│ Message │───▶│ EventBus │───▶│ Observer │
//! └───────┘    └─────────────┘    └─────────┘    └──────────┘───▶│ Observer │
//!                                                                └──────────┘
//! ```

pub mod codec;
pub mod error;
pub mod foundation;
pub mod framework;

pub use codec::{FrameReader, MAX_INBOUND_LINE_LEN};
pub use error::{BoxError, ProtocolError, ProtocolResult, RegistryError, RegistryResult};
pub use foundation::{ConnectionState, MAX_LINE_LEN, MAX_PARAMS, Message, Principal};
pub use framework::{EventBus, EventHook, ObserverFn, ObserverId};

/// Prelude for common imports.
pub mod prelude {
    pub use super::codec::format;
    pub use super::error::{BoxError, ProtocolError};
    pub use super::foundation::*;
    pub use super::framework::{EventBus, ObserverId};
}
