//! Foundation layer - protocol data types.
//!
//! This module contains the fundamental building blocks of tincan:
//! - [`Message`]: one parsed protocol line
//! - [`Principal`]: a `(nick, host)` sender identity
//! - [`ConnectionState`]: the connection lifecycle

pub mod message;
pub mod state;

pub use message::{MAX_LINE_LEN, MAX_PARAMS, Message, Principal};
pub use state::ConnectionState;
