//! Wire codec: framing of the inbound byte stream and formatting of outbound lines.

pub mod format;
pub mod frame;

pub use format::{check_line, join, nick, pong, privmsg, quit, split_payload, user};
pub use frame::{FrameReader, MAX_INBOUND_LINE_LEN};
