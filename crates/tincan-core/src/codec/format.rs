//! Outbound line formatting.
//!
//! Every emitted line must fit in [`MAX_LINE_LEN`] bytes (the CR LF terminator
//! is added by the connection). Chat payloads that do not fit are split into
//! several lines sharing the same `COMMAND target :` header; everything else
//! that is too long is rejected, never truncated.

use crate::error::{ProtocolError, ProtocolResult};
use crate::foundation::MAX_LINE_LEN;

/// Checks that `line` can be sent as a single protocol line.
///
/// # Errors
///
/// - [`ProtocolError::MessageTooLong`] if the line exceeds [`MAX_LINE_LEN`].
/// - [`ProtocolError::EmbeddedLineBreak`] if it contains CR or LF.
pub fn check_line(line: &str) -> ProtocolResult<()> {
    if line.len() > MAX_LINE_LEN {
        return Err(ProtocolError::MessageTooLong {
            len: line.len(),
            limit: MAX_LINE_LEN,
        });
    }
    if line.contains(['\r', '\n']) {
        return Err(ProtocolError::EmbeddedLineBreak);
    }
    Ok(())
}

/// Splits `text` into `COMMAND target :chunk` lines of at most [`MAX_LINE_LEN`] bytes.
///
/// Chunk boundaries are byte-count based with no word awareness; a boundary
/// that would fall inside a multi-byte character moves back to the start of
/// that character. Empty text yields no lines.
///
/// # Errors
///
/// [`ProtocolError::MessageTooLong`] if the header leaves no room for payload,
/// [`ProtocolError::EmbeddedLineBreak`] if any part contains CR or LF.
pub fn split_payload(command: &str, target: &str, text: &str) -> ProtocolResult<Vec<String>> {
    let header = format!("{command} {target} :");
    let too_long = || ProtocolError::MessageTooLong {
        len: header.len() + text.len(),
        limit: MAX_LINE_LEN,
    };

    let room = MAX_LINE_LEN.checked_sub(header.len()).ok_or_else(too_long)?;

    let mut lines = Vec::with_capacity(text.len().div_ceil(room.max(1)));
    let mut rest = text;
    while !rest.is_empty() {
        let mut end = rest.len().min(room);
        while !rest.is_char_boundary(end) {
            end -= 1;
        }
        if end == 0 {
            return Err(too_long());
        }

        let (chunk, tail) = rest.split_at(end);
        let line = format!("{header}{chunk}");
        check_line(&line)?;
        lines.push(line);
        rest = tail;
    }

    Ok(lines)
}

/// Formats a chat message, fragmenting long text.
pub fn privmsg(target: &str, text: &str) -> ProtocolResult<Vec<String>> {
    split_payload("PRIVMSG", target, text)
}

/// `NICK <nick>`
pub fn nick(nick: &str) -> String {
    format!("NICK {nick}")
}

/// `USER <user> 0 * :<realname>`
pub fn user(user: &str, realname: &str) -> String {
    format!("USER {user} 0 * :{realname}")
}

/// `JOIN <channel>`
pub fn join(channel: &str) -> String {
    format!("JOIN {channel}")
}

/// `PONG <token>`
pub fn pong(token: &str) -> String {
    format!("PONG {token}")
}

/// `QUIT` with an optional `:reason`; an empty reason is omitted.
pub fn quit(reason: Option<&str>) -> String {
    match reason {
        Some(reason) if !reason.is_empty() => format!("QUIT :{reason}"),
        _ => "QUIT".to_string(),
    }
}
