//! Protocol messages.
//!
//! A [`Message`] is one parsed protocol line:
//!
//! ```text
//! :nick!user@host PRIVMSG #channel :hello there
//! └─── origin ──┘ └command┘└─ params: ["#channel", "hello there"]
//! ```
//!
//! Parsing is the inverse of the [`Display`](std::fmt::Display) implementation
//! for well-formed messages: middle parameters are non-empty, contain no spaces
//! and do not start with `:`; only the last parameter may break those rules.

use std::fmt;
use std::str::FromStr;

use crate::error::{ProtocolError, ProtocolResult};

/// Maximum length of an emitted line in bytes, excluding the CR LF terminator.
pub const MAX_LINE_LEN: usize = 510;

/// Maximum number of parameters a message may carry.
pub const MAX_PARAMS: usize = 15;

/// A parsed protocol message. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    origin: Option<String>,
    command: String,
    params: Vec<String>,
}

impl Message {
    /// Creates a message with the given command and no origin or parameters.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            origin: None,
            command: command.into(),
            params: Vec::new(),
        }
    }

    /// Sets the origin tag (builder pattern).
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Appends a parameter (builder pattern).
    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.params.push(param.into());
        self
    }

    /// Parses one protocol line with its terminator already stripped.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::MalformedPrefix`] if an origin tag is not followed by a space.
    /// - [`ProtocolError::MissingCommand`] if no command token is present.
    pub fn parse(line: &str) -> ProtocolResult<Self> {
        let mut rest = line;
        let mut origin = None;

        if let Some(tagged) = rest.strip_prefix(':') {
            let (tag, remainder) =
                tagged
                    .split_once(' ')
                    .ok_or_else(|| ProtocolError::MalformedPrefix {
                        line: line.to_string(),
                    })?;
            origin = Some(tag.to_string());
            rest = remainder;
        }

        let rest = rest.trim_start_matches(' ');
        let (command, mut tail) = rest.split_once(' ').unwrap_or((rest, ""));
        if command.is_empty() {
            return Err(ProtocolError::MissingCommand {
                line: line.to_string(),
            });
        }

        let mut params = Vec::new();
        loop {
            tail = tail.trim_start_matches(' ');
            if tail.is_empty() {
                break;
            }
            if let Some(trailing) = tail.strip_prefix(':') {
                params.push(trailing.to_string());
                break;
            }
            if params.len() == MAX_PARAMS - 1 {
                params.push(tail.to_string());
                break;
            }
            let (param, next) = tail.split_once(' ').unwrap_or((tail, ""));
            params.push(param.to_string());
            tail = next;
        }

        Ok(Self {
            origin,
            command: command.to_string(),
            params,
        })
    }

    /// Returns the origin tag, if any.
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Returns the command token, case preserved.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Returns all parameters in order.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Returns the parameter at `index`.
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// Returns the last parameter, which is the trailing one when present.
    pub fn trailing(&self) -> Option<&str> {
        self.params.last().map(String::as_str)
    }

    /// Decodes the sender identity from the origin tag.
    ///
    /// Messages without an origin yield an empty principal.
    pub fn sender(&self) -> Principal {
        Principal::from_origin(self.origin().unwrap_or_default())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(origin) = &self.origin {
            write!(f, ":{origin} ")?;
        }
        f.write_str(&self.command)?;

        if let Some((last, middle)) = self.params.split_last() {
            for param in middle {
                write!(f, " {param}")?;
            }
            if last.is_empty() || last.contains(' ') || last.starts_with(':') {
                write!(f, " :{last}")?;
            } else {
                write!(f, " {last}")?;
            }
        }

        Ok(())
    }
}

impl FromStr for Message {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ============================================================================
// Principal
// ============================================================================

/// A `(nick, host)` pair identifying a sender.
///
/// `host` is everything after the first `!` of an origin tag, i.e. `user@host`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Principal {
    /// The nickname.
    pub nick: String,
    /// The `user@host` part.
    pub host: String,
}

impl Principal {
    /// Creates a principal from its parts.
    pub fn new(nick: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            nick: nick.into(),
            host: host.into(),
        }
    }

    /// Splits an origin tag at the first `!`. Never fails; missing parts are empty.
    pub fn from_origin(origin: &str) -> Self {
        let (nick, host) = origin.split_once('!').unwrap_or((origin, ""));
        Self::new(nick, host)
    }

    /// Parses a user-supplied `nick!user@host` identifier.
    ///
    /// Surrounding whitespace is ignored; both parts must be non-empty.
    pub fn parse(input: &str) -> ProtocolResult<Self> {
        let malformed = || ProtocolError::MalformedPrincipal {
            input: input.to_string(),
        };

        let (nick, host) = input.split_once('!').ok_or_else(malformed)?;
        let (nick, host) = (nick.trim(), host.trim());
        if nick.is_empty() || host.is_empty() {
            return Err(malformed());
        }

        Ok(Self::new(nick, host))
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", self.nick, self.host)
    }
}

impl FromStr for Principal {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
