//! The values a command handler receives.

use tincan_core::{BoxError, Principal};

/// The host a [`CommandRouter`](super::CommandRouter) routes on behalf of.
pub trait CommandContext {
    /// The bot's current nick.
    fn nick(&self) -> String;

    /// Returns true if `principal` may run commands that require authorization.
    fn is_authorized(&self, principal: &Principal) -> bool;

    /// Sends a chat message to `channel`.
    fn reply(&self, channel: &str, text: &str) -> Result<(), BoxError>;
}

/// One recognised command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    /// Nick of the sender.
    pub nick: String,
    /// `user@host` of the sender.
    pub host: String,
    /// Channel the command was sent to; replies go here.
    pub channel: String,
    /// The command name, e.g. `!help`.
    pub command: String,
    /// Everything after the first space following the command. May be empty.
    pub args: String,
}

impl CommandInvocation {
    /// Returns the sender as a [`Principal`].
    pub fn principal(&self) -> Principal {
        Principal::new(&self.nick, &self.host)
    }

    /// Formats `text` addressed to the sender, `"<nick>: <text>"`.
    pub fn address(&self, text: impl std::fmt::Display) -> String {
        format!("{}: {}", self.nick, text)
    }
}
