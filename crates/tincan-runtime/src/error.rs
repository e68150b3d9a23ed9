//! Runtime error types.

use std::time::Duration;

use thiserror::Error;
use tincan_core::{BoxError, RegistryError};
use tincan_framework::CommandError;
use tincan_transport::TransportError;

use crate::config::ConfigError;

/// Errors that can occur while configuring or running a bot.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Connect, send or receive failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server sent `ERROR`.
    #[error("Server closed the session: {0}")]
    ServerError(String),

    /// No `001` arrived within the configured registration timeout.
    #[error("Registration did not complete within {0:?}")]
    RegistrationTimeout(Duration),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// No catalog provides the named plugin.
    #[error("Plugin not found: {0}")]
    PluginNotFound(String),

    /// The plugin's `load` function failed.
    #[error("Failed to load plugin '{name}': {reason}")]
    PluginLoad { name: String, reason: String },

    /// `run` was called on a bot that has already been started.
    #[error("Bot has already been started")]
    AlreadyStarted,

    /// An observer failed with an error of a foreign type.
    #[error("Observer failed: {0}")]
    Observer(String),
}

impl RuntimeError {
    /// Recovers the concrete error returned by an observer.
    ///
    /// Observers registered through the bot return `RuntimeError` or
    /// `TransportError` boxed; anything else is kept as its message.
    pub fn from_observer(error: BoxError) -> Self {
        match error.downcast::<RuntimeError>() {
            Ok(e) => *e,
            Err(error) => match error.downcast::<TransportError>() {
                Ok(e) => Self::Transport(*e),
                Err(error) => Self::Observer(error.to_string()),
            },
        }
    }
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
