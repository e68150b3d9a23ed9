//! Error types for the tincan framework.

use thiserror::Error;

/// Errors raised by command registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// A command with this name already exists.
    #[error("command '{0}' is already registered")]
    AlreadyRegistered(String),

    /// No command with this name exists.
    #[error("command '{0}' is not registered")]
    NotRegistered(String),
}

/// Errors raised while preparing a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PluginError {
    /// The plugin's config section does not deserialize into its config type.
    #[error("invalid configuration for plugin '{plugin}': {reason}")]
    InvalidConfig {
        /// The plugin name.
        plugin: String,
        /// Reason for failure.
        reason: String,
    },
}

/// Result type for command registration.
pub type CommandResult<T> = Result<T, CommandError>;

/// Result type for plugin operations.
pub type PluginResult<T> = Result<T, PluginError>;
