//! Configuration schema definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TincanConfig {
    /// Server connection and identity.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Plugins to load, in load order.
    #[serde(default)]
    pub plugins: Vec<PluginEntry>,
}

// =============================================================================
// Server
// =============================================================================

/// Server connection and identity settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Host name or address of the IRC server.
    pub host: String,

    /// TCP port.
    pub port: u16,

    /// Nickname requested during registration.
    pub nick: String,

    /// User name sent in `USER`; defaults to the nick.
    pub user: Option<String>,

    /// Real name sent in `USER`; defaults to the nick.
    pub realname: Option<String>,

    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Maximum time between sending `USER` and receiving `001`.
    /// Unbounded when absent.
    pub registration_timeout_secs: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6667,
            nick: "tincan".to_string(),
            user: None,
            realname: None,
            connect_timeout_secs: 30,
            registration_timeout_secs: None,
        }
    }
}

impl ServerConfig {
    /// Returns the user name, falling back to the nick.
    pub fn user(&self) -> &str {
        self.user.as_deref().unwrap_or(&self.nick)
    }

    /// Returns the real name, falling back to the nick.
    pub fn realname(&self) -> &str {
        self.realname.as_deref().unwrap_or(&self.nick)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn registration_timeout(&self) -> Option<Duration> {
        self.registration_timeout_secs.map(Duration::from_secs)
    }
}

// =============================================================================
// Plugins
// =============================================================================

/// One `[[plugins]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PluginEntry {
    /// Plugin name, looked up in the bot's catalogs.
    pub name: String,

    /// Plugin-specific settings, handed to the plugin unchanged.
    #[serde(default = "empty_object")]
    pub config: serde_json::Value,
}

impl PluginEntry {
    /// Creates an entry with an empty config section.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: empty_object(),
        }
    }

    /// Sets the config section (builder pattern).
    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = config;
        self
    }
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line layout.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature.
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    /// Requires `file_path`.
    File,
}

/// Rotation schedule for file output.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct SpanEventConfig {
    pub new: bool,
    pub enter: bool,
    pub exit: bool,
    pub close: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base level, overridden by `RUST_LOG`.
    pub level: LogLevel,

    pub format: LogFormat,

    pub output: LogOutput,

    pub span_events: SpanEventConfig,

    /// Include thread ids in each line.
    pub thread_ids: bool,

    /// Include source file and line number in each line.
    pub file_location: bool,

    /// Log file for `output = "file"`.
    pub file_path: Option<PathBuf>,

    pub rotation: LogRotation,

    /// Log every raw protocol line sent and received.
    pub wire: bool,

    /// Per-target levels, e.g. `tincan_plugins = "debug"`.
    pub filters: BTreeMap<String, LogLevel>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_defaults() {
        let server = ServerConfig::default();
        assert_eq!(server.user(), "tincan");
        assert_eq!(server.realname(), "tincan");
        assert_eq!(server.connect_timeout(), Duration::from_secs(30));
        assert_eq!(server.registration_timeout(), None);
    }

    #[test]
    fn test_plugin_entry_defaults_to_empty_object() {
        let entry: PluginEntry = serde_json::from_str(r#"{ "name": "help" }"#).unwrap();
        assert_eq!(entry, PluginEntry::new("help"));
        assert!(entry.config.as_object().unwrap().is_empty());
    }

    #[test]
    fn test_log_level_serde() {
        let level: LogLevel = serde_json::from_str(r#""warn""#).unwrap();
        assert_eq!(level, LogLevel::Warn);
        assert_eq!(level.to_string(), "warn");
        assert!(serde_json::from_str::<LogLevel>(r#""loud""#).is_err());
    }
}
