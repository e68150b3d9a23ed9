//! Configuration module for the tincan runtime.
//!
//! Layered figment loading (defaults, TOML files, `TINCAN_*` environment
//! variables, programmatic overrides) and validation of server, logging and
//! plugin settings.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, PluginEntry, ServerConfig,
    SpanEventConfig, TincanConfig,
};
pub use validation::validate_config;
