//! Configuration validation.

use std::collections::HashSet;

use super::error::{ConfigError, ConfigResult};
use super::schema::{LogFormat, LogOutput, LoggingConfig, PluginEntry, ServerConfig, TincanConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &TincanConfig) -> ConfigResult<()> {
    validate_server_config(&config.server)?;
    validate_logging_config(&config.logging)?;
    validate_plugins(&config.plugins)?;
    Ok(())
}

fn validate_server_config(server: &ServerConfig) -> ConfigResult<()> {
    if server.host.is_empty() {
        return Err(ConfigError::missing_field("server.host"));
    }

    if server.port == 0 {
        return Err(ConfigError::InvalidPort(server.port));
    }

    validate_token(&server.nick, "server.nick")?;
    if let Some(user) = &server.user {
        validate_token(user, "server.user")?;
    }
    if let Some(realname) = &server.realname {
        if realname.contains(['\r', '\n']) {
            return Err(ConfigError::validation(
                "server.realname cannot contain line breaks",
            ));
        }
    }

    if server.connect_timeout_secs == 0 {
        return Err(ConfigError::validation(
            "server.connect_timeout_secs must be greater than zero",
        ));
    }
    if server.registration_timeout_secs == Some(0) {
        return Err(ConfigError::validation(
            "server.registration_timeout_secs must be greater than zero",
        ));
    }

    Ok(())
}

/// Nick and user name travel as middle params, so they must be single tokens.
fn validate_token(value: &str, field: &str) -> ConfigResult<()> {
    if value.is_empty() {
        return Err(ConfigError::missing_field(field));
    }
    if value.starts_with(':') || value.contains(char::is_whitespace) {
        return Err(ConfigError::validation(format!(
            "{field} cannot contain whitespace or start with ':'"
        )));
    }
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    if logging.format == LogFormat::Json && !cfg!(feature = "json-log") {
        return Err(ConfigError::validation(
            "logging.format = \"json\" requires the json-log feature",
        ));
    }

    if logging.filters.keys().any(|target| target.trim().is_empty()) {
        return Err(ConfigError::validation("logging.filters keys cannot be empty"));
    }

    Ok(())
}

fn validate_plugins(plugins: &[PluginEntry]) -> ConfigResult<()> {
    let mut seen = HashSet::new();
    for entry in plugins {
        if entry.name.is_empty() {
            return Err(ConfigError::missing_field("plugins.name"));
        }
        if !seen.insert(entry.name.as_str()) {
            return Err(ConfigError::DuplicatePlugin(entry.name.clone()));
        }
        if !entry.config.is_object() {
            return Err(ConfigError::validation(format!(
                "plugins.config for '{}' must be a table",
                entry.name
            )));
        }
    }
    Ok(())
}
