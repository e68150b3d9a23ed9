use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::error::{PluginError, PluginResult};

// ─── PluginLoadContext ────────────────────────────────────────────────────────

/// Context passed to a plugin's `load` function.
///
/// Provides access to the plugin's configuration section (or an empty JSON
/// object when the section is absent).
///
/// # Example
///
/// ```rust,ignore
/// #[derive(serde::Deserialize)]
/// #[serde(deny_unknown_fields)]
/// struct AutojoinConfig { channels: Vec<String> }
///
/// fn load(bot: &Bot, ctx: &PluginLoadContext) -> anyhow::Result<Box<dyn Plugin<Bot>>> {
///     let cfg: AutojoinConfig = ctx.get_config()?;
///     // ...
/// }
/// ```
#[derive(Clone, Debug)]
pub struct PluginLoadContext {
    name: String,
    /// Raw JSON value for this plugin's config section.
    plugin_config: Arc<serde_json::Value>,
}

impl PluginLoadContext {
    /// Creates a context for plugin `name` with its config section.
    pub fn new(name: impl Into<String>, plugin_config: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            plugin_config: Arc::new(plugin_config),
        }
    }

    /// Returns the name of the plugin being loaded.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the raw config section.
    pub fn raw_config(&self) -> &serde_json::Value {
        &self.plugin_config
    }

    /// Deserialise the plugin config section into `T`.
    ///
    /// Use `#[serde(default)]` on the struct to make all fields optional.
    ///
    /// # Errors
    ///
    /// [`PluginError::InvalidConfig`] if the config is missing required fields
    /// or has the wrong shape.
    pub fn get_config<T>(&self) -> PluginResult<T>
    where
        T: DeserializeOwned,
    {
        T::deserialize(self.plugin_config.as_ref()).map_err(|e| PluginError::InvalidConfig {
            plugin: self.name.clone(),
            reason: e.to_string(),
        })
    }
}

// ─── Plugin ───────────────────────────────────────────────────────────────────

/// A live plugin instance owned by host `H`.
///
/// Returned by a descriptor's `load` function and kept until the host shuts
/// down, when [`unload`](Self::unload) is called in reverse load order.
pub trait Plugin<H>: Send + Sync {
    /// Releases resources held by the plugin.
    ///
    /// The default does nothing.
    fn unload(self: Box<Self>, host: &H) -> anyhow::Result<()> {
        let _ = host;
        Ok(())
    }
}
