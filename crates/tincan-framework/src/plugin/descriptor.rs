//! Plugin descriptor: the static, `Copy` handle to a plugin.

use std::fmt;

use super::core::{Plugin, PluginLoadContext};

/// Signature of a plugin's `load` function.
pub type LoadFn<H> = fn(&H, &PluginLoadContext) -> anyhow::Result<Box<dyn Plugin<H>>>;

/// A static descriptor that identifies and instantiates a plugin.
///
/// Descriptors are usually stored in `static` items:
///
/// ```rust,ignore
/// pub static HELP: PluginDescriptor<Bot> =
///     PluginDescriptor::new("help", "List commands and show their descriptions.", load);
/// ```
pub struct PluginDescriptor<H> {
    /// Plugin name, used as the lookup key and in logs.
    pub name: &'static str,

    /// One-line description.
    pub desc: &'static str,

    /// Registers the plugin's observers and commands on the host.
    pub load: LoadFn<H>,
}

impl<H> PluginDescriptor<H> {
    /// Creates a descriptor.
    pub const fn new(name: &'static str, desc: &'static str, load: LoadFn<H>) -> Self {
        Self { name, desc, load }
    }

    /// Runs the plugin's `load` function against `host`.
    #[inline]
    pub fn instantiate(
        &self,
        host: &H,
        ctx: &PluginLoadContext,
    ) -> anyhow::Result<Box<dyn Plugin<H>>> {
        (self.load)(host, ctx)
    }
}

impl<H> Clone for PluginDescriptor<H> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<H> Copy for PluginDescriptor<H> {}

impl<H> fmt::Debug for PluginDescriptor<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("name", &self.name)
            .field("desc", &self.desc)
            .finish()
    }
}
