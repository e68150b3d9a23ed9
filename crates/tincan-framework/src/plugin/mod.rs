//! Plugin system for tincan.
//!
//! # Architecture
//!
//! Plugins extend the bot purely through its public API: they register
//! observers and commands while loading, and keep whatever state they need in
//! the [`Plugin`] instance they hand back.
//!
//! A [`PluginDescriptor`] is the *static, `Copy` handle* to a plugin: a name,
//! a one-line description and a `load` function pointer. Descriptors are
//! grouped in [`PluginCatalog`]s; the host searches its catalogs in order when
//! asked to load a plugin by name.
//!
//! The host type `H` is a parameter so this crate does not depend on the
//! runtime that defines the bot.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use tincan::prelude::*;
//!
//! struct EchoPlugin;
//! impl Plugin<Bot> for EchoPlugin {}
//!
//! fn load(bot: &Bot, _ctx: &PluginLoadContext) -> anyhow::Result<Box<dyn Plugin<Bot>>> {
//!     bot.register_command("!echo", "Echo the arguments.", false, |bot, inv| {
//!         bot.send_privmsg(&inv.channel, &inv.args)?;
//!         Ok(())
//!     })?;
//!     Ok(Box::new(EchoPlugin))
//! }
//!
//! pub static ECHO: PluginDescriptor<Bot> = PluginDescriptor::new("echo", "Echo arguments.", load);
//! ```
//!
//! # Configuration
//!
//! Each plugin receives its own config section as JSON through
//! [`PluginLoadContext`]. Plugins validate it by deserializing into a typed
//! config with `#[serde(deny_unknown_fields)]`:
//!
//! ```rust,ignore
//! #[derive(serde::Deserialize, Default)]
//! #[serde(default, deny_unknown_fields)]
//! struct EchoConfig { prefix: String }
//!
//! let cfg: EchoConfig = ctx.get_config()?;
//! ```
//!
//! TOML:
//! ```toml
//! [[plugins]]
//! name = "echo"
//! config = { prefix = "[bot]" }
//! ```

pub mod catalog;
pub mod core;
pub mod descriptor;

pub use catalog::PluginCatalog;
pub use core::{Plugin, PluginLoadContext};
pub use descriptor::{LoadFn, PluginDescriptor};
