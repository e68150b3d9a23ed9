//! # Tincan Framework
//!
//! Higher-level components built on the core event bus.
//!
//! This layer provides:
//! - [`CommandRouter`]: recognises `<nick>: <command> <args>` messages,
//!   enforces authorization and isolates handler failures
//! - The plugin contract: [`PluginDescriptor`], [`PluginCatalog`],
//!   [`PluginLoadContext`] and the [`Plugin`] trait
//!
//! Both are generic over the host type so the runtime that owns the connection
//! can plug itself in without this crate depending on it.

pub mod command;
pub mod error;
pub mod plugin;

pub use command::{
    CommandContext, CommandHandler, CommandHook, CommandInvocation, CommandRouter, RouteOutcome,
};
pub use error::{CommandError, CommandResult, PluginError, PluginResult};
pub use plugin::{LoadFn, Plugin, PluginCatalog, PluginDescriptor, PluginLoadContext};
