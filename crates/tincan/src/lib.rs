//! # tincan
//!
//! A small, pluggable IRC bot.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐  lines  ┌──────────┐  messages  ┌──────────┐  PRIVMSG  ┌───────────────┐
//! │ Connection │────────▶│   Bot    │───────────▶│ EventBus │──────────▶│ CommandRouter │
//! │ (socket)   │◀────────│ (select) │            └──────────┘           └───────────────┘
//! └────────────┘  queue  └──────────┘                 │ observers              │ handlers
//!                              ▲                       ▼                        ▼
//!                              └─────────── Outbound ◀─────── plugins ──────────┘
//! ```
//!
//! - **core**: line framing, message parsing and formatting, the event bus
//! - **transport**: the TCP connection and the thread-safe outbound queue
//! - **framework**: command routing and the plugin contract
//! - **runtime**: the [`Bot`](runtime::Bot), its event loop, configuration and logging
//! - **plugins**: the built-in plugins (`admin`, `autojoin`, `help`, `quit`, `topic`, `rcon`)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tincan::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let bot = Bot::builder().catalog(builtin_catalog()).build()?;
//!
//!     bot.register_command("!ping", "Answer with pong. Usage: !ping", false, |bot, cmd| {
//!         bot.send_privmsg(&cmd.channel, &cmd.address("pong"))?;
//!         Ok(())
//!     })?;
//!
//!     bot.run_until_signal().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: read `tincan.toml` configuration files (default)
//! - `json-log`: allow `logging.format = "json"`

pub use tincan_core as core;
pub use tincan_framework as framework;
pub use tincan_plugins as plugins;
pub use tincan_runtime as runtime;
pub use tincan_transport as transport;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use tincan::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use tincan_runtime::{Bot, BotBuilder, RuntimeError, RuntimeResult};

    // Configuration
    pub use tincan_runtime::{ConfigLoader, PluginEntry, ServerConfig, TincanConfig};

    // Plugin system
    pub use tincan_framework::{
        CommandInvocation, Plugin, PluginCatalog, PluginDescriptor, PluginLoadContext,
    };
    pub use tincan_plugins::builtin_catalog;

    // Protocol types
    pub use tincan_core::{Message, Principal};
}
