//! Tincan Runtime - orchestration layer for the tincan IRC bot.
//!
//! This crate provides:
//! - [`Bot`]: the registration APIs plugins use, the built-in observers
//!   (`ERROR`, `PING`, `001`, `PRIVMSG`) and plugin management
//! - The event loop (`Bot::run`), a single `tokio::select!` over the socket,
//!   the outbound queue and the registration deadline
//! - [`BotBuilder`]: figment-based configuration and logging setup
//!
//! ```rust,ignore
//! use tincan_runtime::Bot;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let bot = Bot::builder()
//!         .catalog(tincan_plugins::builtin_catalog())
//!         .build()?;
//!
//!     // Runs until the server closes the session or Ctrl+C.
//!     bot.run_until_signal().await?;
//!     Ok(())
//! }
//! ```

pub mod bot;
pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use bot::Bot;
pub use config::{ConfigLoader, PluginEntry, ServerConfig, TincanConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::LoggingBuilder;
pub use runtime::{BotBuilder, SHUTDOWN_REASON};
