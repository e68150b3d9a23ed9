//! Built-in plugins shipped with tincan.
//!
//! Every plugin registers observers and commands on a [`Bot`] when loaded and
//! reads its settings from the `config` table of its `[[plugins]]` entry.
//!
//! | Plugin | Commands | Description |
//! |--------|----------|-------------|
//! | [`AUTOJOIN_PLUGIN`] | | Joins `channels` once the server welcomes the bot |
//! | [`ADMIN_PLUGIN`] | `!admin_list`, `!admin_add`, `!admin_remove` | Manages authorized principals |
//! | [`HELP_PLUGIN`] | `!help` | Lists commands and shows their descriptions |
//! | [`QUIT_PLUGIN`] | `!quit` | Stops the bot |
//! | [`TOPIC_PLUGIN`] | `!topic_log` | Remembers recent topics per channel |
//! | [`RCON_PLUGIN`] | `!rcon_status`, `!rcon_say` | Talks to a game server through `crcon` |
//!
//! # Loading
//!
//! ```toml
//! [[plugins]]
//! name = "admin"
//! config = { admins = ["fanatic!fan.atic@example.org"] }
//!
//! [[plugins]]
//! name = "help"
//! ```
//!
//! ```rust,ignore
//! let bot = Bot::builder()
//!     .catalog(tincan_plugins::builtin_catalog())
//!     .build()?;
//! ```

pub mod admin;
pub mod autojoin;
pub mod help;
pub mod quit;
pub mod rcon;
pub mod topic;

#[cfg(test)]
mod testing;

use tincan_framework::PluginCatalog;
use tincan_runtime::Bot;

pub use admin::ADMIN_PLUGIN;
pub use autojoin::AUTOJOIN_PLUGIN;
pub use help::HELP_PLUGIN;
pub use quit::QUIT_PLUGIN;
pub use rcon::RCON_PLUGIN;
pub use topic::TOPIC_PLUGIN;

/// Location reported for the built-in catalog.
pub const BUILTIN_LOCATION: &str = "builtin";

/// Returns a catalog containing every built-in plugin.
pub fn builtin_catalog() -> PluginCatalog<Bot> {
    PluginCatalog::new(BUILTIN_LOCATION)
        .with(AUTOJOIN_PLUGIN)
        .with(ADMIN_PLUGIN)
        .with(HELP_PLUGIN)
        .with(QUIT_PLUGIN)
        .with(TOPIC_PLUGIN)
        .with(RCON_PLUGIN)
}
