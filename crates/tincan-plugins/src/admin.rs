//! Admin management.
//!
//! Seeds the bot's authorized principals from configuration and adds commands
//! to inspect and change them at runtime. All three commands require
//! authorization, so at least one admin must be configured to use them.
//!
//! ```toml
//! [[plugins]]
//! name = "admin"
//!
//! [plugins.config]
//! admins = ["fanatic!fan.atic@example.org"]
//! # Commands anyone may run; every other command becomes admin-only.
//! command_whitelist = ["!help", "!topic_log"]
//! ```

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::anyhow;
use serde::Deserialize;
use tincan_core::Principal;
use tincan_framework::{CommandContext, Plugin, PluginDescriptor, PluginLoadContext};
use tincan_runtime::Bot;
use tracing::{info, warn};

pub static ADMIN_PLUGIN: PluginDescriptor<Bot> = PluginDescriptor::new(
    "admin",
    "Manage the principals allowed to run restricted commands.",
    load,
);

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdminConfig {
    /// Initial admins, as `nick!user@host`.
    pub admins: Vec<String>,

    /// When set, non-admins may only run the listed commands.
    pub command_whitelist: Option<Vec<String>>,
}

/// Parses a `nick!user@host` argument.
pub fn parse_admin(arg: &str) -> anyhow::Result<Principal> {
    Principal::parse(arg).map_err(|_| {
        anyhow!("malformed admin identifier, should be of form 'nick!user@example.org'")
    })
}

const COMMANDS: [&str; 3] = ["!admin_list", "!admin_add", "!admin_remove"];

struct Admin {
    /// Cleared on unload; command hooks stay installed, so the whitelist hook
    /// checks this before refusing anything.
    whitelist_active: Arc<AtomicBool>,
}

impl Plugin<Bot> for Admin {
    fn unload(self: Box<Self>, bot: &Bot) -> anyhow::Result<()> {
        self.whitelist_active.store(false, Ordering::Release);
        for name in COMMANDS {
            bot.unregister_command(name)?;
        }
        Ok(())
    }
}

fn load(bot: &Bot, ctx: &PluginLoadContext) -> anyhow::Result<Box<dyn Plugin<Bot>>> {
    let config: AdminConfig = ctx.get_config()?;

    let admins = config
        .admins
        .iter()
        .map(String::as_str)
        .map(parse_admin)
        .collect::<anyhow::Result<Vec<_>>>()?;
    for admin in admins {
        bot.add_admin(admin);
    }

    let whitelist_active = Arc::new(AtomicBool::new(config.command_whitelist.is_some()));
    if let Some(whitelist) = config.command_whitelist {
        let whitelist: HashSet<String> = whitelist.into_iter().collect();
        let active = Arc::clone(&whitelist_active);
        bot.add_command_hook(move |bot, invocation| {
            if !active.load(Ordering::Acquire)
                || whitelist.contains(&invocation.command)
                || bot.is_authorized(&invocation.principal())
            {
                return true;
            }

            warn!(host = %invocation.host, command = %invocation.command, "Command not whitelisted");
            let refusal = invocation.address(format_args!(
                "only admins are allowed to {}",
                invocation.command
            ));
            if let Err(e) = bot.send_privmsg(&invocation.channel, &refusal) {
                warn!(error = %e, "Failed to send refusal");
            }
            false
        });
    }

    bot.register_command(
        COMMANDS[0],
        "List bot admins. Usage: !admin_list",
        true,
        |bot, invocation| {
            let admins: Vec<String> = bot.admins().iter().map(ToString::to_string).collect();
            bot.send_privmsg(&invocation.channel, &invocation.address(admins.join(" ")))?;
            Ok(())
        },
    )?;

    bot.register_command(
        COMMANDS[1],
        "Add a bot admin. Usage: !admin_add NICK!USER@HOST, e.g. !admin_add fanatic!fan.atic@example.org",
        true,
        |bot, invocation| {
            let admin = parse_admin(&invocation.args)?;
            if bot.add_admin(admin.clone()) {
                info!(admin = %admin, by = %invocation.nick, "Admin added");
            }
            Ok(())
        },
    )?;

    bot.register_command(
        COMMANDS[2],
        "Remove a bot admin. Usage: !admin_remove NICK!USER@HOST, e.g. !admin_remove fanatic!fan.atic@example.org",
        true,
        |bot, invocation| {
            let admin = parse_admin(&invocation.args)?;
            if bot.remove_admin(&admin) {
                info!(admin = %admin, by = %invocation.nick, "Admin removed");
            }
            Ok(())
        },
    )?;

    Ok(Box::new(Admin { whitelist_active }))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::{OWNER, STRANGER, bot, drain, load, say};

    fn instantiate(bot: &Bot, config: serde_json::Value) -> Box<dyn Plugin<Bot>> {
        let ctx = PluginLoadContext::new("admin", config);
        ADMIN_PLUGIN.instantiate(bot, &ctx).unwrap()
    }

    #[test]
    fn test_parse_admin() {
        let admin = parse_admin(" fanatic!fan.atic@example.org ").unwrap();
        assert_eq!(admin, Principal::new("fanatic", "fan.atic@example.org"));

        let err = parse_admin("fanatic").unwrap_err();
        assert_eq!(
            err.to_string(),
            "malformed admin identifier, should be of form 'nick!user@example.org'"
        );
    }

    #[test]
    fn test_seeds_admins_from_config() {
        let (bot, _rx) = bot();
        load(&bot, "admin", json!({ "admins": [OWNER] }));

        assert!(bot.is_authorized(&Principal::from_origin(OWNER)));
        assert!(!bot.is_authorized(&Principal::from_origin(STRANGER)));
    }

    #[test]
    fn test_rejects_malformed_seed() {
        let (bot, _rx) = bot();
        let err = bot
            .load_plugin("admin", json!({ "admins": ["nobody"] }))
            .unwrap_err();
        assert!(err.to_string().contains("malformed admin identifier"));
    }

    #[test]
    fn test_add_list_remove() {
        let (bot, mut rx) = bot();
        load(&bot, "admin", json!({ "admins": [OWNER] }));

        say(&bot, OWNER, "!admin_add fanatic!fan.atic@example.org");
        assert!(drain(&mut rx).is_empty());

        say(&bot, OWNER, "!admin_list");
        assert_eq!(
            drain(&mut rx),
            ["PRIVMSG #chan :owner: fanatic!fan.atic@example.org owner!o@example.org"]
        );

        say(&bot, OWNER, "!admin_remove fanatic!fan.atic@example.org");
        say(&bot, OWNER, "!admin_list");
        assert_eq!(drain(&mut rx), ["PRIVMSG #chan :owner: owner!o@example.org"]);
    }

    #[test]
    fn test_malformed_argument_is_reported() {
        let (bot, mut rx) = bot();
        load(&bot, "admin", json!({ "admins": [OWNER] }));

        say(&bot, OWNER, "!admin_add fanatic");
        assert_eq!(
            drain(&mut rx),
            ["PRIVMSG #chan :owner: error: malformed admin identifier, should be of form 'nick!user@example.org'"]
        );
        assert_eq!(bot.admins().len(), 1);
    }

    #[test]
    fn test_commands_require_authorization() {
        let (bot, mut rx) = bot();
        load(&bot, "admin", json!({ "admins": [OWNER] }));

        say(&bot, STRANGER, "!admin_add stranger!s@example.net");
        assert_eq!(
            drain(&mut rx),
            ["PRIVMSG #chan :stranger: only admins are allowed to !admin_add"]
        );
        assert_eq!(bot.admins().len(), 1);
    }

    #[test]
    fn test_whitelist_restricts_other_commands() {
        let (bot, mut rx) = bot();
        load(
            &bot,
            "admin",
            json!({ "admins": [OWNER], "command_whitelist": ["!help"] }),
        );
        load(&bot, "help", json!({}));
        load(&bot, "topic", json!({}));

        say(&bot, STRANGER, "!topic_log");
        assert_eq!(
            drain(&mut rx),
            ["PRIVMSG #chan :stranger: only admins are allowed to !topic_log"]
        );

        say(&bot, STRANGER, "!help !help");
        assert_eq!(drain(&mut rx).len(), 1);

        say(&bot, OWNER, "!topic_log");
        assert_eq!(
            drain(&mut rx),
            ["PRIVMSG #chan :owner: Topic log is empty."]
        );
    }

    #[test]
    fn test_unload_removes_commands() {
        let (bot, _rx) = bot();
        let plugin = instantiate(&bot, json!({ "admins": [OWNER] }));
        assert_eq!(bot.command_descriptions().len(), 3);

        plugin.unload(&bot).unwrap();
        assert!(bot.command_descriptions().is_empty());
    }

    #[test]
    fn test_unload_lifts_whitelist() {
        let (bot, mut rx) = bot();
        let plugin = instantiate(
            &bot,
            json!({ "admins": [OWNER], "command_whitelist": ["!help"] }),
        );
        load(&bot, "topic", json!({}));

        plugin.unload(&bot).unwrap();
        say(&bot, STRANGER, "!topic_log");
        assert_eq!(
            drain(&mut rx),
            ["PRIVMSG #chan :stranger: Topic log is empty."]
        );
    }
}
