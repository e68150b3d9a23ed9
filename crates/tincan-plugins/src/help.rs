//! `!help`: lists commands and shows their descriptions.

use tincan_framework::{Plugin, PluginDescriptor, PluginLoadContext};
use tincan_runtime::Bot;

pub static HELP_PLUGIN: PluginDescriptor<Bot> = PluginDescriptor::new(
    "help",
    "List commands and show their descriptions.",
    load,
);

const HELP_COMMAND: &str = "!help";

struct Help;

impl Plugin<Bot> for Help {
    fn unload(self: Box<Self>, bot: &Bot) -> anyhow::Result<()> {
        bot.unregister_command(HELP_COMMAND)?;
        Ok(())
    }
}

fn load(bot: &Bot, _ctx: &PluginLoadContext) -> anyhow::Result<Box<dyn Plugin<Bot>>> {
    bot.register_command(
        HELP_COMMAND,
        "Since you got this far, you already know what this command does.",
        false,
        |bot, invocation| {
            let descriptions = bot.command_descriptions();
            let wanted = invocation.args.trim();

            if wanted.is_empty() {
                let names: Vec<&str> = descriptions.keys().map(String::as_str).collect();
                bot.send_privmsg(
                    &invocation.channel,
                    &invocation.address(format_args!("Commands: {}", names.join(", "))),
                )?;
                bot.send_privmsg(
                    &invocation.channel,
                    &invocation.address(format_args!(
                        "To get detailed help on a command, use {HELP_COMMAND} COMMAND, e.g. {HELP_COMMAND} {HELP_COMMAND}"
                    )),
                )?;
                return Ok(());
            }

            let reply = match descriptions.get(wanted) {
                Some(description) => invocation.address(format_args!("{wanted} - {description}")),
                None => invocation.address(format_args!("command '{wanted}' not found")),
            };
            bot.send_privmsg(&invocation.channel, &reply)?;
            Ok(())
        },
    )?;

    Ok(Box::new(Help))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::{STRANGER, bot, drain, load, say};

    #[test]
    fn test_lists_sorted_commands() {
        let (bot, mut rx) = bot();
        load(&bot, "quit", json!({}));
        load(&bot, "help", json!({}));

        say(&bot, STRANGER, "!help");
        assert_eq!(
            drain(&mut rx),
            [
                "PRIVMSG #chan :stranger: Commands: !help, !quit",
                "PRIVMSG #chan :stranger: To get detailed help on a command, use !help COMMAND, e.g. !help !help",
            ]
        );
    }

    #[test]
    fn test_describes_one_command() {
        let (bot, mut rx) = bot();
        load(&bot, "help", json!({}));

        say(&bot, STRANGER, "!help !help");
        assert_eq!(
            drain(&mut rx),
            ["PRIVMSG #chan :stranger: !help - Since you got this far, you already know what this command does."]
        );
    }

    #[test]
    fn test_unknown_command() {
        let (bot, mut rx) = bot();
        load(&bot, "help", json!({}));

        say(&bot, STRANGER, "!help !nope");
        assert_eq!(
            drain(&mut rx),
            ["PRIVMSG #chan :stranger: command '!nope' not found"]
        );
    }

    #[test]
    fn test_unload_removes_command() {
        let (bot, _rx) = bot();
        let ctx = PluginLoadContext::new("help", json!({}));
        let plugin = HELP_PLUGIN.instantiate(&bot, &ctx).unwrap();
        assert!(bot.command_descriptions().contains_key(HELP_COMMAND));

        plugin.unload(&bot).unwrap();
        assert!(bot.command_descriptions().is_empty());
    }
}
