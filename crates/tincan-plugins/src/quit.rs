//! `!quit [MESSAGE]`: stops the bot.

use tincan_framework::{Plugin, PluginDescriptor, PluginLoadContext};
use tincan_runtime::Bot;
use tracing::info;

pub static QUIT_PLUGIN: PluginDescriptor<Bot> =
    PluginDescriptor::new("quit", "Stop the bot on request.", load);

const QUIT_COMMAND: &str = "!quit";

struct Quit;

impl Plugin<Bot> for Quit {
    fn unload(self: Box<Self>, bot: &Bot) -> anyhow::Result<()> {
        bot.unregister_command(QUIT_COMMAND)?;
        Ok(())
    }
}

fn load(bot: &Bot, _ctx: &PluginLoadContext) -> anyhow::Result<Box<dyn Plugin<Bot>>> {
    bot.register_command(
        QUIT_COMMAND,
        "Quits the bot, optionally with a message. Usage: !quit [MESSAGE], e.g. !quit So Long, and Thanks for All the Fish!",
        true,
        |bot, invocation| {
            info!(by = %invocation.nick, "Quit requested");
            bot.stop(invocation.args.trim());
            Ok(())
        },
    )?;

    Ok(Box::new(Quit))
}
