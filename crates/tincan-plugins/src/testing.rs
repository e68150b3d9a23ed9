//! Fixtures shared by the plugin tests.

use serde_json::Value;
use tincan_core::Message;
use tincan_runtime::{Bot, ServerConfig};
use tincan_transport::OutboundReceiver;

pub(crate) const OWNER: &str = "owner!o@example.org";
pub(crate) const STRANGER: &str = "stranger!s@example.net";

/// A bot with the built-in catalog and its outbound queue.
pub(crate) fn bot() -> (Bot, OutboundReceiver) {
    let bot = Bot::new(ServerConfig::default());
    bot.add_catalog(crate::builtin_catalog());
    let rx = bot.take_receiver().unwrap();
    (bot, rx)
}

pub(crate) fn load(bot: &Bot, name: &str, config: Value) {
    assert!(bot.load_plugin(name, config).unwrap());
}

/// Feeds one raw server line through the bot.
pub(crate) fn receive(bot: &Bot, line: &str) {
    bot.dispatch(&Message::parse(line).unwrap()).unwrap();
}

/// Sends `text` to the bot on `#chan` as `sender`.
pub(crate) fn say(bot: &Bot, sender: &str, text: &str) {
    let line = format!(":{sender} PRIVMSG #chan :{}: {text}", bot.nick());
    receive(bot, &line);
}

pub(crate) fn drain(rx: &mut OutboundReceiver) -> Vec<String> {
    let mut lines = Vec::new();
    while let Ok(line) = rx.try_recv() {
        lines.push(line);
    }
    lines
}
