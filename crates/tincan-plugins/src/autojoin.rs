//! Joins a fixed set of channels once registration completes.
//!
//! ```toml
//! [[plugins]]
//! name = "autojoin"
//! config = { channels = ["#tincan", "#ops"] }
//! ```

use anyhow::bail;
use serde::Deserialize;
use tincan_core::ObserverId;
use tincan_framework::{Plugin, PluginDescriptor, PluginLoadContext};
use tincan_runtime::Bot;
use tracing::info;

pub static AUTOJOIN_PLUGIN: PluginDescriptor<Bot> = PluginDescriptor::new(
    "autojoin",
    "Join channels once the server accepts the connection.",
    load,
);

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AutojoinConfig {
    /// Channels to join, in order.
    pub channels: Vec<String>,
}

impl Default for AutojoinConfig {
    fn default() -> Self {
        Self {
            channels: vec!["#tincan".to_string()],
        }
    }
}

struct Autojoin {
    observer: ObserverId,
}

impl Plugin<Bot> for Autojoin {
    fn unload(self: Box<Self>, bot: &Bot) -> anyhow::Result<()> {
        bot.unregister_observer(self.observer)?;
        Ok(())
    }
}

fn load(bot: &Bot, ctx: &PluginLoadContext) -> anyhow::Result<Box<dyn Plugin<Bot>>> {
    let config: AutojoinConfig = ctx.get_config()?;
    if let Some(channel) = config
        .channels
        .iter()
        .find(|c| c.is_empty() || c.contains(|ch: char| ch.is_whitespace() || ch == ','))
    {
        bail!("invalid channel name '{channel}'");
    }

    let channels = config.channels;
    let observer = bot.register_observer(None, Some("001"), move |bot, _| {
        let outbound = bot.outbound();
        for channel in &channels {
            info!(channel = %channel, "Joining channel");
            outbound.join(channel)?;
        }
        Ok(())
    });

    Ok(Box::new(Autojoin { observer }))
}
