//! Topic history.
//!
//! Records every `TOPIC` change per channel, newest first, and replays the
//! current channel's history on `!topic_log`. Entries are numbered from zero.
//!
//! ```toml
//! [[plugins]]
//! name = "topic"
//! config = { max_topic_log_len = 5 }
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use anyhow::bail;
use parking_lot::Mutex;
use serde::Deserialize;
use tincan_core::ObserverId;
use tincan_framework::{Plugin, PluginDescriptor, PluginLoadContext};
use tincan_runtime::Bot;
use tracing::debug;

pub static TOPIC_PLUGIN: PluginDescriptor<Bot> = PluginDescriptor::new(
    "topic",
    "Remember recent channel topics.",
    load,
);

const TOPIC_LOG_COMMAND: &str = "!topic_log";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TopicConfig {
    /// Topics kept per channel.
    pub max_topic_log_len: usize,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            max_topic_log_len: 3,
        }
    }
}

/// Bounded per-channel topic history, newest first.
#[derive(Debug)]
pub struct TopicLog {
    max_len: usize,
    channels: Mutex<HashMap<String, VecDeque<String>>>,
}

impl TopicLog {
    pub fn new(max_len: usize) -> Self {
        Self {
            max_len,
            channels: Mutex::new(HashMap::new()),
        }
    }

    pub fn record(&self, channel: &str, topic: &str) {
        let mut channels = self.channels.lock();
        let log = channels.entry(channel.to_string()).or_default();
        log.push_front(topic.to_string());
        log.truncate(self.max_len);
    }

    /// Returns the channel's topics, newest first.
    pub fn topics(&self, channel: &str) -> Vec<String> {
        self.channels
            .lock()
            .get(channel)
            .map(|log| log.iter().cloned().collect())
            .unwrap_or_default()
    }
}

struct Topic {
    observer: ObserverId,
}

impl Plugin<Bot> for Topic {
    fn unload(self: Box<Self>, bot: &Bot) -> anyhow::Result<()> {
        bot.unregister_observer(self.observer)?;
        bot.unregister_command(TOPIC_LOG_COMMAND)?;
        Ok(())
    }
}

fn load(bot: &Bot, ctx: &PluginLoadContext) -> anyhow::Result<Box<dyn Plugin<Bot>>> {
    let config: TopicConfig = ctx.get_config()?;
    if config.max_topic_log_len == 0 {
        bail!("max_topic_log_len must be greater than 0");
    }

    let log = Arc::new(TopicLog::new(config.max_topic_log_len));

    bot.register_command(
        TOPIC_LOG_COMMAND,
        "Show the topic log. Usage: !topic_log",
        false,
        {
            let log = Arc::clone(&log);
            move |bot, invocation| {
                let topics = log.topics(&invocation.channel);
                if topics.is_empty() {
                    bot.send_privmsg(
                        &invocation.channel,
                        &invocation.address("Topic log is empty."),
                    )?;
                }
                for (i, topic) in topics.iter().enumerate() {
                    bot.send_privmsg(
                        &invocation.channel,
                        &invocation.address(format_args!("{i}: {topic}")),
                    )?;
                }
                Ok(())
            }
        },
    )?;

    let observer = bot.register_observer(None, Some("TOPIC"), move |_, message| {
        match message.params() {
            [channel, .., topic] => {
                debug!(channel = %channel, "Topic changed");
                log.record(channel, topic);
            }
            _ => debug!("Ignoring TOPIC without channel and topic"),
        }
        Ok(())
    });

    Ok(Box::new(Topic { observer }))
}
