//! Game server remote console.
//!
//! Runs the external `crcon` client for `!rcon_status` and `!rcon_say`, and
//! optionally follows the server's game log to announce players joining.
//!
//! ```toml
//! [[plugins]]
//! name = "rcon"
//!
//! [plugins.config]
//! server = "games.example.org"
//! port = 27960
//! password = "secret"
//! gamelog = "/var/log/quake3/games.log"
//! gamelog_channels = ["#games"]
//! ```
//!
//! # Game log watcher
//!
//! The watcher runs on its own thread. It starts at the end of the log, polls
//! for appended lines and queues announcements through an
//! [`Outbound`] handle. Unloading the plugin drops the cancel sender, which
//! wakes the watcher immediately, and joins the thread.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use crossbeam::channel::{self, Receiver, Sender};
use regex::Regex;
use serde::Deserialize;
use tincan_framework::{Plugin, PluginDescriptor, PluginLoadContext};
use tincan_runtime::Bot;
use tincan_transport::Outbound;
use tracing::{debug, info, warn};

pub static RCON_PLUGIN: PluginDescriptor<Bot> = PluginDescriptor::new(
    "rcon",
    "Query and talk to a game server through its remote console.",
    load,
);

const NO_GAME: &str = "There is not any game running at the moment.";

static CLIENT_CONNECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\d+:\d+\s*ClientConnect: \d+, Name: (.*), .*$")
        .expect("client connect pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RconConfig {
    pub server: String,
    pub port: u16,
    pub password: Option<String>,

    /// Game log to follow; no watcher is started when unset.
    pub gamelog: Option<PathBuf>,
    pub gamelog_channels: Vec<String>,

    /// Path or name of the `crcon` executable.
    pub crcon: PathBuf,

    /// How often the watcher checks the game log for new lines.
    pub poll_interval_ms: u64,
}

impl Default for RconConfig {
    fn default() -> Self {
        Self {
            server: "localhost".to_string(),
            port: 27960,
            password: None,
            gamelog: None,
            gamelog_channels: Vec::new(),
            crcon: PathBuf::from("crcon"),
            poll_interval_ms: 500,
        }
    }
}

// =============================================================================
// Remote console client
// =============================================================================

/// Invokes `crcon [-p PASSWORD] -P PORT SERVER COMMAND`.
#[derive(Debug, Clone)]
pub struct RconClient {
    program: PathBuf,
    server: String,
    port: u16,
    password: Option<String>,
}

impl RconClient {
    pub fn from_config(config: &RconConfig) -> Self {
        Self {
            program: config.crcon.clone(),
            server: config.server.clone(),
            port: config.port,
            password: config.password.clone(),
        }
    }

    /// Runs one console command.
    ///
    /// Returns `None` when the server printed nothing, which means no game is
    /// running.
    pub fn run(&self, command: &str) -> anyhow::Result<Option<String>> {
        let mut cmd = Command::new(&self.program);
        if let Some(password) = self.password.as_deref().filter(|p| !p.is_empty()) {
            cmd.arg("-p").arg(password);
        }
        cmd.arg("-P")
            .arg(self.port.to_string())
            .arg(&self.server)
            .arg(command);

        debug!(program = %self.program.display(), server = %self.server, "Running rcon command");
        let output = cmd
            .output()
            .with_context(|| format!("failed to run {}", self.program.display()))?;
        if !output.status.success() {
            bail!("{} exited with {}", self.program.display(), output.status);
        }

        Ok(decode_output(&output.stdout))
    }
}

/// Strips the out-of-band header (`0xFF` bytes and spaces) from a reply.
fn decode_output(stdout: &[u8]) -> Option<String> {
    if String::from_utf8_lossy(stdout).trim().is_empty() {
        return None;
    }

    let start = stdout
        .iter()
        .position(|&b| b != 0xFF && b != b' ')
        .unwrap_or(stdout.len());
    Some(String::from_utf8_lossy(&stdout[start..]).into_owned())
}

/// Map and player names parsed from a `status` reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameStatus {
    pub map: String,
    pub players: Vec<String>,
}

impl GameStatus {
    /// Parses the output of the `status` console command.
    ///
    /// The map comes from the `map:` line; player names are the fourth column
    /// of every row after the `---` separator. Shorter rows are skipped.
    pub fn parse(output: &str) -> Self {
        let mut status = Self::default();
        let mut in_players = false;

        for line in output.lines() {
            if in_players {
                let parts: Vec<&str> = line.split_whitespace().collect();
                if let Some(name) = parts.get(3) {
                    status.players.push((*name).to_string());
                }
            } else if line.starts_with("map:") {
                status.map = line
                    .split(':')
                    .nth(1)
                    .map(str::trim)
                    .unwrap_or_default()
                    .to_string();
            } else if line.starts_with("---") {
                in_players = true;
            }
        }

        status
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Map: {} / {} players: {}",
            self.map,
            self.players.len(),
            self.players.join(", ")
        )
    }
}

// =============================================================================
// Game log watcher
// =============================================================================

/// Returns the player name from a `ClientConnect` log line.
pub fn connected_player(line: &str) -> Option<&str> {
    CLIENT_CONNECT
        .captures(line.trim_end())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Background thread following the game log.
#[derive(Debug)]
pub struct GamelogWatcher {
    cancel: Sender<()>,
    handle: JoinHandle<()>,
}

impl GamelogWatcher {
    /// Opens `path`, seeks to its end and starts following it.
    pub fn spawn(
        path: &Path,
        channels: Vec<String>,
        outbound: Outbound,
        poll_interval: Duration,
    ) -> anyhow::Result<Self> {
        let mut file = File::open(path)
            .with_context(|| format!("failed to open game log {}", path.display()))?;
        file.seek(SeekFrom::End(0))?;

        let (cancel, cancelled) = channel::bounded(0);
        let handle = thread::Builder::new()
            .name("tincan-gamelog".to_string())
            .spawn(move || {
                follow(
                    BufReader::new(file),
                    &channels,
                    &outbound,
                    &cancelled,
                    poll_interval,
                );
            })?;

        info!(path = %path.display(), "Watching game log");
        Ok(Self { cancel, handle })
    }

    /// Cancels the watcher and waits for its thread to finish.
    pub fn stop(self) -> anyhow::Result<()> {
        drop(self.cancel);
        self.handle
            .join()
            .map_err(|_| anyhow!("game log watcher panicked"))
    }
}

fn follow<R: BufRead>(
    mut reader: R,
    channels: &[String],
    outbound: &Outbound,
    cancelled: &Receiver<()>,
    poll_interval: Duration,
) {
    let mut pending = Vec::new();

    loop {
        loop {
            match reader.read_until(b'\n', &mut pending) {
                Ok(0) => break,
                // Partial line; the rest is appended on a later poll.
                Ok(_) if !pending.ends_with(b"\n") => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&pending).into_owned();
                    pending.clear();
                    let delivered = announce(&line, channels, outbound);
                    if !delivered {
                        debug!("Outbound queue closed, stopping game log watcher");
                        return;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read game log");
                    return;
                }
            }
        }

        channel::select! {
            recv(cancelled) -> _ => return,
            default(poll_interval) => {}
        }
    }
}

/// Returns false once the outbound queue is gone.
fn announce(line: &str, channels: &[String], outbound: &Outbound) -> bool {
    let Some(name) = connected_player(line) else {
        return true;
    };

    info!(player = %name, "Player connected");
    let text = format!("{name} connected.");
    for channel in channels {
        if let Err(e) = outbound.privmsg(channel, &text) {
            if outbound.is_closed() {
                return false;
            }
            warn!(error = %e, channel = %channel, "Failed to announce player");
        }
    }
    true
}

// =============================================================================
// Plugin
// =============================================================================

const STATUS_COMMAND: &str = "!rcon_status";
const SAY_COMMAND: &str = "!rcon_say";

struct Rcon {
    watcher: Option<GamelogWatcher>,
}

impl Plugin<Bot> for Rcon {
    fn unload(self: Box<Self>, bot: &Bot) -> anyhow::Result<()> {
        let status = bot.unregister_command(STATUS_COMMAND);
        let say = bot.unregister_command(SAY_COMMAND);
        if let Some(watcher) = self.watcher {
            watcher.stop()?;
        }
        status?;
        say?;
        Ok(())
    }
}

fn load(bot: &Bot, ctx: &PluginLoadContext) -> anyhow::Result<Box<dyn Plugin<Bot>>> {
    let config: RconConfig = ctx.get_config()?;
    if config.port == 0 {
        bail!("port must be non-zero");
    }
    if config.poll_interval_ms == 0 {
        bail!("poll_interval_ms must be greater than 0");
    }

    // Started before any command exists, so a bad log path registers nothing.
    let watcher = match &config.gamelog {
        Some(path) => Some(GamelogWatcher::spawn(
            path,
            config.gamelog_channels.clone(),
            bot.outbound(),
            Duration::from_millis(config.poll_interval_ms),
        )?),
        None => None,
    };

    if let Err(e) = register_commands(bot, RconClient::from_config(&config)) {
        if let Some(watcher) = watcher {
            watcher.stop()?;
        }
        return Err(e);
    }

    Ok(Box::new(Rcon { watcher }))
}

/// Registers both commands, or neither.
fn register_commands(bot: &Bot, client: RconClient) -> anyhow::Result<()> {
    bot.register_command(
        STATUS_COMMAND,
        "Show game status. Usage: !rcon_status",
        false,
        {
            let client = client.clone();
            move |bot, invocation| {
                let reply = match client.run("status")? {
                    Some(output) => GameStatus::parse(&output).to_string(),
                    None => invocation.address(NO_GAME),
                };
                bot.send_privmsg(&invocation.channel, &reply)?;
                Ok(())
            }
        },
    )?;

    let registered = bot.register_command(
        SAY_COMMAND,
        "Say something in the game. Usage: !rcon_say Pizzas are here!",
        true,
        move |bot, invocation| {
            if client.run(&format!("say {}", invocation.args))?.is_none() {
                bot.send_privmsg(&invocation.channel, &invocation.address(NO_GAME))?;
            }
            Ok(())
        },
    );
    if let Err(e) = registered {
        bot.unregister_command(STATUS_COMMAND)?;
        return Err(e.into());
    }

    Ok(())
}
