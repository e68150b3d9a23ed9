//! The event loop and bot construction from configuration.
//!
//! ```text
//! connect ─▶ NICK/USER ─▶ loop { outbound queue | registration deadline | socket } ─▶ QUIT ─▶ shutdown ─▶ unload plugins
//! ```

use std::future::Future;
use std::path::Path;

use tincan_core::ConnectionState;
use tincan_core::codec::format;
use tincan_framework::PluginCatalog;
use tincan_transport::{Connection, OutboundReceiver};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::signal;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::bot::Bot;
use crate::config::{ConfigLoader, TincanConfig, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

/// `QUIT` reason used when a shutdown signal stops the bot.
pub const SHUTDOWN_REASON: &str = "Shutting down";

impl Bot {
    /// Returns a builder that loads configuration from files and environment.
    pub fn builder() -> BotBuilder {
        BotBuilder::new()
    }

    /// Connects to the configured server and runs until stopped or failed.
    ///
    /// A bot runs once; a second call fails with
    /// [`RuntimeError::AlreadyStarted`].
    pub async fn run(&self) -> RuntimeResult<()> {
        let outbound_rx = self.take_receiver()?;
        let server = &self.inner.server;

        self.set_state(ConnectionState::Connecting);
        match Connection::connect(&server.host, server.port, server.connect_timeout()).await {
            Ok(connection) => self.drive(connection, outbound_rx).await,
            Err(e) => {
                self.set_state(ConnectionState::Disconnected);
                self.unload_plugins();
                Err(e.into())
            }
        }
    }

    /// Runs the session over an already established connection.
    pub async fn run_on<S>(&self, connection: Connection<S>) -> RuntimeResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let outbound_rx = self.take_receiver()?;
        self.drive(connection, outbound_rx).await
    }

    /// Runs until `shutdown` completes, then stops gracefully.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        let run = self.run();
        tokio::pin!(run);

        tokio::select! {
            result = &mut run => return result,
            () = shutdown => self.stop(SHUTDOWN_REASON),
        }

        run.await
    }

    /// Runs until Ctrl+C or SIGTERM, then stops gracefully.
    pub async fn run_until_signal(&self) -> RuntimeResult<()> {
        self.run_until(wait_for_shutdown()).await
    }

    async fn drive<S>(
        &self,
        mut connection: Connection<S>,
        mut outbound_rx: OutboundReceiver,
    ) -> RuntimeResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let result = self.session(&mut connection, &mut outbound_rx).await;

        if let Err(e) = connection.shutdown().await {
            warn!(error = %e, "Connection shutdown failed");
        }
        self.set_state(ConnectionState::Disconnected);
        self.unload_plugins();

        info!(clean = result.is_ok(), "Session ended");
        result
    }

    async fn session<S>(
        &self,
        connection: &mut Connection<S>,
        outbound_rx: &mut OutboundReceiver,
    ) -> RuntimeResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let server = &self.inner.server;
        let nick = self.nick();

        connection.send(&format::nick(&nick)).await?;
        connection
            .send(&format::user(server.user(), server.realname()))
            .await?;
        self.set_state(ConnectionState::Registering);
        info!(nick = %nick, peer = %connection.peer(), "Registration sent");

        let registration_timeout = server.registration_timeout();
        let deadline = registration_timeout.map(|timeout| Instant::now() + timeout);

        loop {
            if let Some(reason) = self.stop_reason() {
                return self.quit(connection, outbound_rx, &reason).await;
            }
            let registering = self.state() == ConnectionState::Registering;

            tokio::select! {
                biased;

                () = self.inner.stop_notify.notified() => {}

                Some(line) = outbound_rx.recv() => connection.send(&line).await?,

                () = wait_until(deadline), if registering => {
                    return Err(RuntimeError::RegistrationTimeout(
                        registration_timeout.unwrap_or_default(),
                    ));
                }

                batch = connection.receive() => {
                    for message in batch? {
                        self.dispatch(&message)?;
                    }
                }
            }
        }
    }

    /// Flushes queued lines, then sends `QUIT`.
    async fn quit<S>(
        &self,
        connection: &mut Connection<S>,
        outbound_rx: &mut OutboundReceiver,
        reason: &str,
    ) -> RuntimeResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        self.set_state(ConnectionState::Stopping);

        while let Ok(line) = outbound_rx.try_recv() {
            connection.send(&line).await?;
        }

        let mut quit = format::quit(Some(reason));
        if format::check_line(&quit).is_err() {
            warn!("Quit reason does not fit in one line, sending QUIT without it");
            quit = format::quit(None);
        }
        connection.send(&quit).await?;
        info!(reason, "Quit sent");
        Ok(())
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Waits for shutdown signals (Ctrl+C or SIGTERM).
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
                return;
            }
            Err(e) => warn!(error = %e, "Failed to register SIGTERM handler"),
        }
    }

    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// BotBuilder
// =============================================================================

/// Builds a [`Bot`] from layered configuration.
///
/// Loads and validates the configuration, initializes logging, registers the
/// plugin catalogs and loads the configured plugins in order.
///
/// ```rust,ignore
/// let bot = Bot::builder()
///     .config_file("tincan.toml")
///     .catalog(tincan_plugins::builtin_catalog())
///     .build()?;
/// bot.run_until_signal().await?;
/// ```
pub struct BotBuilder {
    config_loader: ConfigLoader,
    catalogs: Vec<PluginCatalog<Bot>>,
    init_logging: bool,
}

impl BotBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
            catalogs: Vec::new(),
            init_logging: true,
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g., "development", "production").
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: TincanConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Appends a plugin search location.
    pub fn catalog(mut self, catalog: PluginCatalog<Bot>) -> Self {
        self.catalogs.push(catalog);
        self
    }

    /// Leaves the global tracing subscriber alone.
    pub fn without_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    /// Builds the bot.
    pub fn build(self) -> RuntimeResult<Bot> {
        let config = self.config_loader.load()?;
        validate_config(&config)?;

        if self.init_logging {
            logging::init_from_config(&config.logging);
        }

        let bot = Bot::new(config.server.clone());
        for catalog in self.catalogs {
            bot.add_catalog(catalog);
        }

        if let Err(e) = bot.load_plugins(&config.plugins) {
            bot.unload_plugins();
            return Err(e);
        }

        info!(
            server = %config.server.host,
            port = config.server.port,
            nick = %config.server.nick,
            plugins = ?bot.loaded_plugins(),
            "Bot configured"
        );
        Ok(bot)
    }
}

impl Default for BotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::config::{ConfigError, PluginEntry, ServerConfig};
    use tincan_framework::{Plugin, PluginDescriptor, PluginLoadContext};
    use tincan_transport::TransportError;
    use tokio_test::io::{Builder, Mock};

    const NICK: &[u8] = b"NICK tincan\r\n";
    const USER: &[u8] = b"USER tincan 0 * :tincan\r\n";

    fn connection(mock: Mock) -> Connection<Mock> {
        Connection::from_stream(mock, "mock")
    }

    fn bot_with_quit() -> Bot {
        let bot = Bot::new(ServerConfig::default());
        bot.register_command("!quit", "Quit.", false, |bot, inv| {
            bot.stop(inv.args.clone());
            Ok(())
        })
        .unwrap();
        bot
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let bot = bot_with_quit();
        let mock = Builder::new()
            .write(NICK)
            .write(USER)
            .read(b":irc.example.org 001 tincan :Welcome\r\nPING :irc.example.org\r\n")
            .write(b"PONG tincan\r\n")
            .read(b":alice!a@example.org PRIVMSG #chan :tincan: !quit So long\r\n")
            .write(b"QUIT :So long\r\n")
            .build();

        bot.run_on(connection(mock)).await.unwrap();
        assert_eq!(bot.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_fragmented_reads() {
        let bot = bot_with_quit();
        let mock = Builder::new()
            .write(NICK)
            .write(USER)
            .read(b":alice!a@example.org PRIV")
            .read(b"MSG #chan :tincan: !qu")
            .read(b"it\r\n")
            .write(b"QUIT\r\n")
            .build();

        bot.run_on(connection(mock)).await.unwrap();
    }

    #[tokio::test]
    async fn test_server_error_ends_session() {
        let bot = bot_with_quit();
        let mock = Builder::new()
            .write(NICK)
            .write(USER)
            .read(b"ERROR :Closing Link: tincan (Killed)\r\n")
            .build();

        let err = bot.run_on(connection(mock)).await.unwrap_err();
        assert!(matches!(err, RuntimeError::ServerError(reason) if reason == "Closing Link: tincan (Killed)"));
        assert_eq!(bot.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_peer_close_is_transport_error() {
        let bot = bot_with_quit();
        let mock = Builder::new().write(NICK).write(USER).build();

        let err = bot.run_on(connection(mock)).await.unwrap_err();
        assert!(matches!(err, RuntimeError::Transport(TransportError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_handler_failure_keeps_loop_running() {
        let bot = bot_with_quit();
        bot.register_command("!boom", "Fails.", false, |_, _| anyhow::bail!("boom"))
            .unwrap();
        let mock = Builder::new()
            .write(NICK)
            .write(USER)
            .read(b":alice!a@example.org PRIVMSG #chan :tincan: !boom\r\n")
            .write(b"PRIVMSG #chan :alice: error: boom\r\n")
            .read(b":alice!a@example.org PRIVMSG #chan :tincan: !quit\r\n")
            .write(b"QUIT\r\n")
            .build();

        bot.run_on(connection(mock)).await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_flushes_queue_before_quit() {
        let bot = Bot::new(ServerConfig::default());
        let outbound = bot.outbound();
        std::thread::spawn(move || outbound.privmsg("#chan", "from another thread"))
            .join()
            .unwrap()
            .unwrap();
        bot.stop("maintenance");

        let mock = Builder::new()
            .write(NICK)
            .write(USER)
            .write(b"PRIVMSG #chan :from another thread\r\n")
            .write(b"QUIT :maintenance\r\n")
            .build();

        bot.run_on(connection(mock)).await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_waits_for_batch() {
        let bot = bot_with_quit();
        bot.register_command("!say", "Say.", false, |bot, inv| {
            bot.send_privmsg(&inv.channel, &inv.args)?;
            Ok(())
        })
        .unwrap();
        let mock = Builder::new()
            .write(NICK)
            .write(USER)
            .read(
                b":a!b@c PRIVMSG #chan :tincan: !quit\r\n:a!b@c PRIVMSG #chan :tincan: !say after\r\n",
            )
            .write(b"PRIVMSG #chan :after\r\n")
            .write(b"QUIT\r\n")
            .build();

        bot.run_on(connection(mock)).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_registration_timeout() {
        let bot = Bot::new(ServerConfig {
            registration_timeout_secs: Some(5),
            ..Default::default()
        });
        let mock = Builder::new()
            .write(NICK)
            .write(USER)
            .wait(Duration::from_secs(60))
            .build();

        let err = bot.run_on(connection(mock)).await.unwrap_err();
        assert!(matches!(err, RuntimeError::RegistrationTimeout(t) if t == Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn test_run_once() {
        let bot = Bot::new(ServerConfig::default());
        bot.stop("");
        let mock = Builder::new().write(NICK).write(USER).write(b"QUIT\r\n").build();
        bot.run_on(connection(mock)).await.unwrap();

        let err = bot.run_on(connection(Builder::new().build())).await.unwrap_err();
        assert!(matches!(err, RuntimeError::AlreadyStarted));
    }

    static UNLOADS: AtomicUsize = AtomicUsize::new(0);

    struct Counted;

    impl Plugin<Bot> for Counted {
        fn unload(self: Box<Self>, _bot: &Bot) -> anyhow::Result<()> {
            UNLOADS.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn load_counted(_bot: &Bot, _ctx: &PluginLoadContext) -> anyhow::Result<Box<dyn Plugin<Bot>>> {
        Ok(Box::new(Counted))
    }

    static COUNTED: PluginDescriptor<Bot> =
        PluginDescriptor::new("counted", "Counts unloads.", load_counted);

    #[tokio::test]
    async fn test_connect_failure_unloads_plugins() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let bot = Bot::new(ServerConfig {
            host: "127.0.0.1".to_string(),
            port,
            ..Default::default()
        });
        bot.add_catalog(PluginCatalog::new("test").with(COUNTED));
        bot.load_plugin("counted", serde_json::json!({})).unwrap();

        let before = UNLOADS.load(Ordering::SeqCst);
        let err = bot.run().await.unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Transport(TransportError::ConnectionFailed { .. })
        ));
        assert_eq!(UNLOADS.load(Ordering::SeqCst), before + 1);
        assert!(bot.loaded_plugins().is_empty());
        assert_eq!(bot.state(), ConnectionState::Disconnected);
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_builder_loads_configured_plugins() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("tincan.toml"),
            "[server]\nnick = \"canbot\"\n\n[[plugins]]\nname = \"counted\"\n",
        )
        .unwrap();

        let bot = Bot::builder()
            .search_path(dir.path())
            .without_env()
            .without_logging()
            .catalog(PluginCatalog::new("test").with(COUNTED))
            .build()
            .unwrap();

        assert_eq!(bot.nick(), "canbot");
        assert_eq!(bot.loaded_plugins(), ["counted"]);
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let err = Bot::builder()
            .search_path(dir.path())
            .without_env()
            .without_logging()
            .merge(TincanConfig {
                plugins: vec![PluginEntry::new("x"), PluginEntry::new("x")],
                ..Default::default()
            })
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Config(ConfigError::DuplicatePlugin(name)) if name == "x"
        ));
    }

    #[test]
    fn test_builder_unknown_plugin() {
        let dir = tempfile::tempdir().unwrap();
        let err = Bot::builder()
            .search_path(dir.path())
            .without_env()
            .without_logging()
            .merge(TincanConfig {
                plugins: vec![PluginEntry::new("missing")],
                ..Default::default()
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, RuntimeError::PluginNotFound(name) if name == "missing"));
    }
}
