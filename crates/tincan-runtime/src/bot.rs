//! The bot: registration APIs, built-in observers and plugin management.
//!
//! [`Bot`] is a cheap, cloneable handle. Every observer, command handler and
//! plugin receives `&Bot` and drives the connection only through the methods
//! below; the event loop itself lives in [`crate::runtime`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tincan_core::{BoxError, ConnectionState, EventBus, Message, ObserverId, Principal};
use tincan_framework::{
    CommandContext, CommandInvocation, CommandRouter, Plugin, PluginCatalog, PluginLoadContext,
};
use tincan_transport::{Outbound, OutboundReceiver};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::config::{PluginEntry, ServerConfig};
use crate::error::{RuntimeError, RuntimeResult};

struct LoadedPlugin {
    name: String,
    instance: Box<dyn Plugin<Bot>>,
}

pub(crate) struct BotInner {
    pub(crate) server: ServerConfig,
    nick: RwLock<String>,
    admins: RwLock<BTreeSet<Principal>>,
    state: RwLock<ConnectionState>,
    events: EventBus<Bot>,
    commands: CommandRouter<Bot>,
    outbound: Outbound,
    outbound_rx: Mutex<Option<OutboundReceiver>>,
    stop_reason: Mutex<Option<String>>,
    pub(crate) stop_notify: Notify,
    catalogs: RwLock<Vec<PluginCatalog<Bot>>>,
    plugins: Mutex<Vec<LoadedPlugin>>,
}

/// Handle to one bot and its single server connection.
#[derive(Clone)]
pub struct Bot {
    pub(crate) inner: Arc<BotInner>,
}

impl Bot {
    /// Creates a bot for `server` and registers the built-in observers.
    pub fn new(server: ServerConfig) -> Self {
        let (outbound, outbound_rx) = Outbound::channel();
        let bot = Self {
            inner: Arc::new(BotInner {
                nick: RwLock::new(server.nick.clone()),
                server,
                admins: RwLock::new(BTreeSet::new()),
                state: RwLock::new(ConnectionState::Disconnected),
                events: EventBus::new(),
                commands: CommandRouter::new(),
                outbound,
                outbound_rx: Mutex::new(Some(outbound_rx)),
                stop_reason: Mutex::new(None),
                stop_notify: Notify::new(),
                catalogs: RwLock::new(Vec::new()),
                plugins: Mutex::new(Vec::new()),
            }),
        };
        bot.register_builtin_observers();
        bot
    }

    fn register_builtin_observers(&self) {
        self.register_observer(None, Some("ERROR"), |_, message| {
            let reason = message.trailing().unwrap_or_default().to_string();
            Err(RuntimeError::ServerError(reason).into())
        });

        self.register_observer(None, Some("PING"), |bot, _| {
            bot.inner.outbound.pong(&bot.nick())?;
            Ok(())
        });

        self.register_observer(None, Some("001"), |bot, message| {
            if let Some(nick) = message.param(0) {
                *bot.inner.nick.write() = nick.to_string();
            }
            if bot.state() == ConnectionState::Registering {
                bot.set_state(ConnectionState::Ready);
            }
            info!(nick = %bot.nick(), "Registered with server");
            Ok(())
        });

        self.register_observer(None, Some("PRIVMSG"), |bot, message| {
            bot.inner.commands.route(bot, message)?;
            Ok(())
        });
    }

    // -------------------------------------------------------------------------
    // Observers
    // -------------------------------------------------------------------------

    /// Registers an observer; `None` patterns are wildcards.
    ///
    /// An error returned by `callback` ends the event loop.
    pub fn register_observer<F>(
        &self,
        origin: Option<&str>,
        command: Option<&str>,
        callback: F,
    ) -> ObserverId
    where
        F: Fn(&Bot, &Message) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.inner.events.register(origin, command, callback)
    }

    pub fn unregister_observer(&self, id: ObserverId) -> RuntimeResult<()> {
        Ok(self.inner.events.unregister(id)?)
    }

    /// Appends a hook that runs before observers; returning `false` drops the
    /// message.
    pub fn add_event_hook<F>(&self, hook: F)
    where
        F: Fn(&Bot, &Message) -> bool + Send + Sync + 'static,
    {
        self.inner.events.add_hook(hook);
    }

    /// Dispatches one message to hooks and observers, as the event loop does.
    ///
    /// Returns the number of observers invoked.
    pub fn dispatch(&self, message: &Message) -> RuntimeResult<usize> {
        self.inner
            .events
            .dispatch(self, message)
            .map_err(RuntimeError::from_observer)
    }

    // -------------------------------------------------------------------------
    // Commands
    // -------------------------------------------------------------------------

    /// Registers a command handler under `name` (e.g. `"!help"`).
    pub fn register_command<F>(
        &self,
        name: &str,
        description: &str,
        requires_authorization: bool,
        handler: F,
    ) -> RuntimeResult<()>
    where
        F: Fn(&Bot, &CommandInvocation) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Ok(self
            .inner
            .commands
            .register(name, description, requires_authorization, handler)?)
    }

    pub fn unregister_command(&self, name: &str) -> RuntimeResult<()> {
        Ok(self.inner.commands.unregister(name)?)
    }

    /// Appends a hook that runs after authorization and before the handler;
    /// returning `false` skips the handler.
    pub fn add_command_hook<F>(&self, hook: F)
    where
        F: Fn(&Bot, &CommandInvocation) -> bool + Send + Sync + 'static,
    {
        self.inner.commands.add_hook(hook);
    }

    /// Returns every command's description, sorted by name.
    pub fn command_descriptions(&self) -> BTreeMap<String, String> {
        self.inner.commands.descriptions()
    }

    // -------------------------------------------------------------------------
    // Outbound
    // -------------------------------------------------------------------------

    /// Queues one raw protocol line.
    pub fn send(&self, line: &str) -> RuntimeResult<()> {
        Ok(self.inner.outbound.send(line)?)
    }

    /// Queues a `PRIVMSG`, split into as many lines as needed.
    pub fn send_privmsg(&self, target: &str, text: &str) -> RuntimeResult<()> {
        Ok(self.inner.outbound.privmsg(target, text)?)
    }

    /// Returns a sender usable from any thread.
    pub fn outbound(&self) -> Outbound {
        self.inner.outbound.clone()
    }

    /// Requests a graceful stop with a `QUIT` reason (empty for none).
    ///
    /// The event loop finishes the batch it is processing first. Only the
    /// first request's reason is used.
    pub fn stop(&self, reason: impl Into<String>) {
        {
            let mut stop_reason = self.inner.stop_reason.lock();
            if stop_reason.is_some() {
                return;
            }
            *stop_reason = Some(reason.into());
        }
        if self.state().is_active() {
            self.set_state(ConnectionState::Stopping);
        }
        info!("Stop requested");
        self.inner.stop_notify.notify_one();
    }

    /// Returns true once [`stop`](Self::stop) has been called.
    pub fn is_stopping(&self) -> bool {
        self.inner.stop_reason.lock().is_some()
    }

    pub(crate) fn stop_reason(&self) -> Option<String> {
        self.inner.stop_reason.lock().clone()
    }

    /// Takes the receiving end of the outbound queue, for callers that drive
    /// their own connection. [`run`](Self::run) then fails with
    /// [`RuntimeError::AlreadyStarted`].
    pub fn take_receiver(&self) -> RuntimeResult<OutboundReceiver> {
        self.inner
            .outbound_rx
            .lock()
            .take()
            .ok_or(RuntimeError::AlreadyStarted)
    }

    // -------------------------------------------------------------------------
    // Identity and state
    // -------------------------------------------------------------------------

    /// Returns the current nick.
    pub fn nick(&self) -> String {
        self.inner.nick.read().clone()
    }

    pub fn server(&self) -> &ServerConfig {
        &self.inner.server
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.read()
    }

    pub(crate) fn set_state(&self, state: ConnectionState) {
        let old = std::mem::replace(&mut *self.inner.state.write(), state);
        if old != state {
            debug!(old_state = %old, new_state = %state, "Connection state changed");
        }
    }

    /// Returns a snapshot of the authorized principals, sorted.
    pub fn admins(&self) -> BTreeSet<Principal> {
        self.inner.admins.read().clone()
    }

    /// Authorizes `principal`. Returns false if it already was.
    pub fn add_admin(&self, principal: Principal) -> bool {
        let added = self.inner.admins.write().insert(principal.clone());
        if added {
            info!(admin = %principal, "Admin added");
        }
        added
    }

    /// Revokes `principal`. Returns false if it was not authorized.
    pub fn remove_admin(&self, principal: &Principal) -> bool {
        let removed = self.inner.admins.write().remove(principal);
        if removed {
            info!(admin = %principal, "Admin removed");
        }
        removed
    }

    // -------------------------------------------------------------------------
    // Plugins
    // -------------------------------------------------------------------------

    /// Appends a plugin search location. Earlier locations win.
    pub fn add_catalog(&self, catalog: PluginCatalog<Bot>) {
        debug!(location = %catalog.location(), plugins = catalog.len(), "Catalog added");
        self.inner.catalogs.write().push(catalog);
    }

    /// Loads plugin `name` from the first catalog that has it.
    ///
    /// Returns `Ok(false)` if the plugin is already loaded.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::PluginNotFound`] if no catalog provides it, or
    /// [`RuntimeError::PluginLoad`] if its `load` function fails.
    pub fn load_plugin(&self, name: &str, config: Value) -> RuntimeResult<bool> {
        if self.is_plugin_loaded(name) {
            debug!(plugin = name, "Plugin already loaded");
            return Ok(false);
        }

        let descriptor = self
            .inner
            .catalogs
            .read()
            .iter()
            .find_map(|catalog| catalog.find(name))
            .ok_or_else(|| RuntimeError::PluginNotFound(name.to_string()))?;

        // No lock is held here: `load` registers observers and commands and
        // may load other plugins.
        let ctx = PluginLoadContext::new(name, config);
        let instance =
            descriptor
                .instantiate(self, &ctx)
                .map_err(|e| RuntimeError::PluginLoad {
                    name: name.to_string(),
                    reason: format!("{e:#}"),
                })?;

        self.inner.plugins.lock().push(LoadedPlugin {
            name: name.to_string(),
            instance,
        });
        info!(plugin = name, "Plugin loaded");
        Ok(true)
    }

    /// Loads every configured plugin in order, stopping at the first failure.
    pub fn load_plugins(&self, entries: &[PluginEntry]) -> RuntimeResult<()> {
        for entry in entries {
            self.load_plugin(&entry.name, entry.config.clone())?;
        }
        Ok(())
    }

    pub fn is_plugin_loaded(&self, name: &str) -> bool {
        self.inner.plugins.lock().iter().any(|p| p.name == name)
    }

    /// Returns the names of loaded plugins in load order.
    pub fn loaded_plugins(&self) -> Vec<String> {
        self.inner
            .plugins
            .lock()
            .iter()
            .map(|p| p.name.clone())
            .collect()
    }

    /// Unloads every plugin in reverse load order. Failures are logged.
    pub(crate) fn unload_plugins(&self) {
        let plugins = std::mem::take(&mut *self.inner.plugins.lock());
        for plugin in plugins.into_iter().rev() {
            match plugin.instance.unload(self) {
                Ok(()) => info!(plugin = %plugin.name, "Plugin unloaded"),
                Err(e) => warn!(plugin = %plugin.name, error = %format!("{e:#}"), "Plugin unload failed"),
            }
        }
    }
}

impl CommandContext for Bot {
    fn nick(&self) -> String {
        Bot::nick(self)
    }

    fn is_authorized(&self, principal: &Principal) -> bool {
        self.inner.admins.read().contains(principal)
    }

    fn reply(&self, channel: &str, text: &str) -> Result<(), BoxError> {
        Ok(self.send_privmsg(channel, text)?)
    }
}

impl fmt::Debug for Bot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bot")
            .field("nick", &self.nick())
            .field("state", &self.state())
            .field("observers", &self.inner.events.observer_count())
            .field("commands", &self.inner.commands.command_count())
            .field("plugins", &self.loaded_plugins())
            .finish()
    }
}
