//! The command router.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{Level, debug, span, warn};

use tincan_core::{BoxError, Message};

use super::invocation::{CommandContext, CommandInvocation};
use crate::error::{CommandError, CommandResult};

/// Command handler. Errors are reported to the channel as `<nick>: error: <message>`.
pub type CommandHandler<C> = Arc<dyn Fn(&C, &CommandInvocation) -> anyhow::Result<()> + Send + Sync>;

/// Pre-dispatch hook. Runs after the authorization check; `false` drops the command.
pub type CommandHook<C> = Arc<dyn Fn(&C, &CommandInvocation) -> bool + Send + Sync>;

/// What [`CommandRouter::route`] did with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Not a command: a direct message, not addressed to the bot, or too few params.
    Ignored,
    /// Addressed to the bot but naming no registered command.
    Unknown,
    /// The sender lacked authorization; a refusal was sent.
    Unauthorized,
    /// A command hook dropped the invocation.
    Rejected,
    /// The handler ran to completion.
    Handled,
    /// The handler failed or panicked; the error was reported.
    Failed(String),
}

struct CommandEntry<C> {
    handler: CommandHandler<C>,
    description: String,
    requires_authorization: bool,
}

/// Registry of commands and the routing logic that invokes them.
///
/// Locks are released before handlers and hooks run, so handlers may register
/// or unregister commands.
pub struct CommandRouter<C> {
    commands: RwLock<BTreeMap<String, CommandEntry<C>>>,
    hooks: RwLock<Vec<CommandHook<C>>>,
}

impl<C> Default for CommandRouter<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> CommandRouter<C> {
    /// Creates an empty router.
    pub fn new() -> Self {
        Self {
            commands: RwLock::new(BTreeMap::new()),
            hooks: RwLock::new(Vec::new()),
        }
    }

    /// Registers a command.
    ///
    /// # Errors
    ///
    /// [`CommandError::AlreadyRegistered`] if `name` is taken.
    pub fn register<F>(
        &self,
        name: &str,
        description: &str,
        requires_authorization: bool,
        handler: F,
    ) -> CommandResult<()>
    where
        F: Fn(&C, &CommandInvocation) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let mut commands = self.commands.write();
        if commands.contains_key(name) {
            return Err(CommandError::AlreadyRegistered(name.to_string()));
        }
        commands.insert(
            name.to_string(),
            CommandEntry {
                handler: Arc::new(handler),
                description: description.to_string(),
                requires_authorization,
            },
        );
        debug!(command = %name, requires_authorization, "Command registered");
        Ok(())
    }

    /// Removes a command. The name may be registered again afterwards.
    ///
    /// # Errors
    ///
    /// [`CommandError::NotRegistered`] if `name` is unknown.
    pub fn unregister(&self, name: &str) -> CommandResult<()> {
        if self.commands.write().remove(name).is_none() {
            return Err(CommandError::NotRegistered(name.to_string()));
        }
        debug!(command = %name, "Command unregistered");
        Ok(())
    }

    /// Returns true if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.commands.read().contains_key(name)
    }

    /// Returns every command's description, sorted by name.
    pub fn descriptions(&self) -> BTreeMap<String, String> {
        self.commands
            .read()
            .iter()
            .map(|(name, entry)| (name.clone(), entry.description.clone()))
            .collect()
    }

    /// Appends a pre-dispatch hook. Hooks run in the order they were added.
    pub fn add_hook<F>(&self, hook: F)
    where
        F: Fn(&C, &CommandInvocation) -> bool + Send + Sync + 'static,
    {
        self.hooks.write().push(Arc::new(hook));
    }

    /// Returns the number of registered commands.
    pub fn command_count(&self) -> usize {
        self.commands.read().len()
    }
}

impl<C: CommandContext> CommandRouter<C> {
    /// Routes one `PRIVMSG`.
    ///
    /// # Errors
    ///
    /// Only when a refusal or error report cannot be sent. Handler failures are
    /// reported to the channel and returned as [`RouteOutcome::Failed`].
    pub fn route(&self, ctx: &C, message: &Message) -> Result<RouteOutcome, BoxError> {
        let Some(invocation) = parse_invocation(&ctx.nick(), message) else {
            return Ok(RouteOutcome::Ignored);
        };

        let span = span!(
            Level::DEBUG,
            "command",
            command = %invocation.command,
            nick = %invocation.nick,
            channel = %invocation.channel
        );
        let _enter = span.enter();

        let Some((handler, requires_authorization)) = self
            .commands
            .read()
            .get(&invocation.command)
            .map(|entry| (Arc::clone(&entry.handler), entry.requires_authorization))
        else {
            debug!("Ignoring unknown command");
            return Ok(RouteOutcome::Unknown);
        };

        if requires_authorization && !ctx.is_authorized(&invocation.principal()) {
            warn!(host = %invocation.host, "Unauthorized command attempt");
            let refusal = invocation.address(format_args!(
                "only admins are allowed to {}",
                invocation.command
            ));
            ctx.reply(&invocation.channel, &refusal)?;
            return Ok(RouteOutcome::Unauthorized);
        }

        let hooks: Vec<CommandHook<C>> = self.hooks.read().clone();
        if !hooks.iter().all(|hook| hook(ctx, &invocation)) {
            debug!("Command dropped by hook");
            return Ok(RouteOutcome::Rejected);
        }

        debug!(args = %invocation.args, "Invoking command handler");
        let error = match catch_unwind(AssertUnwindSafe(|| handler(ctx, &invocation))) {
            Ok(Ok(())) => return Ok(RouteOutcome::Handled),
            Ok(Err(e)) => format!("{e:#}"),
            Err(payload) => panic_message(payload.as_ref()),
        };

        warn!(error = %error, "Command handler failed");
        let report = invocation.address(format_args!("error: {}", single_line(&error)));
        ctx.reply(&invocation.channel, &report)?;
        Ok(RouteOutcome::Failed(error))
    }
}

impl<C> fmt::Debug for CommandRouter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRouter")
            .field("commands", &self.commands.read().keys().collect::<Vec<_>>())
            .field("hook_count", &self.hooks.read().len())
            .finish()
    }
}

/// Extracts an invocation from a `PRIVMSG <target> :<nick>: <command> <args>`.
fn parse_invocation(bot_nick: &str, message: &Message) -> Option<CommandInvocation> {
    let (channel, text) = match message.params() {
        [channel, text, ..] => (channel, text),
        _ => return None,
    };

    if channel == bot_nick {
        debug!(channel = %channel, "Ignoring direct message");
        return None;
    }

    let rest = text.trim_start().strip_prefix(bot_nick)?.strip_prefix(':')?;
    let rest = rest.trim_start();
    let (command, args) = rest.split_once(' ').unwrap_or((rest, ""));

    let sender = message.sender();
    Some(CommandInvocation {
        nick: sender.nick,
        host: sender.host,
        channel: channel.clone(),
        command: command.to_string(),
        args: args.to_string(),
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use anyhow::bail;
    use parking_lot::Mutex;
    use tincan_core::Principal;

    struct TestBot {
        nick: String,
        admins: HashSet<Principal>,
        replies: Mutex<Vec<(String, String)>>,
        seen: Mutex<Vec<CommandInvocation>>,
    }

    impl TestBot {
        fn new() -> Self {
            Self {
                nick: "tincan".to_string(),
                admins: HashSet::from([Principal::new("root", "root@example.org")]),
                replies: Mutex::new(Vec::new()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn replies(&self) -> Vec<(String, String)> {
            std::mem::take(&mut *self.replies.lock())
        }
    }

    impl CommandContext for TestBot {
        fn nick(&self) -> String {
            self.nick.clone()
        }

        fn is_authorized(&self, principal: &Principal) -> bool {
            self.admins.contains(principal)
        }

        fn reply(&self, channel: &str, text: &str) -> Result<(), BoxError> {
            self.replies
                .lock()
                .push((channel.to_string(), text.to_string()));
            Ok(())
        }
    }

    fn privmsg(origin: &str, target: &str, text: &str) -> Message {
        Message::new("PRIVMSG")
            .with_origin(origin)
            .with_param(target)
            .with_param(text)
    }

    fn recording_router() -> CommandRouter<TestBot> {
        let router = CommandRouter::new();
        router
            .register("!help", "Show help.", false, |bot: &TestBot, inv: &CommandInvocation| {
                bot.seen.lock().push(inv.clone());
                Ok(())
            })
            .unwrap();
        router
            .register("!admin_add", "Add an admin.", true, |bot: &TestBot, inv: &CommandInvocation| {
                bot.seen.lock().push(inv.clone());
                Ok(())
            })
            .unwrap();
        router
    }

    #[test]
    fn test_addressed_command_invokes_handler() {
        let bot = TestBot::new();
        let router = recording_router();

        let outcome = router
            .route(&bot, &privmsg("nick!user@host", "#chan", "tincan: !help"))
            .unwrap();

        assert_eq!(outcome, RouteOutcome::Handled);
        assert_eq!(
            *bot.seen.lock(),
            [CommandInvocation {
                nick: "nick".to_string(),
                host: "user@host".to_string(),
                channel: "#chan".to_string(),
                command: "!help".to_string(),
                args: String::new(),
            }]
        );
        assert!(bot.replies().is_empty());
    }

    #[test]
    fn test_whitespace_and_args() {
        let bot = TestBot::new();
        let router = recording_router();

        router
            .route(&bot, &privmsg("nick!user@host", "#chan", "  tincan:   !help  topic_log x"))
            .unwrap();

        let seen = bot.seen.lock();
        assert_eq!(seen[0].command, "!help");
        assert_eq!(seen[0].args, " topic_log x");
    }

    #[test]
    fn test_unaddressed_and_direct_messages_are_ignored() {
        let bot = TestBot::new();
        let router = recording_router();

        for message in [
            privmsg("nick!user@host", "#chan", "!help"),
            privmsg("nick!user@host", "#chan", "tincanbot: !help"),
            privmsg("nick!user@host", "#chan", "hello tincan: !help"),
            privmsg("nick!user@host", "tincan", "tincan: !help"),
            Message::new("PRIVMSG").with_origin("nick!user@host").with_param("#chan"),
        ] {
            assert_eq!(router.route(&bot, &message).unwrap(), RouteOutcome::Ignored);
        }
        assert!(bot.seen.lock().is_empty());
        assert!(bot.replies().is_empty());
    }

    #[test]
    fn test_unknown_command_is_ignored() {
        let bot = TestBot::new();
        let router = recording_router();

        let outcome = router
            .route(&bot, &privmsg("nick!user@host", "#chan", "tincan: !nope"))
            .unwrap();
        assert_eq!(outcome, RouteOutcome::Unknown);
        assert!(bot.replies().is_empty());
    }

    #[test]
    fn test_unauthorized_command_is_refused() {
        let bot = TestBot::new();
        let router = recording_router();

        let outcome = router
            .route(&bot, &privmsg("nick!user@host", "#chan", "tincan: !admin_add x!y@z"))
            .unwrap();

        assert_eq!(outcome, RouteOutcome::Unauthorized);
        assert!(bot.seen.lock().is_empty());
        assert_eq!(
            bot.replies(),
            [(
                "#chan".to_string(),
                "nick: only admins are allowed to !admin_add".to_string()
            )]
        );
    }

    #[test]
    fn test_authorized_command_runs() {
        let bot = TestBot::new();
        let router = recording_router();

        let outcome = router
            .route(&bot, &privmsg("root!root@example.org", "#chan", "tincan: !admin_add x!y@z"))
            .unwrap();
        assert_eq!(outcome, RouteOutcome::Handled);
        assert_eq!(bot.seen.lock()[0].args, "x!y@z");
    }

    #[test]
    fn test_handler_error_is_reported_and_routing_continues() {
        let bot = TestBot::new();
        let router = recording_router();
        router
            .register("!fail", "Always fails.", false, |_: &TestBot, _: &CommandInvocation| {
                bail!("boom")
            })
            .unwrap();

        let outcome = router
            .route(&bot, &privmsg("nick!user@host", "#chan", "tincan: !fail"))
            .unwrap();
        assert_eq!(outcome, RouteOutcome::Failed("boom".to_string()));
        assert_eq!(
            bot.replies(),
            [("#chan".to_string(), "nick: error: boom".to_string())]
        );

        let outcome = router
            .route(&bot, &privmsg("nick!user@host", "#chan", "tincan: !help"))
            .unwrap();
        assert_eq!(outcome, RouteOutcome::Handled);
    }

    #[test]
    fn test_handler_panic_is_reported() {
        let bot = TestBot::new();
        let router = CommandRouter::new();
        router
            .register("!panic", "Panics.", false, |_: &TestBot, _: &CommandInvocation| {
                panic!("kaboom")
            })
            .unwrap();

        let outcome = router
            .route(&bot, &privmsg("nick!user@host", "#chan", "tincan: !panic"))
            .unwrap();
        assert_eq!(outcome, RouteOutcome::Failed("kaboom".to_string()));
        assert_eq!(
            bot.replies(),
            [("#chan".to_string(), "nick: error: kaboom".to_string())]
        );
    }

    #[test]
    fn test_multiline_error_is_flattened() {
        let bot = TestBot::new();
        let router = CommandRouter::new();
        router
            .register("!fail", "Fails.", false, |_: &TestBot, _: &CommandInvocation| {
                bail!("first\nsecond")
            })
            .unwrap();

        router
            .route(&bot, &privmsg("nick!user@host", "#chan", "tincan: !fail"))
            .unwrap();
        assert_eq!(bot.replies()[0].1, "nick: error: first second");
    }

    #[test]
    fn test_registration_errors() {
        let router = recording_router();

        assert_eq!(
            router.register("!help", "", false, |_: &TestBot, _: &CommandInvocation| Ok(())),
            Err(CommandError::AlreadyRegistered("!help".to_string()))
        );
        assert_eq!(
            router.unregister("!nope"),
            Err(CommandError::NotRegistered("!nope".to_string()))
        );

        router.unregister("!help").unwrap();
        assert!(!router.contains("!help"));
        router
            .register("!help", "Again.", false, |_: &TestBot, _: &CommandInvocation| Ok(()))
            .unwrap();
        assert_eq!(router.descriptions()["!help"], "Again.");
    }

    #[test]
    fn test_descriptions_are_sorted() {
        let router = CommandRouter::<TestBot>::new();
        for name in ["!quit", "!admin_list", "!help"] {
            router
                .register(name, &format!("{name} help"), false, |_: &TestBot, _: &CommandInvocation| {
                    Ok(())
                })
                .unwrap();
        }

        let names: Vec<_> = router.descriptions().into_keys().collect();
        assert_eq!(names, ["!admin_list", "!help", "!quit"]);
    }

    #[test]
    fn test_hooks_run_after_authorization() {
        let bot = TestBot::new();
        let router = recording_router();
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        router.add_hook(move |_: &TestBot, inv: &CommandInvocation| {
            *counter.lock() += 1;
            inv.nick != "blocked"
        });

        let outcome = router
            .route(&bot, &privmsg("blocked!user@host", "#chan", "tincan: !help"))
            .unwrap();
        assert_eq!(outcome, RouteOutcome::Rejected);

        let outcome = router
            .route(&bot, &privmsg("nick!user@host", "#chan", "tincan: !admin_add a!b@c"))
            .unwrap();
        assert_eq!(outcome, RouteOutcome::Unauthorized);

        assert_eq!(*calls.lock(), 1);
        assert!(bot.seen.lock().is_empty());
    }

    struct RouterBot {
        inner: TestBot,
        router: Arc<CommandRouter<RouterBot>>,
    }

    impl CommandContext for RouterBot {
        fn nick(&self) -> String {
            self.inner.nick()
        }

        fn is_authorized(&self, principal: &Principal) -> bool {
            self.inner.is_authorized(principal)
        }

        fn reply(&self, channel: &str, text: &str) -> Result<(), BoxError> {
            self.inner.reply(channel, text)
        }
    }

    #[test]
    fn test_handler_can_modify_router() {
        let bot = RouterBot {
            inner: TestBot::new(),
            router: Arc::new(CommandRouter::new()),
        };
        bot.router
            .register("!once", "Runs once.", false, |bot: &RouterBot, inv: &CommandInvocation| {
                bot.router.unregister(&inv.command)?;
                Ok(())
            })
            .unwrap();

        let message = privmsg("nick!user@host", "#chan", "tincan: !once");
        assert_eq!(bot.router.route(&bot, &message).unwrap(), RouteOutcome::Handled);
        assert_eq!(bot.router.route(&bot, &message).unwrap(), RouteOutcome::Unknown);
    }
}
