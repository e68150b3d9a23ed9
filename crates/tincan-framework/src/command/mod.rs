//! Command routing.
//!
//! A command is a chat message addressed to the bot by nick:
//!
//! ```text
//! :alice!alice@example.org PRIVMSG #chan :tincan: !help topic_log
//!                                         └nick─┘ └cmd┘ └─args──┘
//! ```
//!
//! The [`CommandRouter`] recognises such messages, checks the sender against
//! the host's authorization policy, and invokes the registered handler. A
//! handler that fails or panics is reported back to the channel; the error
//! never reaches the event loop.
//!
//! ```rust,ignore
//! router.register("!echo", "Repeat the arguments.", false, |ctx, inv| {
//!     ctx.reply(&inv.channel, &format!("{}: {}", inv.nick, inv.args))?;
//!     Ok(())
//! })?;
//! ```

pub mod invocation;
pub mod router;

pub use invocation::{CommandContext, CommandInvocation};
pub use router::{CommandHandler, CommandHook, CommandRouter, RouteOutcome};
