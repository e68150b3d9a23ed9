//! Observer registry and message dispatch.
//!
//! The [`EventBus`] keeps an ordered list of observers, each bound to an
//! optional origin pattern and an optional command pattern. `None` matches
//! anything, so a message is delivered to every observer registered under one
//! of the four keys:
//!
//! ```text
//! (*, *)   (origin, *)   (*, command)   (origin, command)
//! ```
//!
//! Matching observers always run in registration order, regardless of which
//! key selected them.
//!
//! ```rust,ignore
//! let bus = EventBus::<MyContext>::new();
//!
//! bus.register(None, Some("PING"), |ctx, msg| {
//!     ctx.pong(msg.trailing().unwrap_or_default())?;
//!     Ok(())
//! });
//!
//! bus.dispatch(&ctx, &message)?;
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::{Level, span, trace};

use crate::error::{BoxError, RegistryError, RegistryResult};
use crate::foundation::Message;

/// Observer callback. Receives the dispatch context and the message.
pub type ObserverFn<C> = Arc<dyn Fn(&C, &Message) -> Result<(), BoxError> + Send + Sync>;

/// Pre-dispatch hook. Returning `false` drops the message before any observer runs.
pub type EventHook<C> = Arc<dyn Fn(&C, &Message) -> bool + Send + Sync>;

/// Identifier of a registered observer, assigned in strictly increasing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl ObserverId {
    /// Returns the raw insertion index.
    pub fn index(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct ObserverEntry<C> {
    id: ObserverId,
    origin: Option<String>,
    command: Option<String>,
    callback: ObserverFn<C>,
}

impl<C> ObserverEntry<C> {
    fn matches(&self, message: &Message) -> bool {
        let origin_ok = match &self.origin {
            Some(pattern) => message.origin() == Some(pattern.as_str()),
            None => true,
        };
        let command_ok = match &self.command {
            Some(pattern) => message.command() == pattern,
            None => true,
        };
        origin_ok && command_ok
    }
}

/// Ordered observer registry.
///
/// All methods take `&self`; the tables are behind locks that are released
/// before any callback runs, so observers may register or unregister other
/// observers while a message is being dispatched. Such changes apply from the
/// next message on.
pub struct EventBus<C> {
    observers: RwLock<Vec<ObserverEntry<C>>>,
    hooks: RwLock<Vec<EventHook<C>>>,
    next_id: AtomicU64,
}

impl<C> Default for EventBus<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> EventBus<C> {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(Vec::new()),
            hooks: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Registers an observer for messages matching `origin` and `command`.
    ///
    /// `None` acts as a wildcard for that field. Patterns are compared
    /// exactly, without case folding.
    pub fn register<F>(&self, origin: Option<&str>, command: Option<&str>, callback: F) -> ObserverId
    where
        F: Fn(&C, &Message) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let mut observers = self.observers.write();
        // Allocated under the write lock so the list stays sorted by id.
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        observers.push(ObserverEntry {
            id,
            origin: origin.map(str::to_string),
            command: command.map(str::to_string),
            callback: Arc::new(callback),
        });
        trace!(observer = %id, ?origin, ?command, "Observer registered");
        id
    }

    /// Removes an observer.
    ///
    /// # Errors
    ///
    /// [`RegistryError::ObserverNotRegistered`] if `id` is unknown or was
    /// already removed.
    pub fn unregister(&self, id: ObserverId) -> RegistryResult<()> {
        let mut observers = self.observers.write();
        let index = observers
            .binary_search_by_key(&id, |entry| entry.id)
            .map_err(|_| RegistryError::ObserverNotRegistered(id))?;
        observers.remove(index);
        trace!(observer = %id, "Observer unregistered");
        Ok(())
    }

    /// Appends a pre-dispatch hook. Hooks run in the order they were added.
    pub fn add_hook<F>(&self, hook: F)
    where
        F: Fn(&C, &Message) -> bool + Send + Sync + 'static,
    {
        self.hooks.write().push(Arc::new(hook));
    }

    /// Returns the number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }

    /// Delivers `message` to every matching observer.
    ///
    /// Returns the number of observers invoked; zero when a hook dropped the
    /// message.
    ///
    /// # Errors
    ///
    /// The first error returned by an observer. Observers after the failing
    /// one are not invoked.
    pub fn dispatch(&self, ctx: &C, message: &Message) -> Result<usize, BoxError> {
        let span = span!(Level::TRACE, "dispatch", command = %message.command());
        let _enter = span.enter();

        let hooks: Vec<EventHook<C>> = self.hooks.read().clone();
        if !hooks.iter().all(|hook| hook(ctx, message)) {
            trace!("Message dropped by event hook");
            return Ok(0);
        }

        let matched: Vec<(ObserverId, ObserverFn<C>)> = self
            .observers
            .read()
            .iter()
            .filter(|entry| entry.matches(message))
            .map(|entry| (entry.id, Arc::clone(&entry.callback)))
            .collect();

        for (id, callback) in &matched {
            trace!(observer = %id, "Invoking observer");
            callback(ctx, message)?;
        }

        Ok(matched.len())
    }
}

impl<C> fmt::Debug for EventBus<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("observer_count", &self.observers.read().len())
            .field("hook_count", &self.hooks.read().len())
            .finish()
    }
}
