//! Framework layer - message dispatch.
//!
//! This module contains the observer registry that every incoming message
//! flows through. Command routing is layered on top of it in
//! `tincan-framework`.

pub mod event_bus;

pub use event_bus::{EventBus, EventHook, ObserverFn, ObserverId};
