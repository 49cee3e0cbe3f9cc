//! Engine event bus.
//!
//! Window notifications enter the bus as [`Event`]s; subscribers react and may
//! emit follow-up events (the graphics system turns `WindowClose` into
//! `QuitRequested` unless the application overrides it).

mod bus;

pub use bus::{Event, EventBus, EventKind, Outbox};
