//! WSB Runtime - Session orchestration on top of the state engine
//!
//! This crate wires the pieces together:
//! - `ConnectionLifecycle`: connect, snapshot, subscribe, refresh, disconnect
//! - `SubscriptionRouter`: remote topics to mirror and journal mutators
//! - `SessionListener` observers and their registry
//! - `StateBrowserView`: headless state browser presentation model
//! - Session configuration, user settings and tracing initialisation

pub mod config;
pub mod lifecycle;
pub mod listener;
pub mod logging;
pub mod router;
pub mod view;

pub use config::*;
pub use lifecycle::*;
pub use listener::*;
pub use logging::*;
pub use router::*;
pub use view::*;
