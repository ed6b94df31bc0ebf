//! WSB Remote - WAAPI binding for the `RemoteClient` capability
//!
//! The transport itself (WAMP over websocket) is supplied by the host through
//! `JsonRpc`. This crate builds the WAAPI requests, decodes responses and
//! push payloads into typed values, and serializes notification delivery.

pub mod uri;
pub mod rpc;
pub mod payload;
pub mod client;
pub mod executor;

pub use rpc::*;
pub use payload::*;
pub use client::*;
pub use executor::*;
