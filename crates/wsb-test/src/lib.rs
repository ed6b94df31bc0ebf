//! WSB Test Harness - an in-memory remote application
//!
//! This crate provides:
//! - `SimulatedRemote`, implementing both `Connector` and `RemoteClient`
//! - A call log for asserting which remote calls were issued
//! - Failure injection (unreachable remote, failing queries, rejected set-state)
//! - GUID generation for fixtures

pub mod guid;
pub mod remote;

pub use guid::*;
pub use remote::*;
