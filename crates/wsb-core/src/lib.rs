//! WSB Core - Fundamental types shared by every WSB crate
//!
//! This crate defines:
//! - Identifiers (GroupId, ObjectId, SubscriptionId, ListenerToken)
//! - The state group data model and project descriptor
//! - Typed remote notifications
//! - The remote client capability consumed by the engine
//! - Error kinds

pub mod id;
pub mod model;
pub mod event;
pub mod remote;
pub mod error;

pub use id::*;
pub use model::*;
pub use event::*;
pub use remote::*;
pub use error::*;
