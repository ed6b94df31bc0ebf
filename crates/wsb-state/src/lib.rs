//! WSB State Engine - Local mirror of remote state groups
//!
//! This crate implements the reconciliation engine:
//! - State mirror and snapshot builder
//! - Change journal (renames, current-state transitions)
//! - Pending edit set
//! - Staging and commit policy

pub mod mirror;
pub mod journal;
pub mod pending;
pub mod reconcile;

pub use mirror::*;
pub use journal::*;
pub use pending::*;
pub use reconcile::*;
