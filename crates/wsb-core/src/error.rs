//! Error types for WSB

use thiserror::Error;

use crate::GroupId;

/// Core WSB errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WsbError {
    // Connection errors
    #[error("Remote application unavailable: {0}")]
    ConnectionUnavailable(String),

    #[error("Not connected")]
    NotConnected,

    // Snapshot errors
    #[error("Snapshot build failed: {0}")]
    SnapshotBuildFailed(String),

    // Reference errors
    #[error("Unknown state group: {0}")]
    UnknownGroupReference(GroupId),

    #[error("Unknown state {state:?} in group {group}")]
    UnknownStateReference { group: GroupId, state: String },

    // Commit errors
    #[error("Set state failed for group {group}: {reason}")]
    SetStateFailed { group: GroupId, reason: String },

    // Boundary errors
    #[error("Remote call {uri} failed: {reason}")]
    RemoteCall { uri: String, reason: String },

    #[error("Unexpected payload: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl WsbError {
    /// Errors caused by a notification racing the mirror; logged and ignored
    pub fn is_stale_reference(&self) -> bool {
        matches!(
            self,
            WsbError::UnknownGroupReference(_) | WsbError::UnknownStateReference { .. }
        )
    }
}

/// Result type for WSB operations
pub type WsbResult<T> = Result<T, WsbError>;
