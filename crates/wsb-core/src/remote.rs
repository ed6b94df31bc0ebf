//! Remote client capability
//!
//! The engine never speaks to the remote application directly. It consumes
//! this capability: blocking request/response calls plus a subscription
//! mechanism that delivers notifications one at a time, in emit order, on a
//! context owned by the client.

use std::sync::Arc;

use crate::{
    GroupId, ObjectId, ProjectDescriptor, RemoteEvent, RemoteInfo, SubscriptionId, Topic,
    WsbResult,
};

/// Callback invoked for every notification on a subscribed topic
pub type NotificationSink = Arc<dyn Fn(RemoteEvent) + Send + Sync>;

/// Entity fields returned by list queries
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObjectRecord {
    pub id: ObjectId,
    pub name: String,
    pub path: String,
    pub parent: Option<ObjectId>,
}

/// An open session with the remote application
pub trait RemoteClient: Send + Sync {
    /// Remote version information
    fn info(&self) -> WsbResult<RemoteInfo>;

    /// The currently open project
    fn project(&self) -> WsbResult<ProjectDescriptor>;

    /// All state groups (id, path, name)
    fn list_state_groups(&self) -> WsbResult<Vec<ObjectRecord>>;

    /// Children of a group filtered to states, in remote order
    fn list_states(&self, group: &GroupId) -> WsbResult<Vec<ObjectRecord>>;

    /// Active state of a group; `None` when the remote reports no name
    fn current_state(&self, group: &GroupId) -> WsbResult<Option<ObjectRecord>>;

    /// Make `state` (a name or id) the active state of `group`
    fn set_state(&self, group: &GroupId, state: &str) -> WsbResult<()>;

    fn subscribe(&self, topic: Topic, sink: NotificationSink) -> WsbResult<SubscriptionId>;

    fn unsubscribe(&self, subscription: SubscriptionId) -> WsbResult<()>;

    fn is_connected(&self) -> bool;

    /// Close the session; further calls fail
    fn close(&self);
}

/// Opens sessions with the remote application
pub trait Connector: Send + Sync {
    /// Fails with `ConnectionUnavailable` when the remote cannot be reached
    fn open(&self, url: &str) -> WsbResult<Arc<dyn RemoteClient>>;
}
