//! Remote notification definitions
//!
//! Each push topic of the remote application decodes into exactly one typed
//! event carrying the fields its handler needs.

use std::fmt;

use crate::{GroupId, ObjectId};

/// Push topics the engine subscribes to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Topic {
    /// An entity was renamed or moved
    NameChanged,
    /// The active state of a group changed
    CurrentStateChanged,
    /// The remote project is about to close
    ProjectClosing,
}

impl Topic {
    pub const ALL: [Topic; 3] = [
        Topic::NameChanged,
        Topic::CurrentStateChanged,
        Topic::ProjectClosing,
    ];
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Topic::NameChanged => "name-changed",
            Topic::CurrentStateChanged => "current-state-changed",
            Topic::ProjectClosing => "project-closing",
        };
        f.write_str(name)
    }
}

/// A state group was renamed (or moved, which changes its path)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupRenamedEvent {
    pub group: GroupId,
    pub new_path: String,
}

/// A state inside a group was renamed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateRenamedEvent {
    pub group: GroupId,
    pub state: ObjectId,
    pub old_name: String,
    pub new_name: String,
}

/// The active state of a group changed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurrentStateChangedEvent {
    pub group: GroupId,
    pub state: Option<ObjectId>,
    pub state_name: String,
}

/// The remote session is closing
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionClosingEvent;

/// Remote notification
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemoteEvent {
    GroupRenamed(GroupRenamedEvent),
    StateRenamed(StateRenamedEvent),
    CurrentStateChanged(CurrentStateChangedEvent),
    SessionClosing(SessionClosingEvent),
}

impl RemoteEvent {
    /// Topic this event is delivered on
    pub fn topic(&self) -> Topic {
        match self {
            RemoteEvent::GroupRenamed(_) | RemoteEvent::StateRenamed(_) => Topic::NameChanged,
            RemoteEvent::CurrentStateChanged(_) => Topic::CurrentStateChanged,
            RemoteEvent::SessionClosing(_) => Topic::ProjectClosing,
        }
    }

    /// Group the event refers to, if any
    pub fn group(&self) -> Option<&GroupId> {
        match self {
            RemoteEvent::GroupRenamed(e) => Some(&e.group),
            RemoteEvent::StateRenamed(e) => Some(&e.group),
            RemoteEvent::CurrentStateChanged(e) => Some(&e.group),
            RemoteEvent::SessionClosing(_) => None,
        }
    }

    pub fn group_renamed(group: impl Into<GroupId>, new_path: impl Into<String>) -> Self {
        RemoteEvent::GroupRenamed(GroupRenamedEvent {
            group: group.into(),
            new_path: new_path.into(),
        })
    }

    pub fn state_renamed(
        group: impl Into<GroupId>,
        state: impl Into<ObjectId>,
        old_name: impl Into<String>,
        new_name: impl Into<String>,
    ) -> Self {
        RemoteEvent::StateRenamed(StateRenamedEvent {
            group: group.into(),
            state: state.into(),
            old_name: old_name.into(),
            new_name: new_name.into(),
        })
    }

    pub fn current_state_changed(group: impl Into<GroupId>, state_name: impl Into<String>) -> Self {
        RemoteEvent::CurrentStateChanged(CurrentStateChangedEvent {
            group: group.into(),
            state: None,
            state_name: state_name.into(),
        })
    }

    pub fn session_closing() -> Self {
        RemoteEvent::SessionClosing(SessionClosingEvent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_topics() {
        assert_eq!(
            RemoteEvent::group_renamed("{G}", "\\A").topic(),
            Topic::NameChanged
        );
        assert_eq!(
            RemoteEvent::state_renamed("{G}", "{S}", "Off", "Idle").topic(),
            Topic::NameChanged
        );
        assert_eq!(
            RemoteEvent::current_state_changed("{G}", "On").topic(),
            Topic::CurrentStateChanged
        );
        assert_eq!(RemoteEvent::session_closing().topic(), Topic::ProjectClosing);
    }

    #[test]
    fn test_event_group() {
        let event = RemoteEvent::state_renamed("{G}", "{S}", "Off", "Idle");
        assert_eq!(event.group(), Some(&GroupId::new("{G}")));
        assert_eq!(RemoteEvent::session_closing().group(), None);
    }
}
