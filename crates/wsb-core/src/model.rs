//! State group data model
//!
//! A state group is a named category with an ordered set of mutually
//! exclusive state names, exactly one of which is current at any time.

use std::fmt;

use crate::GroupId;

/// Separator used by the remote application in hierarchical paths
pub const PATH_SEPARATOR: char = '\\';

/// First remote release year that pushes live current-state changes
pub const DEFAULT_MIN_LIVE_STATE_YEAR: u32 = 2022;

/// A mirrored state group
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateGroup {
    pub id: GroupId,
    /// Hierarchical path, e.g. `\States\Default Work Unit\Ambience`
    pub path: String,
    /// State names in remote enumeration order
    pub states: Vec<String>,
    /// Active state, `None` until known
    pub current: Option<String>,
}

impl StateGroup {
    pub fn new(id: GroupId, path: impl Into<String>) -> Self {
        StateGroup {
            id,
            path: path.into(),
            states: Vec::new(),
            current: None,
        }
    }

    pub fn with_states<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.states = states.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_current(mut self, current: impl Into<String>) -> Self {
        self.current = Some(current.into());
        self
    }

    /// Last path segment
    pub fn name(&self) -> &str {
        leaf_name(&self.path)
    }

    /// Label shown to the user: full path or leaf name
    pub fn label(&self, full_path: bool) -> &str {
        if full_path {
            &self.path
        } else {
            self.name()
        }
    }

    /// Position of a state name in enumeration order
    pub fn position(&self, state: &str) -> Option<usize> {
        self.states.iter().position(|s| s == state)
    }

    pub fn has_state(&self, state: &str) -> bool {
        self.position(state).is_some()
    }

    /// Whether `state` is the known current state
    #[inline]
    pub fn is_current(&self, state: &str) -> bool {
        self.current.as_deref() == Some(state)
    }
}

/// Leaf segment of a backslash-delimited path
pub fn leaf_name(path: &str) -> &str {
    path.rsplit(PATH_SEPARATOR).next().unwrap_or(path)
}

/// The project open in the remote application
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProjectDescriptor {
    pub name: String,
    pub file_path: String,
}

impl fmt::Display for ProjectDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<{}>", self.name, self.file_path)
    }
}

/// Remote application version
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct RemoteVersion {
    pub year: u32,
    pub major: u32,
    pub minor: u32,
    pub build: u32,
}

impl fmt::Display for RemoteVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.year, self.major, self.minor, self.build)
    }
}

/// Remote application information queried at connect time
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RemoteInfo {
    pub version: RemoteVersion,
}

/// Session capability, resolved once per connection
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CapabilityMode {
    /// Current-state changes are pushed live
    #[default]
    Full,
    /// Compatibility mode: no current-state topic, current stays unknown
    Restricted,
}

impl CapabilityMode {
    /// Resolve the mode for a remote version
    pub fn for_version(version: RemoteVersion, min_live_state_year: u32) -> Self {
        if version.year < min_live_state_year {
            CapabilityMode::Restricted
        } else {
            CapabilityMode::Full
        }
    }

    #[inline]
    pub fn has_live_current_state(self) -> bool {
        self == CapabilityMode::Full
    }
}
