//! Change journal - remote changes not yet acknowledged by the presentation
//!
//! Two independent logs are kept: renames and current-state transitions.
//! Each is cleared wholesale when the consumer reports it has redrawn.

use std::collections::BTreeMap;

use wsb_core::{GroupId, ObjectId};

/// One state's rename as last reported
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateRename {
    pub state: ObjectId,
    pub old_name: String,
    pub new_name: String,
}

/// Outstanding rename record for a group
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenameRecord {
    GroupRenamed { old_path: String, new_path: String },
    StatesRenamed(Vec<StateRename>),
}

/// Rename records keyed by group
pub type RenameJournal = BTreeMap<GroupId, RenameRecord>;

/// New current-state name keyed by group
pub type CurrentStateJournal = BTreeMap<GroupId, String>;

#[derive(Debug, Default, Clone)]
pub struct ChangeJournal {
    renames: RenameJournal,
    current_states: CurrentStateJournal,
}

impl ChangeJournal {
    pub fn new() -> Self {
        ChangeJournal::default()
    }

    /// Record a group rename, replacing any outstanding record for the group
    pub fn record_group_renamed(&mut self, group: GroupId, old_path: String, new_path: String) {
        self.renames
            .insert(group, RenameRecord::GroupRenamed { old_path, new_path });
    }

    /// Record a state rename
    ///
    /// A repeated rename of the same state overwrites its entry with the
    /// latest pair, so the first old name is lost.
    pub fn record_state_renamed(
        &mut self,
        group: GroupId,
        state: ObjectId,
        old_name: String,
        new_name: String,
    ) {
        let rename = StateRename {
            state,
            old_name,
            new_name,
        };

        if let Some(RenameRecord::StatesRenamed(states)) = self.renames.get_mut(&group) {
            if !states.is_empty() {
                match states.iter().position(|s| s.state == rename.state) {
                    Some(i) => states[i] = rename,
                    None => states.push(rename),
                }
                return;
            }
        }
        self.renames
            .insert(group, RenameRecord::StatesRenamed(vec![rename]));
    }

    /// Record a current-state transition (last write wins)
    pub fn record_current_state(&mut self, group: GroupId, state_name: String) {
        self.current_states.insert(group, state_name);
    }

    pub fn renames(&self) -> &RenameJournal {
        &self.renames
    }

    pub fn current_states(&self) -> &CurrentStateJournal {
        &self.current_states
    }

    pub fn clear_renames(&mut self) {
        self.renames.clear();
    }

    pub fn clear_current_states(&mut self) {
        self.current_states.clear();
    }

    pub fn clear(&mut self) {
        self.clear_renames();
        self.clear_current_states();
    }

    pub fn is_empty(&self) -> bool {
        self.renames.is_empty() && self.current_states.is_empty()
    }
}
