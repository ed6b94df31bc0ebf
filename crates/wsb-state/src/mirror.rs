//! State mirror - the local copy of the remote state groups

use std::collections::HashMap;

use wsb_core::{
    CapabilityMode, GroupId, RemoteClient, StateGroup, WsbError, WsbResult,
};

/// Read-only, path-ordered copy of the mirror handed to observers
pub type MirrorSnapshot = Vec<StateGroup>;

/// State mirror - the local reality
///
/// Groups are kept in ascending path order as of the last snapshot build.
/// Renames patch paths in place and do not re-sort; the next snapshot does.
#[derive(Debug, Default, Clone)]
pub struct StateMirror {
    groups: Vec<StateGroup>,
    /// Position of each group in `groups`
    index: HashMap<GroupId, usize>,
}

impl StateMirror {
    pub fn new() -> Self {
        StateMirror::default()
    }

    /// Build from groups in any order; the result is sorted by path
    pub fn from_groups(mut groups: Vec<StateGroup>) -> Self {
        groups.sort_by(|a, b| a.path.cmp(&b.path));
        let index = groups
            .iter()
            .enumerate()
            .map(|(i, g)| (g.id.clone(), i))
            .collect();
        StateMirror { groups, index }
    }

    /// Fetch every group, its states and (in full mode) its current state
    ///
    /// Any failing call fails the whole build.
    pub fn build_snapshot(client: &dyn RemoteClient, mode: CapabilityMode) -> WsbResult<Self> {
        let records = client
            .list_state_groups()
            .map_err(|e| WsbError::SnapshotBuildFailed(format!("listing state groups: {}", e)))?;

        let mut groups = Vec::with_capacity(records.len());
        for record in records {
            let id = record.id.into_group();

            let states = client.list_states(&id).map_err(|e| {
                WsbError::SnapshotBuildFailed(format!("listing states of {}: {}", id, e))
            })?;

            let current = if mode.has_live_current_state() {
                client
                    .current_state(&id)
                    .map_err(|e| {
                        WsbError::SnapshotBuildFailed(format!(
                            "reading current state of {}: {}",
                            id, e
                        ))
                    })?
                    .map(|s| s.name)
                    .filter(|name| !name.is_empty())
            } else {
                None
            };

            groups.push(StateGroup {
                id,
                path: record.path,
                states: states.into_iter().map(|s| s.name).collect(),
                current,
            });
        }

        let mirror = StateMirror::from_groups(groups);
        tracing::debug!(groups = mirror.len(), ?mode, "snapshot built");
        Ok(mirror)
    }

    /// Get a group by ID
    pub fn get(&self, id: &GroupId) -> Option<&StateGroup> {
        self.index.get(id).map(|&i| &self.groups[i])
    }

    fn get_mut(&mut self, id: &GroupId) -> Option<&mut StateGroup> {
        match self.index.get(id) {
            Some(&i) => self.groups.get_mut(i),
            None => None,
        }
    }

    /// Get a group by ID, reporting absence as an error
    pub fn lookup(&self, id: &GroupId) -> WsbResult<&StateGroup> {
        self.get(id)
            .ok_or_else(|| WsbError::UnknownGroupReference(id.clone()))
    }

    pub fn contains(&self, id: &GroupId) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Iterate in mirror order
    pub fn iter(&self) -> impl Iterator<Item = &StateGroup> {
        self.groups.iter()
    }

    pub fn snapshot(&self) -> MirrorSnapshot {
        self.groups.clone()
    }

    /// Replace a group's path; returns the previous path
    pub fn apply_group_renamed(&mut self, id: &GroupId, new_path: &str) -> WsbResult<String> {
        let group = self
            .get_mut(id)
            .ok_or_else(|| WsbError::UnknownGroupReference(id.clone()))?;
        Ok(std::mem::replace(&mut group.path, new_path.to_string()))
    }

    /// Replace a state name in place, keeping its position
    pub fn apply_state_renamed(
        &mut self,
        id: &GroupId,
        old_name: &str,
        new_name: &str,
    ) -> WsbResult<usize> {
        let group = self
            .get_mut(id)
            .ok_or_else(|| WsbError::UnknownGroupReference(id.clone()))?;
        let position = group
            .position(old_name)
            .ok_or_else(|| WsbError::UnknownStateReference {
                group: id.clone(),
                state: old_name.to_string(),
            })?;
        group.states[position] = new_name.to_string();
        Ok(position)
    }

    /// Overwrite the current state; membership is not checked
    pub fn apply_current_state_changed(
        &mut self,
        id: &GroupId,
        state_name: &str,
    ) -> WsbResult<Option<String>> {
        let group = self
            .get_mut(id)
            .ok_or_else(|| WsbError::UnknownGroupReference(id.clone()))?;
        Ok(group.current.replace(state_name.to_string()))
    }
}
