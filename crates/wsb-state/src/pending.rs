//! Pending edit set - user-staged target states not yet sent

use std::collections::BTreeMap;

use wsb_core::GroupId;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PendingEditSet {
    edits: BTreeMap<GroupId, String>,
}

impl PendingEditSet {
    pub fn new() -> Self {
        PendingEditSet::default()
    }

    pub fn get(&self, group: &GroupId) -> Option<&str> {
        self.edits.get(group).map(String::as_str)
    }

    pub fn contains(&self, group: &GroupId) -> bool {
        self.edits.contains_key(group)
    }

    /// Set or overwrite the staged state for a group
    pub fn stage(&mut self, group: GroupId, state: String) -> Option<String> {
        self.edits.insert(group, state)
    }

    /// Follow a remote state rename; returns whether an edit was retargeted
    pub fn rename_target(&mut self, group: &GroupId, old_name: &str, new_name: &str) -> bool {
        match self.edits.get_mut(group) {
            Some(state) if state == old_name => {
                *state = new_name.to_string();
                true
            }
            _ => false,
        }
    }

    pub fn unstage(&mut self, group: &GroupId) -> Option<String> {
        self.edits.remove(group)
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GroupId, &str)> {
        self.edits.iter().map(|(g, s)| (g, s.as_str()))
    }

    /// Take every staged edit, leaving the set empty
    pub fn drain(&mut self) -> Vec<(GroupId, String)> {
        std::mem::take(&mut self.edits).into_iter().collect()
    }

    pub fn clear(&mut self) {
        self.edits.clear();
    }

    pub fn to_map(&self) -> BTreeMap<GroupId, String> {
        self.edits.clone()
    }
}
