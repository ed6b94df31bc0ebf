//! Reconciliation between staged edits and remote changes

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use wsb_core::{CapabilityMode, GroupId, RemoteClient, RemoteEvent, WsbError, WsbResult};

use crate::{
    ChangeJournal, CurrentStateJournal, MirrorSnapshot, PendingEditSet, RenameJournal,
    StateMirror,
};

/// Everything owned by one connected session
#[derive(Debug, Default)]
pub struct SessionState {
    pub mirror: StateMirror,
    pub journal: ChangeJournal,
    pub pending: PendingEditSet,
    mode: CapabilityMode,
}

/// Mirror, journal and pending set behind the single session lock
pub type SharedState = Arc<Mutex<SessionState>>;

/// Which journal an applied notification appended to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JournalKind {
    Renames,
    CurrentStates,
}

/// Result of staging a selection
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageOutcome {
    /// The selection differs from the current state and is now pending
    Staged,
    /// The selection equals the current state; the pending entry was dropped
    Reverted,
    /// The selection equals the current state and nothing was pending
    Unchanged,
}

impl SessionState {
    pub fn new(mirror: StateMirror, mode: CapabilityMode) -> Self {
        SessionState {
            mirror,
            journal: ChangeJournal::new(),
            pending: PendingEditSet::new(),
            mode,
        }
    }

    pub fn into_shared(self) -> SharedState {
        Arc::new(Mutex::new(self))
    }

    pub fn mode(&self) -> CapabilityMode {
        self.mode
    }

    /// Patch the mirror from a notification and journal the change
    ///
    /// The journal is only appended when the mirror accepted the change.
    /// `SessionClosing` carries no state and yields `None`.
    pub fn apply_event(&mut self, event: &RemoteEvent) -> WsbResult<Option<JournalKind>> {
        match event {
            RemoteEvent::GroupRenamed(e) => {
                let old_path = self.mirror.apply_group_renamed(&e.group, &e.new_path)?;
                self.journal
                    .record_group_renamed(e.group.clone(), old_path, e.new_path.clone());
                Ok(Some(JournalKind::Renames))
            }
            RemoteEvent::StateRenamed(e) => {
                self.mirror
                    .apply_state_renamed(&e.group, &e.old_name, &e.new_name)?;
                if self.pending.rename_target(&e.group, &e.old_name, &e.new_name) {
                    tracing::debug!(group = %e.group, new_name = %e.new_name, "staged edit follows rename");
                }
                self.journal.record_state_renamed(
                    e.group.clone(),
                    e.state.clone(),
                    e.old_name.clone(),
                    e.new_name.clone(),
                );
                Ok(Some(JournalKind::Renames))
            }
            RemoteEvent::CurrentStateChanged(e) => {
                self.mirror
                    .apply_current_state_changed(&e.group, &e.state_name)?;
                self.journal
                    .record_current_state(e.group.clone(), e.state_name.clone());
                Ok(Some(JournalKind::CurrentStates))
            }
            RemoteEvent::SessionClosing(_) => Ok(None),
        }
    }

    /// Stage a user selection against the mirror's current state right now
    pub fn stage_selection(&mut self, group: &GroupId, chosen: &str) -> WsbResult<StageOutcome> {
        let live = self.mirror.lookup(group)?;
        if live.is_current(chosen) {
            return Ok(match self.pending.unstage(group) {
                Some(_) => StageOutcome::Reverted,
                None => StageOutcome::Unchanged,
            });
        }
        self.pending.stage(group.clone(), chosen.to_string());
        Ok(StageOutcome::Staged)
    }

    /// Swap in a freshly built mirror, dropping journals and staged edits
    pub fn replace_mirror(&mut self, mirror: StateMirror) {
        self.mirror = mirror;
        self.journal.clear();
        self.pending.clear();
    }
}

/// Outcome of one staged edit during commit
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitOutcome {
    pub group: GroupId,
    pub state: String,
    pub result: WsbResult<()>,
}

impl CommitOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// Commit result for a batch of staged edits
#[derive(Debug, Default)]
pub struct CommitReport {
    pub applied: u32,
    pub failed: u32,
    pub skipped: u32,
    pub outcomes: Vec<CommitOutcome>,
}

impl CommitReport {
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }

    pub fn outcome(&self, group: &GroupId) -> Option<&CommitOutcome> {
        self.outcomes.iter().find(|o| &o.group == group)
    }
}

/// Staging and commit policy for one session
///
/// Cheap to clone; every clone shares the session's state and client.
#[derive(Clone)]
pub struct Reconciler {
    state: SharedState,
    client: Arc<dyn RemoteClient>,
}

impl Reconciler {
    pub fn new(state: SharedState, client: Arc<dyn RemoteClient>) -> Self {
        Reconciler { state, client }
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn mode(&self) -> CapabilityMode {
        self.state.lock().mode()
    }

    /// Stage a selection; unknown groups are logged and nothing is staged
    pub fn stage_selection(&self, group: &GroupId, chosen: &str) -> WsbResult<StageOutcome> {
        let outcome = self.state.lock().stage_selection(group, chosen);
        match &outcome {
            Ok(result) => tracing::debug!(%group, chosen, ?result, "selection staged"),
            Err(e) => tracing::warn!(%group, chosen, error = %e, "selection ignored"),
        }
        outcome
    }

    /// Send every staged edit to the remote
    ///
    /// The pending set is drained up front and is empty afterwards whatever
    /// the outcome; failures are reported per group and not retried.
    pub fn commit(&self) -> CommitReport {
        let batch: Vec<(GroupId, String, bool)> = {
            let mut state = self.state.lock();
            let edits = state.pending.drain();
            edits
                .into_iter()
                .map(|(group, name)| {
                    let known = state.mirror.contains(&group);
                    (group, name, known)
                })
                .collect()
        };

        let mut report = CommitReport::default();
        for (group, name, known) in batch {
            let result = if !known {
                tracing::warn!(%group, state = %name, "commit skipped for unknown group");
                report.skipped += 1;
                Err(WsbError::UnknownGroupReference(group.clone()))
            } else {
                match self.client.set_state(&group, &name) {
                    Ok(()) => {
                        report.applied += 1;
                        Ok(())
                    }
                    Err(e) => {
                        tracing::warn!(%group, state = %name, error = %e, "set state failed");
                        report.failed += 1;
                        Err(WsbError::SetStateFailed {
                            group: group.clone(),
                            reason: e.to_string(),
                        })
                    }
                }
            };
            report.outcomes.push(CommitOutcome {
                group,
                state: name,
                result,
            });
        }

        tracing::info!(
            applied = report.applied,
            failed = report.failed,
            skipped = report.skipped,
            "commit finished"
        );
        report
    }

    pub fn acknowledge_rename_sync(&self) {
        self.state.lock().journal.clear_renames();
    }

    pub fn acknowledge_current_state_sync(&self) {
        self.state.lock().journal.clear_current_states();
    }

    pub fn pending(&self) -> BTreeMap<GroupId, String> {
        self.state.lock().pending.to_map()
    }

    pub fn is_pending(&self, group: &GroupId) -> bool {
        self.state.lock().pending.contains(group)
    }

    pub fn snapshot(&self) -> MirrorSnapshot {
        self.state.lock().mirror.snapshot()
    }

    pub fn renames(&self) -> RenameJournal {
        self.state.lock().journal.renames().clone()
    }

    pub fn current_states(&self) -> CurrentStateJournal {
        self.state.lock().journal.current_states().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wsb_core::{Connector, StateGroup};
    use wsb_test::SimulatedRemote;

    fn ambience(id: &GroupId) -> StateGroup {
        StateGroup::new(id.clone(), "\\A\\Ambience")
            .with_states(["On", "Off"])
            .with_current("Off")
    }

    fn session(remote: &SimulatedRemote, mode: CapabilityMode) -> Reconciler {
        let client = remote.open("ws://local").unwrap();
        let mirror = StateMirror::build_snapshot(client.as_ref(), mode).unwrap();
        Reconciler::new(SessionState::new(mirror, mode).into_shared(), client)
    }

    #[test]
    fn test_reselecting_current_cancels_pending_edit() {
        let g = GroupId::new("g1");
        let mut state = SessionState::new(
            StateMirror::from_groups(vec![ambience(&g)]),
            CapabilityMode::Full,
        );

        assert_eq!(state.stage_selection(&g, "On").unwrap(), StageOutcome::Staged);
        state
            .apply_event(&RemoteEvent::current_state_changed(g.clone(), "On"))
            .unwrap();
        assert_eq!(state.stage_selection(&g, "On").unwrap(), StageOutcome::Reverted);

        assert!(!state.pending.contains(&g));
    }

    #[test]
    fn test_selecting_live_value_is_not_staged() {
        let g = GroupId::new("g1");
        let mut state = SessionState::new(
            StateMirror::from_groups(vec![ambience(&g)]),
            CapabilityMode::Full,
        );
        assert_eq!(state.stage_selection(&g, "Off").unwrap(), StageOutcome::Unchanged);
        assert!(state.pending.is_empty());
    }

    #[test]
    fn test_stage_unknown_group() {
        let mut state = SessionState::default();
        let err = state.stage_selection(&GroupId::new("ghost"), "On").unwrap_err();
        assert!(matches!(err, WsbError::UnknownGroupReference(_)));
        assert!(state.pending.is_empty());
    }

    #[test]
    fn test_failed_notification_is_not_journaled() {
        let g = GroupId::new("g1");
        let mut state = SessionState::new(
            StateMirror::from_groups(vec![ambience(&g)]),
            CapabilityMode::Full,
        );
        let err = state
            .apply_event(&RemoteEvent::state_renamed(g.clone(), "{S}", "Missing", "X"))
            .unwrap_err();
        assert!(err.is_stale_reference());
        assert!(state.journal.is_empty());
    }

    #[test]
    fn test_staged_edit_follows_state_rename() {
        let remote = SimulatedRemote::new();
        let g = remote.add_group("\\A\\Ambience", &["On", "Off"], Some("Off"));
        let reconciler = session(&remote, CapabilityMode::Full);
        reconciler.stage_selection(&g, "On").unwrap();

        let state_id = remote.state_id(&g, "On").unwrap();
        reconciler
            .state()
            .lock()
            .apply_event(&RemoteEvent::state_renamed(g.clone(), state_id, "On", "Active"))
            .unwrap();
        remote.rename_state(&g, "On", "Active");

        assert_eq!(reconciler.pending().get(&g).map(String::as_str), Some("Active"));
        let report = reconciler.commit();
        assert!(report.all_succeeded());
        assert_eq!(remote.set_state_calls(), vec![(g.clone(), "Active".to_string())]);
    }

    #[test]
    fn test_commit_sends_each_edit() {
        let remote = SimulatedRemote::new();
        let g1 = remote.add_group("\\A", &["On", "Off"], Some("Off"));
        let g2 = remote.add_group("\\B", &["Low", "High"], Some("Low"));
        let reconciler = session(&remote, CapabilityMode::Full);

        reconciler.stage_selection(&g1, "On").unwrap();
        reconciler.stage_selection(&g2, "High").unwrap();
        let report = reconciler.commit();

        assert_eq!(report.applied, 2);
        assert!(report.all_succeeded());
        assert!(reconciler.pending().is_empty());
        assert_eq!(remote.remote_current(&g1).as_deref(), Some("On"));
        assert_eq!(remote.remote_current(&g2).as_deref(), Some("High"));
    }

    #[test]
    fn test_commit_clears_pending_even_when_every_call_fails() {
        let remote = SimulatedRemote::new();
        let g1 = remote.add_group("\\A", &["On", "Off"], Some("Off"));
        let g2 = remote.add_group("\\B", &["Low", "High"], Some("Low"));
        remote.reject_all_set_state();
        let reconciler = session(&remote, CapabilityMode::Full);

        reconciler.stage_selection(&g1, "On").unwrap();
        reconciler.stage_selection(&g2, "High").unwrap();
        let report = reconciler.commit();

        assert_eq!(report.failed, 2);
        assert!(matches!(
            report.outcome(&g1).map(|o| &o.result),
            Some(Err(WsbError::SetStateFailed { .. }))
        ));
        assert!(reconciler.pending().is_empty());
    }

    #[test]
    fn test_commit_failure_does_not_abort_batch() {
        let remote = SimulatedRemote::new();
        let g1 = remote.add_group("\\A", &["On", "Off"], Some("Off"));
        let g2 = remote.add_group("\\B", &["Low", "High"], Some("Low"));
        remote.reject_set_state_for(&g1);
        let reconciler = session(&remote, CapabilityMode::Full);

        reconciler.stage_selection(&g1, "On").unwrap();
        reconciler.stage_selection(&g2, "High").unwrap();
        let report = reconciler.commit();

        assert_eq!((report.applied, report.failed), (1, 1));
        assert!(report.outcome(&g2).unwrap().succeeded());
    }

    #[test]
    fn test_commit_skips_groups_missing_from_mirror() {
        let remote = SimulatedRemote::new();
        let g = remote.add_group("\\A", &["On", "Off"], Some("Off"));
        let reconciler = session(&remote, CapabilityMode::Full);
        reconciler.stage_selection(&g, "On").unwrap();
        reconciler
            .state()
            .lock()
            .replace_mirror(StateMirror::new());
        reconciler
            .state()
            .lock()
            .pending
            .stage(g.clone(), "On".into());
        remote.clear_calls();

        let report = reconciler.commit();

        assert_eq!(report.skipped, 1);
        assert!(remote.set_state_calls().is_empty());
        assert!(reconciler.pending().is_empty());
    }

    #[test]
    fn test_acknowledge_clears_only_its_log() {
        let g = GroupId::new("g1");
        let remote = SimulatedRemote::new();
        let client = remote.open("ws://local").unwrap();
        let mut state = SessionState::new(
            StateMirror::from_groups(vec![ambience(&g)]),
            CapabilityMode::Full,
        );
        state
            .apply_event(&RemoteEvent::group_renamed(g.clone(), "\\A\\Weather"))
            .unwrap();
        state
            .apply_event(&RemoteEvent::current_state_changed(g.clone(), "On"))
            .unwrap();
        let reconciler = Reconciler::new(state.into_shared(), client);

        reconciler.acknowledge_rename_sync();
        assert!(reconciler.renames().is_empty());
        assert_eq!(reconciler.current_states().len(), 1);

        reconciler.acknowledge_current_state_sync();
        assert!(reconciler.current_states().is_empty());
    }
}
