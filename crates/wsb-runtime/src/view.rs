//! Headless state browser
//!
//! Presentation model of the state browser window: one row per state group
//! with its label, the selectable states, the selected state and a dirty mark
//! for staged edits. Rendering is left to the host; the view only keeps the
//! model in step with the session and applies the auto-sync setting.

use std::sync::Arc;

use parking_lot::Mutex;
use wsb_core::{leaf_name, GroupId, ProjectDescriptor, WsbError, WsbResult};
use wsb_state::{
    CommitReport, CurrentStateJournal, MirrorSnapshot, Reconciler, RenameJournal, RenameRecord,
    StageOutcome,
};

use crate::{ConnectionLifecycle, SessionListener, Settings};

/// Status line shown while no session is active
pub const NOT_CONNECTED_HINT: &str = "Check Wwise is running and WAAPI is enabled.";

/// One state group as displayed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupRow {
    pub group: GroupId,
    pub path: String,
    pub label: String,
    pub choices: Vec<String>,
    pub selected: Option<String>,
    /// A selection is staged and not yet committed
    pub dirty: bool,
}

impl GroupRow {
    fn relabel(&mut self, full_path: bool) {
        self.label = if full_path {
            self.path.clone()
        } else {
            leaf_name(&self.path).to_string()
        };
    }
}

struct ViewState {
    settings: Settings,
    status: String,
    rows: Vec<GroupRow>,
    reconciler: Option<Reconciler>,
}

impl ViewState {
    fn row_mut(&mut self, group: &GroupId) -> Option<&mut GroupRow> {
        self.rows.iter_mut().find(|r| &r.group == group)
    }

    fn redraw(&mut self, snapshot: &MirrorSnapshot) {
        let full_path = self.settings.visible_stategroup_path;
        self.rows = snapshot
            .iter()
            .map(|group| {
                let mut row = GroupRow {
                    group: group.id.clone(),
                    path: group.path.clone(),
                    label: String::new(),
                    choices: group.states.clone(),
                    selected: group.current.clone(),
                    dirty: false,
                };
                row.relabel(full_path);
                row
            })
            .collect();
    }
}

/// State browser presentation model
pub struct StateBrowserView {
    inner: Mutex<ViewState>,
}

impl StateBrowserView {
    pub fn new(settings: Settings) -> Arc<Self> {
        Arc::new(StateBrowserView {
            inner: Mutex::new(ViewState {
                settings,
                status: format!("NotConnected: {}", NOT_CONNECTED_HINT),
                rows: Vec::new(),
                reconciler: None,
            }),
        })
    }

    /// Register with `lifecycle` and return the view
    pub fn attach(lifecycle: &ConnectionLifecycle, settings: Settings) -> Arc<Self> {
        let view = Self::new(settings);
        lifecycle.register_listener(view.clone());
        view
    }

    pub fn settings(&self) -> Settings {
        self.inner.lock().settings.clone()
    }

    pub fn status(&self) -> String {
        self.inner.lock().status.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.lock().reconciler.is_some()
    }

    pub fn rows(&self) -> Vec<GroupRow> {
        self.inner.lock().rows.clone()
    }

    pub fn row(&self, group: &GroupId) -> Option<GroupRow> {
        self.inner.lock().rows.iter().find(|r| &r.group == group).cloned()
    }

    pub fn set_autosync(&self, enabled: bool) {
        self.inner.lock().settings.enable_autosync = enabled;
    }

    /// Switch labels between full path and leaf name
    pub fn set_show_path(&self, full_path: bool) {
        let mut inner = self.inner.lock();
        inner.settings.visible_stategroup_path = full_path;
        for row in &mut inner.rows {
            row.relabel(full_path);
        }
    }

    fn reconciler(&self) -> WsbResult<Reconciler> {
        self.inner.lock().reconciler.clone().ok_or(WsbError::NotConnected)
    }

    /// User picked `choice` for `group`
    pub fn select(&self, group: &GroupId, choice: &str) -> WsbResult<StageOutcome> {
        let reconciler = self.reconciler()?;
        let outcome = reconciler.stage_selection(group, choice)?;
        if let Some(row) = self.inner.lock().row_mut(group) {
            row.selected = Some(choice.to_string());
            row.dirty = outcome == StageOutcome::Staged;
        }
        Ok(outcome)
    }

    /// Send every staged selection to the remote
    pub fn commit(&self) -> WsbResult<CommitReport> {
        let reconciler = self.reconciler()?;
        let report = reconciler.commit();
        for row in &mut self.inner.lock().rows {
            row.dirty = false;
        }
        Ok(report)
    }

    /// Rebuild the mirror from the remote and redraw every row
    pub fn force_update(&self, lifecycle: &ConnectionLifecycle) -> WsbResult<()> {
        let snapshot = lifecycle.refresh()?;
        self.inner.lock().redraw(&snapshot);
        Ok(())
    }
}

impl SessionListener for StateBrowserView {
    fn on_connected(
        &self,
        project: &ProjectDescriptor,
        snapshot: &MirrorSnapshot,
        reconciler: &Reconciler,
    ) {
        {
            let mut inner = self.inner.lock();
            inner.status = format!("Connected: {}", project);
            inner.reconciler = Some(reconciler.clone());
            inner.redraw(snapshot);
        }
        reconciler.acknowledge_rename_sync();
        reconciler.acknowledge_current_state_sync();
    }

    fn on_connection_failed(&self, error: &WsbError) {
        self.inner.lock().status = format!("NotConnected: {}", error);
    }

    fn on_disconnected(&self) {
        let mut inner = self.inner.lock();
        inner.reconciler = None;
        inner.status = format!("NotConnected: {}", NOT_CONNECTED_HINT);
    }

    fn on_renames_pending(&self, reconciler: &Reconciler, renames: &RenameJournal) {
        let snapshot = {
            let inner = self.inner.lock();
            if !inner.settings.enable_autosync {
                return;
            }
            reconciler.snapshot()
        };

        {
            let mut inner = self.inner.lock();
            let full_path = inner.settings.visible_stategroup_path;
            for (group, record) in renames {
                let Some(row) = inner.row_mut(group) else {
                    continue;
                };
                match record {
                    RenameRecord::GroupRenamed { new_path, .. } => {
                        row.path = new_path.clone();
                        row.relabel(full_path);
                    }
                    RenameRecord::StatesRenamed(states) => {
                        if let Some(live) = snapshot.iter().find(|g| &g.id == group) {
                            row.choices = live.states.clone();
                        }
                        for rename in states {
                            if row.selected.as_deref() == Some(rename.old_name.as_str()) {
                                row.selected = Some(rename.new_name.clone());
                            }
                        }
                    }
                }
            }
        }
        reconciler.acknowledge_rename_sync();
    }

    fn on_current_state_pending(&self, reconciler: &Reconciler, changes: &CurrentStateJournal) {
        {
            let mut inner = self.inner.lock();
            if !inner.settings.enable_autosync {
                return;
            }
            for (group, state) in changes {
                let dirty = reconciler.is_pending(group);
                if let Some(row) = inner.row_mut(group) {
                    row.selected = Some(state.clone());
                    row.dirty = dirty;
                }
            }
        }
        reconciler.acknowledge_current_state_sync();
    }
}
