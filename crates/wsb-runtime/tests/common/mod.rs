//! Shared fixtures for the runtime scenarios

#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use wsb_core::{ProjectDescriptor, WsbError};
use wsb_runtime::{ConnectionLifecycle, SessionConfig, SessionListener};
use wsb_state::{CurrentStateJournal, MirrorSnapshot, Reconciler, RenameJournal};
use wsb_test::SimulatedRemote;

/// Everything a listener was told, in order
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Seen {
    Connected { project: String, groups: usize },
    ConnectionFailed(WsbError),
    Disconnected,
    Renames(RenameJournal),
    CurrentStates(CurrentStateJournal),
}

/// Listener that records every callback and never acknowledges
#[derive(Default)]
pub struct RecordingListener {
    seen: Mutex<Vec<Seen>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&Seen) -> bool) -> usize {
        self.seen.lock().iter().filter(|s| pred(s)).count()
    }

    pub fn last(&self) -> Option<Seen> {
        self.seen.lock().last().cloned()
    }
}

impl SessionListener for RecordingListener {
    fn on_connected(
        &self,
        project: &ProjectDescriptor,
        snapshot: &MirrorSnapshot,
        _reconciler: &Reconciler,
    ) {
        self.seen.lock().push(Seen::Connected {
            project: project.name.clone(),
            groups: snapshot.len(),
        });
    }

    fn on_connection_failed(&self, error: &WsbError) {
        self.seen.lock().push(Seen::ConnectionFailed(error.clone()));
    }

    fn on_disconnected(&self) {
        self.seen.lock().push(Seen::Disconnected);
    }

    fn on_renames_pending(&self, _reconciler: &Reconciler, renames: &RenameJournal) {
        self.seen.lock().push(Seen::Renames(renames.clone()));
    }

    fn on_current_state_pending(&self, _reconciler: &Reconciler, changes: &CurrentStateJournal) {
        self.seen.lock().push(Seen::CurrentStates(changes.clone()));
    }
}

/// Lifecycle over `remote` with a recording listener attached
pub fn session(remote: &SimulatedRemote) -> (ConnectionLifecycle, Arc<RecordingListener>) {
    let lifecycle = ConnectionLifecycle::new(Arc::new(remote.clone()), SessionConfig::default());
    let listener = RecordingListener::new();
    lifecycle.register_listener(listener.clone());
    (lifecycle, listener)
}
