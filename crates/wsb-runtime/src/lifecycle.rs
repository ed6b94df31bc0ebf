//! Connection lifecycle
//!
//! Disconnected -> Connecting -> Connected -> Disconnected. A failure while
//! connecting closes the half-open session and returns to Disconnected. A
//! close requested while connecting (the remote announcing the project is
//! closing as soon as the topics are bound) is held until the session is
//! built, which is then torn down instead of installed.
//! Mirror, journal and staged edits belong to the connected session and are
//! discarded with it.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use wsb_core::{
    CapabilityMode, Connector, ListenerToken, ProjectDescriptor, RemoteClient, RemoteInfo,
    WsbError, WsbResult,
};
use wsb_remote::{JsonConnector, SequentialExecutor, WaapiConnector};
use wsb_state::{MirrorSnapshot, Reconciler, SessionState, StateMirror};

use crate::{ListenerRegistry, SessionConfig, SessionListener, SubscriptionRouter};

/// Observable connection phase
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Disconnected,
    Connecting,
    Connected,
}

struct ActiveSession {
    client: Arc<dyn RemoteClient>,
    info: RemoteInfo,
    project: ProjectDescriptor,
    reconciler: Reconciler,
    router: SubscriptionRouter,
}

enum Slot {
    Disconnected,
    Connecting { close_requested: bool },
    Connected(ActiveSession),
}

struct Inner {
    config: SessionConfig,
    connector: Arc<dyn Connector>,
    listeners: Arc<ListenerRegistry>,
    slot: Mutex<Slot>,
}

/// Owner of at most one remote session
///
/// Cheap to clone; clones drive the same session.
#[derive(Clone)]
pub struct ConnectionLifecycle {
    inner: Arc<Inner>,
}

impl ConnectionLifecycle {
    pub fn new(connector: Arc<dyn Connector>, config: SessionConfig) -> Self {
        ConnectionLifecycle {
            inner: Arc::new(Inner {
                config,
                connector,
                listeners: Arc::new(ListenerRegistry::new()),
                slot: Mutex::new(Slot::Disconnected),
            }),
        }
    }

    /// Lifecycle speaking WAAPI over a host-supplied JSON transport
    pub fn over_waapi(
        transport: Arc<dyn JsonConnector>,
        executor: Option<SequentialExecutor>,
        config: SessionConfig,
    ) -> Self {
        let mut connector = WaapiConnector::new(transport);
        if let Some(executor) = executor {
            connector = connector.with_executor(executor);
        }
        Self::new(Arc::new(connector), config)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn register_listener(&self, listener: Arc<dyn SessionListener>) -> ListenerToken {
        self.inner.listeners.register(listener)
    }

    pub fn unregister_listener(&self, token: ListenerToken) -> bool {
        self.inner.listeners.unregister(token)
    }

    /// Open a session, build the mirror and bind the push topics
    ///
    /// A no-op while a session is active or being opened. Failures are also
    /// reported to listeners through `on_connection_failed`.
    pub fn connect(&self) -> WsbResult<()> {
        {
            let mut slot = self.inner.slot.lock();
            if !matches!(*slot, Slot::Disconnected) {
                tracing::debug!("connect ignored: session already active");
                return Ok(());
            }
            *slot = Slot::Connecting {
                close_requested: false,
            };
        }

        tracing::info!(url = %self.inner.config.url, "connecting");
        match self.open_session() {
            Ok(session) => {
                let project = session.project.clone();
                let reconciler = session.reconciler.clone();
                let snapshot = reconciler.snapshot();
                let mode = reconciler.mode();
                {
                    let mut slot = self.inner.slot.lock();
                    if matches!(*slot, Slot::Connecting { close_requested: true }) {
                        *slot = Slot::Disconnected;
                        drop(slot);
                        tracing::info!(project = %project, "closed while connecting");
                        teardown(session);
                        self.inner.listeners.notify(|l| l.on_disconnected());
                        return Ok(());
                    }
                    tracing::info!(
                        project = %project,
                        version = %session.info.version,
                        mode = ?mode,
                        groups = snapshot.len(),
                        "connected"
                    );
                    *slot = Slot::Connected(session);
                }
                self.inner
                    .listeners
                    .notify(|l| l.on_connected(&project, &snapshot, &reconciler));
                Ok(())
            }
            Err(e) => {
                *self.inner.slot.lock() = Slot::Disconnected;
                tracing::warn!(error = %e, "connection failed");
                self.inner.listeners.notify(|l| l.on_connection_failed(&e));
                Err(e)
            }
        }
    }

    fn open_session(&self) -> WsbResult<ActiveSession> {
        let client = self.inner.connector.open(&self.inner.config.url)?;
        self.establish(&client).map_err(|e| {
            client.close();
            e
        })
    }

    fn establish(&self, client: &Arc<dyn RemoteClient>) -> WsbResult<ActiveSession> {
        let info = client.info()?;
        let mode = CapabilityMode::for_version(info.version, self.inner.config.min_live_state_year);
        let project = client.project()?;
        let mirror = StateMirror::build_snapshot(client.as_ref(), mode)?;
        let reconciler = Reconciler::new(
            SessionState::new(mirror, mode).into_shared(),
            Arc::clone(client),
        );

        let lifecycle: Weak<Inner> = Arc::downgrade(&self.inner);
        let router = SubscriptionRouter::bind(
            Arc::clone(client),
            reconciler.clone(),
            Arc::clone(&self.inner.listeners),
            Arc::new(move || {
                if let Some(inner) = lifecycle.upgrade() {
                    ConnectionLifecycle { inner }.disconnect();
                }
            }),
        )?;

        Ok(ActiveSession {
            client: Arc::clone(client),
            info,
            project,
            reconciler,
            router,
        })
    }

    /// Tear down the active session
    ///
    /// Idempotent: only the call that takes the session out of the slot
    /// unbinds, closes and notifies. While connecting, the request is
    /// recorded and `connect` tears the new session down once it is built.
    pub fn disconnect(&self) {
        let session = {
            let mut slot = self.inner.slot.lock();
            match std::mem::replace(&mut *slot, Slot::Disconnected) {
                Slot::Connected(session) => session,
                Slot::Connecting { .. } => {
                    *slot = Slot::Connecting {
                        close_requested: true,
                    };
                    tracing::debug!("close requested while connecting");
                    return;
                }
                Slot::Disconnected => return,
            }
        };

        teardown(session);
        self.inner.listeners.notify(|l| l.on_disconnected());
    }

    /// Rebuild the mirror from the remote
    ///
    /// Both journals and the staged edits are cleared. On failure the previous
    /// mirror is kept.
    pub fn refresh(&self) -> WsbResult<MirrorSnapshot> {
        let (client, reconciler) = match &*self.inner.slot.lock() {
            Slot::Connected(session) => (Arc::clone(&session.client), session.reconciler.clone()),
            _ => return Err(WsbError::NotConnected),
        };

        let mirror = StateMirror::build_snapshot(client.as_ref(), reconciler.mode())?;
        let snapshot = mirror.snapshot();
        reconciler.state().lock().replace_mirror(mirror);
        tracing::info!(groups = snapshot.len(), "mirror refreshed");
        Ok(snapshot)
    }

    pub fn phase(&self) -> Phase {
        match &*self.inner.slot.lock() {
            Slot::Disconnected => Phase::Disconnected,
            Slot::Connecting { .. } => Phase::Connecting,
            Slot::Connected(_) => Phase::Connected,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.phase() == Phase::Connected
    }

    /// Reconciler of the active session
    pub fn reconciler(&self) -> Option<Reconciler> {
        match &*self.inner.slot.lock() {
            Slot::Connected(session) => Some(session.reconciler.clone()),
            _ => None,
        }
    }

    pub fn project(&self) -> Option<ProjectDescriptor> {
        match &*self.inner.slot.lock() {
            Slot::Connected(session) => Some(session.project.clone()),
            _ => None,
        }
    }

    pub fn remote_info(&self) -> Option<RemoteInfo> {
        match &*self.inner.slot.lock() {
            Slot::Connected(session) => Some(session.info.clone()),
            _ => None,
        }
    }
}

fn teardown(session: ActiveSession) {
    session.router.unbind();
    session
        .reconciler
        .state()
        .lock()
        .replace_mirror(StateMirror::new());
    session.client.close();
    tracing::info!(project = %session.project, "disconnected");
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Slot::Connected(session) = std::mem::replace(self.slot.get_mut(), Slot::Disconnected) {
            teardown(session);
        }
    }
}
