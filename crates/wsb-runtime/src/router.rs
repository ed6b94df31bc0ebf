//! Subscription router
//!
//! Binds the remote push topics of one session to the mirror and journal.
//! Every notification is applied under the session lock; observers are told
//! about the outstanding journal afterwards, with the lock released.

use std::sync::Arc;

use parking_lot::Mutex;
use wsb_core::{
    CapabilityMode, NotificationSink, RemoteClient, RemoteEvent, SubscriptionId, Topic, WsbResult,
};
use wsb_state::{CurrentStateJournal, JournalKind, Reconciler, RenameJournal};

use crate::ListenerRegistry;

/// Invoked when the remote announces the session is closing
pub type ClosingHandler = Arc<dyn Fn() + Send + Sync>;

/// Journal copy taken under the lock for observers
enum Outstanding {
    Renames(RenameJournal),
    CurrentStates(CurrentStateJournal),
}

/// Live subscriptions of one session
pub struct SubscriptionRouter {
    client: Arc<dyn RemoteClient>,
    subscriptions: Mutex<Vec<(Topic, SubscriptionId)>>,
}

impl SubscriptionRouter {
    /// Topics bound for a capability mode
    pub fn topics(mode: CapabilityMode) -> Vec<Topic> {
        Topic::ALL
            .into_iter()
            .filter(|topic| match topic {
                Topic::CurrentStateChanged => mode.has_live_current_state(),
                _ => true,
            })
            .collect()
    }

    /// Subscribe every topic of `mode`
    ///
    /// When a subscription fails, the ones already made are released before
    /// the error is returned.
    pub fn bind(
        client: Arc<dyn RemoteClient>,
        reconciler: Reconciler,
        listeners: Arc<ListenerRegistry>,
        on_closing: ClosingHandler,
    ) -> WsbResult<Self> {
        let router = SubscriptionRouter {
            client: Arc::clone(&client),
            subscriptions: Mutex::new(Vec::new()),
        };

        for topic in Self::topics(reconciler.mode()) {
            let sink = Self::sink(reconciler.clone(), Arc::clone(&listeners), Arc::clone(&on_closing));
            match client.subscribe(topic, sink) {
                Ok(id) => router.subscriptions.lock().push((topic, id)),
                Err(e) => {
                    tracing::warn!(%topic, error = %e, "subscribe failed");
                    router.unbind();
                    return Err(e);
                }
            }
        }

        tracing::debug!(
            topics = router.subscriptions.lock().len(),
            mode = ?reconciler.mode(),
            "router bound"
        );
        Ok(router)
    }

    fn sink(
        reconciler: Reconciler,
        listeners: Arc<ListenerRegistry>,
        on_closing: ClosingHandler,
    ) -> NotificationSink {
        Arc::new(move |event: RemoteEvent| {
            Self::route(&reconciler, &listeners, on_closing.as_ref(), event)
        })
    }

    fn route(
        reconciler: &Reconciler,
        listeners: &ListenerRegistry,
        on_closing: &(dyn Fn() + Send + Sync),
        event: RemoteEvent,
    ) {
        if let RemoteEvent::SessionClosing(_) = event {
            tracing::info!("remote session closing");
            on_closing();
            return;
        }

        let outstanding = {
            let mut state = reconciler.state().lock();
            match state.apply_event(&event) {
                Ok(Some(JournalKind::Renames)) => {
                    Outstanding::Renames(state.journal.renames().clone())
                }
                Ok(Some(JournalKind::CurrentStates)) => {
                    Outstanding::CurrentStates(state.journal.current_states().clone())
                }
                Ok(None) => return,
                Err(e) if e.is_stale_reference() => {
                    tracing::warn!(topic = %event.topic(), error = %e, "notification ignored");
                    return;
                }
                Err(e) => {
                    tracing::error!(topic = %event.topic(), error = %e, "notification failed");
                    return;
                }
            }
        };

        tracing::debug!(topic = %event.topic(), group = ?event.group(), "notification applied");
        match outstanding {
            Outstanding::Renames(renames) => {
                listeners.notify(|l| l.on_renames_pending(reconciler, &renames))
            }
            Outstanding::CurrentStates(changes) => {
                listeners.notify(|l| l.on_current_state_pending(reconciler, &changes))
            }
        }
    }

    pub fn topics_bound(&self) -> Vec<Topic> {
        self.subscriptions.lock().iter().map(|(t, _)| *t).collect()
    }

    /// Release every subscription; failures are logged
    pub fn unbind(&self) {
        let subscriptions = std::mem::take(&mut *self.subscriptions.lock());
        for (topic, id) in subscriptions {
            if let Err(e) = self.client.unsubscribe(id) {
                tracing::warn!(%topic, ?id, error = %e, "unsubscribe failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use wsb_core::{Connector, GroupId};
    use wsb_state::{SessionState, StateMirror};
    use wsb_test::SimulatedRemote;

    use crate::SessionListener;

    #[derive(Default)]
    struct Counting {
        renames: AtomicUsize,
        current: AtomicUsize,
    }

    impl SessionListener for Counting {
        fn on_renames_pending(&self, _reconciler: &Reconciler, _renames: &RenameJournal) {
            self.renames.fetch_add(1, Ordering::SeqCst);
        }

        fn on_current_state_pending(
            &self,
            _reconciler: &Reconciler,
            _changes: &CurrentStateJournal,
        ) {
            self.current.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn bind(
        remote: &SimulatedRemote,
        mode: CapabilityMode,
        listener: Arc<Counting>,
        on_closing: ClosingHandler,
    ) -> (SubscriptionRouter, Reconciler) {
        let client = remote.open("ws://local").unwrap();
        let mirror = StateMirror::build_snapshot(client.as_ref(), mode).unwrap();
        let reconciler = Reconciler::new(SessionState::new(mirror, mode).into_shared(), Arc::clone(&client));
        let listeners = Arc::new(ListenerRegistry::new());
        listeners.register(listener);
        let router = SubscriptionRouter::bind(client, reconciler.clone(), listeners, on_closing).unwrap();
        (router, reconciler)
    }

    #[test]
    fn test_restricted_mode_skips_current_state_topic() {
        assert_eq!(
            SubscriptionRouter::topics(CapabilityMode::Restricted),
            vec![Topic::NameChanged, Topic::ProjectClosing]
        );
        assert_eq!(SubscriptionRouter::topics(CapabilityMode::Full).len(), 3);
    }

    #[test]
    fn test_notifications_update_mirror_and_observers() {
        let remote = SimulatedRemote::new();
        let g = remote.add_group("\\A\\Ambience", &["On", "Off"], Some("Off"));
        let listener = Arc::new(Counting::default());
        let (_router, reconciler) =
            bind(&remote, CapabilityMode::Full, listener.clone(), Arc::new(|| {}));

        remote.change_current(&g, "On");
        remote.rename_group(&g, "\\A\\Weather");

        let snapshot = reconciler.snapshot();
        assert_eq!(snapshot[0].current.as_deref(), Some("On"));
        assert_eq!(snapshot[0].path, "\\A\\Weather");
        assert_eq!(listener.current.load(Ordering::SeqCst), 1);
        assert_eq!(listener.renames.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stale_notification_is_ignored() {
        let remote = SimulatedRemote::new();
        remote.add_group("\\A", &["On", "Off"], Some("Off"));
        let listener = Arc::new(Counting::default());
        let (_router, reconciler) =
            bind(&remote, CapabilityMode::Full, listener.clone(), Arc::new(|| {}));

        remote.emit(RemoteEvent::state_renamed(GroupId::new("ghost"), "{S}", "A", "B"));

        assert!(reconciler.renames().is_empty());
        assert_eq!(listener.renames.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_closing_invokes_handler_and_unbind_releases_topics() {
        let remote = SimulatedRemote::new();
        let closed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&closed);
        let (router, _reconciler) = bind(
            &remote,
            CapabilityMode::Full,
            Arc::new(Counting::default()),
            Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        assert_eq!(remote.subscription_count(), 3);

        remote.close_project();
        assert_eq!(closed.load(Ordering::SeqCst), 1);

        router.unbind();
        assert_eq!(remote.subscription_count(), 0);
        assert!(router.topics_bound().is_empty());
    }
}
