//! Session observers

use std::sync::Arc;

use parking_lot::Mutex;
use wsb_core::{ListenerToken, ProjectDescriptor, WsbError};
use wsb_state::{CurrentStateJournal, MirrorSnapshot, Reconciler, RenameJournal};

/// Observer of one session's lifecycle and remote changes
///
/// Every callback runs with no engine lock held, so implementations may call
/// back into the `Reconciler` (acknowledge, stage, commit).
pub trait SessionListener: Send + Sync {
    fn on_connected(
        &self,
        _project: &ProjectDescriptor,
        _snapshot: &MirrorSnapshot,
        _reconciler: &Reconciler,
    ) {
    }

    fn on_connection_failed(&self, _error: &WsbError) {}

    fn on_disconnected(&self) {}

    /// The whole outstanding rename journal, after each applied rename
    fn on_renames_pending(&self, _reconciler: &Reconciler, _renames: &RenameJournal) {}

    /// The whole outstanding current-state journal, after each applied change
    fn on_current_state_pending(
        &self,
        _reconciler: &Reconciler,
        _changes: &CurrentStateJournal,
    ) {
    }
}

/// Registered listeners, notified in registration order
#[derive(Default)]
pub struct ListenerRegistry {
    inner: Mutex<Registered>,
}

#[derive(Default)]
struct Registered {
    next_token: u64,
    listeners: Vec<(ListenerToken, Arc<dyn SessionListener>)>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, listener: Arc<dyn SessionListener>) -> ListenerToken {
        let mut inner = self.inner.lock();
        inner.next_token += 1;
        let token = ListenerToken(inner.next_token);
        inner.listeners.push((token, listener));
        token
    }

    /// Returns false when the token was not registered
    pub fn unregister(&self, token: ListenerToken) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.listeners.len();
        inner.listeners.retain(|(t, _)| *t != token);
        inner.listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.inner.lock().listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call `f` on every listener, outside the registry lock
    pub fn notify<F>(&self, f: F)
    where
        F: Fn(&dyn SessionListener),
    {
        let listeners: Vec<Arc<dyn SessionListener>> = self
            .inner
            .lock()
            .listeners
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            f(listener.as_ref());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl SessionListener for Named {
        fn on_disconnected(&self) {
            self.log.lock().push(self.name);
        }
    }

    #[test]
    fn test_notified_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ListenerRegistry::new();
        for name in ["first", "second", "third"] {
            registry.register(Arc::new(Named {
                name,
                log: Arc::clone(&log),
            }));
        }

        registry.notify(|l| l.on_disconnected());

        assert_eq!(*log.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_unregister() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ListenerRegistry::new();
        let a = registry.register(Arc::new(Named {
            name: "a",
            log: Arc::clone(&log),
        }));
        registry.register(Arc::new(Named {
            name: "b",
            log: Arc::clone(&log),
        }));

        assert!(registry.unregister(a));
        assert!(!registry.unregister(a));
        registry.notify(|l| l.on_disconnected());

        assert_eq!(*log.lock(), vec!["b"]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_listener_may_unregister_during_notify() {
        struct SelfRemoving {
            registry: Arc<ListenerRegistry>,
            token: Mutex<Option<ListenerToken>>,
        }
        impl SessionListener for SelfRemoving {
            fn on_disconnected(&self) {
                if let Some(token) = self.token.lock().take() {
                    self.registry.unregister(token);
                }
            }
        }

        let registry = Arc::new(ListenerRegistry::new());
        let listener = Arc::new(SelfRemoving {
            registry: Arc::clone(&registry),
            token: Mutex::new(None),
        });
        let token = registry.register(listener.clone());
        *listener.token.lock() = Some(token);

        registry.notify(|l| l.on_disconnected());
        assert!(registry.is_empty());
    }
}
