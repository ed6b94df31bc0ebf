//! Connect, teardown and refresh as seen by observers

mod common;

use std::sync::Arc;

use wsb_core::{
    CapabilityMode, Connector, GroupId, NotificationSink, ObjectRecord, ProjectDescriptor,
    RemoteClient, RemoteInfo, SubscriptionId, Topic, WsbError, WsbResult,
};
use wsb_runtime::{ConnectionLifecycle, Phase, SessionConfig};
use wsb_test::{RemoteCall, SimulatedRemote};

use common::{session, Seen};

#[test]
fn test_connect_notifies_observers_with_snapshot() {
    let remote = SimulatedRemote::new();
    remote.set_project("Demo", "C:\\Demo\\Demo.wproj");
    remote.add_group("\\A", &["On", "Off"], Some("Off"));
    remote.add_group("\\B", &["Low", "High"], None);
    let (lifecycle, listener) = session(&remote);

    lifecycle.connect().unwrap();

    assert_eq!(
        listener.seen(),
        vec![Seen::Connected {
            project: "Demo".into(),
            groups: 2
        }]
    );
    assert_eq!(
        lifecycle.remote_info().unwrap().version.year,
        2023
    );
}

#[test]
fn test_unreachable_remote_reports_failure_only() {
    let remote = SimulatedRemote::new();
    remote.set_reachable(false);
    let (lifecycle, listener) = session(&remote);

    let err = lifecycle.connect().unwrap_err();

    assert!(matches!(err, WsbError::ConnectionUnavailable(_)));
    assert_eq!(listener.seen(), vec![Seen::ConnectionFailed(err)]);
    assert_eq!(lifecycle.phase(), Phase::Disconnected);

    remote.set_reachable(true);
    lifecycle.connect().unwrap();
    assert!(lifecycle.is_connected());
}

#[test]
fn test_restricted_mode_keeps_current_unknown() {
    let remote = SimulatedRemote::new();
    remote.set_version_year(2021);
    let g = remote.add_group("\\A", &["On", "Off"], Some("Off"));
    let (lifecycle, listener) = session(&remote);

    lifecycle.connect().unwrap();
    let reconciler = lifecycle.reconciler().unwrap();

    assert_eq!(reconciler.mode(), CapabilityMode::Restricted);
    assert!(!remote.subscribed_topics().contains(&Topic::CurrentStateChanged));
    assert!(!remote.calls().contains(&RemoteCall::CurrentState(g.clone())));
    assert_eq!(reconciler.snapshot()[0].current, None);

    // Any selection differs from an unknown current state.
    reconciler.stage_selection(&g, "Off").unwrap();
    reconciler.commit();
    assert_eq!(reconciler.snapshot()[0].current, None);
    assert_eq!(listener.count(|s| matches!(s, Seen::CurrentStates(_))), 0);
}

#[test]
fn test_restricted_threshold_is_configurable() {
    let remote = SimulatedRemote::new();
    remote.set_version_year(2021);
    let lifecycle = ConnectionLifecycle::new(
        Arc::new(remote.clone()),
        SessionConfig {
            min_live_state_year: 2019,
            ..SessionConfig::default()
        },
    );

    lifecycle.connect().unwrap();

    assert_eq!(lifecycle.reconciler().unwrap().mode(), CapabilityMode::Full);
    assert!(remote.subscribed_topics().contains(&Topic::CurrentStateChanged));
}

#[test]
fn test_session_closing_tears_down_once() {
    let remote = SimulatedRemote::new();
    let g = remote.add_group("\\A", &["On", "Off"], Some("Off"));
    let (lifecycle, listener) = session(&remote);
    lifecycle.connect().unwrap();
    let reconciler = lifecycle.reconciler().unwrap();
    reconciler.stage_selection(&g, "On").unwrap();

    remote.close_project();
    remote.close_project();
    lifecycle.disconnect();

    assert_eq!(listener.count(|s| *s == Seen::Disconnected), 1);
    assert_eq!(lifecycle.phase(), Phase::Disconnected);
    assert_eq!(remote.subscription_count(), 0);
    // Session data went with the session.
    assert!(reconciler.pending().is_empty());
    assert!(reconciler.snapshot().is_empty());
}

/// Remote that announces the project is closing as soon as that topic is bound
struct ClosesOnBind(SimulatedRemote);

impl Connector for ClosesOnBind {
    fn open(&self, url: &str) -> WsbResult<Arc<dyn RemoteClient>> {
        self.0.open(url)?;
        Ok(Arc::new(ClosesOnBind(self.0.clone())))
    }
}

impl RemoteClient for ClosesOnBind {
    fn info(&self) -> WsbResult<RemoteInfo> {
        self.0.info()
    }

    fn project(&self) -> WsbResult<ProjectDescriptor> {
        self.0.project()
    }

    fn list_state_groups(&self) -> WsbResult<Vec<ObjectRecord>> {
        self.0.list_state_groups()
    }

    fn list_states(&self, group: &GroupId) -> WsbResult<Vec<ObjectRecord>> {
        self.0.list_states(group)
    }

    fn current_state(&self, group: &GroupId) -> WsbResult<Option<ObjectRecord>> {
        self.0.current_state(group)
    }

    fn set_state(&self, group: &GroupId, state: &str) -> WsbResult<()> {
        self.0.set_state(group, state)
    }

    fn subscribe(&self, topic: Topic, sink: NotificationSink) -> WsbResult<SubscriptionId> {
        let id = self.0.subscribe(topic, sink)?;
        if topic == Topic::ProjectClosing {
            self.0.close_project();
        }
        Ok(id)
    }

    fn unsubscribe(&self, subscription: SubscriptionId) -> WsbResult<()> {
        self.0.unsubscribe(subscription)
    }

    fn is_connected(&self) -> bool {
        RemoteClient::is_connected(&self.0)
    }

    fn close(&self) {
        self.0.close()
    }
}

#[test]
fn test_closing_while_connecting_is_not_lost() {
    let remote = SimulatedRemote::new();
    remote.add_group("\\A", &["On", "Off"], Some("Off"));
    let lifecycle = ConnectionLifecycle::new(
        Arc::new(ClosesOnBind(remote.clone())),
        SessionConfig::default(),
    );
    let listener = common::RecordingListener::new();
    lifecycle.register_listener(listener.clone());

    lifecycle.connect().unwrap();

    assert_eq!(lifecycle.phase(), Phase::Disconnected);
    assert!(lifecycle.reconciler().is_none());
    assert_eq!(remote.subscription_count(), 0);
    assert_eq!(remote.calls().last(), Some(&RemoteCall::Close));
    assert_eq!(listener.seen(), vec![Seen::Disconnected]);

    // The next connect is not affected by the earlier request.
    let (plain, _) = session(&remote);
    plain.connect().unwrap();
    assert!(plain.is_connected());
}

#[test]
fn test_reconnect_builds_fresh_session() {
    let remote = SimulatedRemote::new();
    let g = remote.add_group("\\A", &["On", "Off"], Some("Off"));
    let (lifecycle, listener) = session(&remote);
    lifecycle.connect().unwrap();
    lifecycle.reconciler().unwrap().stage_selection(&g, "On").unwrap();
    lifecycle.disconnect();

    lifecycle.connect().unwrap();

    let reconciler = lifecycle.reconciler().unwrap();
    assert!(reconciler.pending().is_empty());
    assert_eq!(reconciler.snapshot().len(), 1);
    assert_eq!(remote.subscription_count(), 3);
    assert_eq!(listener.count(|s| matches!(s, Seen::Connected { .. })), 2);
}

#[test]
fn test_refresh_replaces_mirror_and_clears_session_logs() {
    let remote = SimulatedRemote::new();
    let g = remote.add_group("\\A", &["On", "Off"], Some("Off"));
    let (lifecycle, _listener) = session(&remote);
    lifecycle.connect().unwrap();
    let reconciler = lifecycle.reconciler().unwrap();
    reconciler.stage_selection(&g, "On").unwrap();
    remote.rename_group(&g, "\\Z");
    remote.add_group("\\B", &["Low"], Some("Low"));

    let snapshot = lifecycle.refresh().unwrap();

    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot[1].path, "\\Z");
    assert!(reconciler.pending().is_empty());
    assert!(reconciler.renames().is_empty());
    assert_eq!(reconciler.snapshot(), snapshot);
}

#[test]
fn test_failed_refresh_keeps_previous_mirror() {
    let remote = SimulatedRemote::new();
    let g = remote.add_group("\\A", &["On", "Off"], Some("Off"));
    let (lifecycle, _listener) = session(&remote);
    lifecycle.connect().unwrap();
    let reconciler = lifecycle.reconciler().unwrap();
    let before = reconciler.snapshot();
    reconciler.stage_selection(&g, "On").unwrap();
    remote.fail_queries_for(&g);

    let err = lifecycle.refresh().unwrap_err();

    assert!(matches!(err, WsbError::SnapshotBuildFailed(_)));
    assert_eq!(reconciler.snapshot(), before);
    assert!(reconciler.is_pending(&g));
}
