//! Simulated remote application
//!
//! Holds a small in-memory project (state groups, states, current states),
//! answers the `RemoteClient` calls from it, and pushes notifications to
//! subscribers when the test mutates it. Deliveries are serialized so that
//! handlers observe the same one-at-a-time ordering a real client provides.
//! An event emitted from inside a handler (the echo of a `set_state` issued
//! by a listener) is queued and delivered once that handler returns.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use wsb_core::{
    Connector, GroupId, NotificationSink, ObjectId, ObjectRecord, ProjectDescriptor, RemoteClient,
    RemoteEvent, RemoteInfo, RemoteVersion, SubscriptionId, Topic, WsbError, WsbResult,
};

use crate::random_guid;

/// A remote call observed by the simulation
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemoteCall {
    Open,
    Info,
    Project,
    ListStateGroups,
    ListStates(GroupId),
    CurrentState(GroupId),
    SetState(GroupId, String),
    Subscribe(Topic),
    Unsubscribe(SubscriptionId),
    Close,
}

#[derive(Clone, Debug)]
struct SimState {
    id: ObjectId,
    name: String,
}

#[derive(Clone, Debug)]
struct SimGroup {
    id: GroupId,
    path: String,
    states: Vec<SimState>,
    current: Option<String>,
}

struct World {
    project: ProjectDescriptor,
    version: RemoteVersion,
    /// Groups in remote enumeration order
    groups: Vec<SimGroup>,
    reachable: bool,
    connected: bool,
    failing_queries: HashSet<GroupId>,
    failing_set_state: HashSet<GroupId>,
    reject_all_set_state: bool,
    subscriptions: Vec<(SubscriptionId, Topic, NotificationSink)>,
    next_subscription: u64,
    calls: Vec<RemoteCall>,
    rng: StdRng,
}

impl World {
    fn group(&self, id: &GroupId) -> WsbResult<&SimGroup> {
        self.groups
            .iter()
            .find(|g| &g.id == id)
            .ok_or_else(|| WsbError::RemoteCall {
                uri: "object.get".into(),
                reason: format!("no such object {}", id),
            })
    }

    fn group_mut(&mut self, id: &GroupId) -> Option<&mut SimGroup> {
        self.groups.iter_mut().find(|g| &g.id == id)
    }

    fn ensure_connected(&self) -> WsbResult<()> {
        if self.connected {
            Ok(())
        } else {
            Err(WsbError::NotConnected)
        }
    }
}

#[derive(Default)]
struct Delivery {
    queue: VecDeque<RemoteEvent>,
    /// Some caller is draining the queue
    draining: bool,
}

/// In-memory remote application
#[derive(Clone)]
pub struct SimulatedRemote {
    world: Arc<Mutex<World>>,
    /// Serializes deliveries: one handler at a time, in emit order
    delivery: Arc<Mutex<Delivery>>,
}

impl SimulatedRemote {
    pub fn new() -> Self {
        Self::with_seed(42)
    }

    pub fn with_seed(seed: u64) -> Self {
        SimulatedRemote {
            world: Arc::new(Mutex::new(World {
                project: ProjectDescriptor {
                    name: "Sample".into(),
                    file_path: "C:\\Projects\\Sample\\Sample.wproj".into(),
                },
                version: RemoteVersion {
                    year: 2023,
                    major: 1,
                    minor: 0,
                    build: 8367,
                },
                groups: Vec::new(),
                reachable: true,
                connected: false,
                failing_queries: HashSet::new(),
                failing_set_state: HashSet::new(),
                reject_all_set_state: false,
                subscriptions: Vec::new(),
                next_subscription: 1,
                calls: Vec::new(),
                rng: StdRng::seed_from_u64(seed),
            })),
            delivery: Arc::new(Mutex::new(Delivery::default())),
        }
    }

    // ------------------------------------------------------------------
    // Fixture setup
    // ------------------------------------------------------------------

    /// Add a group with a generated GUID
    pub fn add_group(&self, path: &str, states: &[&str], current: Option<&str>) -> GroupId {
        let id = {
            let mut world = self.world.lock();
            GroupId::new(random_guid(&mut world.rng))
        };
        self.add_group_with_id(id.clone(), path, states, current);
        id
    }

    pub fn add_group_with_id(
        &self,
        id: GroupId,
        path: &str,
        states: &[&str],
        current: Option<&str>,
    ) {
        let mut world = self.world.lock();
        let states = states
            .iter()
            .map(|name| SimState {
                id: ObjectId::new(random_guid(&mut world.rng)),
                name: (*name).to_string(),
            })
            .collect();
        world.groups.push(SimGroup {
            id,
            path: path.to_string(),
            states,
            current: current.map(str::to_string),
        });
    }

    /// Shuffle the order in which groups are enumerated
    pub fn shuffle_enumeration(&self) {
        let mut world = self.world.lock();
        let World { groups, rng, .. } = &mut *world;
        groups.shuffle(rng);
    }

    pub fn set_project(&self, name: &str, file_path: &str) {
        self.world.lock().project = ProjectDescriptor {
            name: name.into(),
            file_path: file_path.into(),
        };
    }

    pub fn set_version_year(&self, year: u32) {
        self.world.lock().version.year = year;
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.world.lock().reachable = reachable;
    }

    /// Make state/current-state queries for `group` fail
    pub fn fail_queries_for(&self, group: &GroupId) {
        self.world.lock().failing_queries.insert(group.clone());
    }

    /// Make set-state calls for `group` fail
    pub fn reject_set_state_for(&self, group: &GroupId) {
        self.world.lock().failing_set_state.insert(group.clone());
    }

    pub fn reject_all_set_state(&self) {
        self.world.lock().reject_all_set_state = true;
    }

    /// Drop a group without notifying anyone
    pub fn remove_group(&self, group: &GroupId) {
        self.world.lock().groups.retain(|g| &g.id != group);
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.world.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.world.lock().calls.clear();
    }

    pub fn set_state_calls(&self) -> Vec<(GroupId, String)> {
        self.world
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                RemoteCall::SetState(g, s) => Some((g.clone(), s.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn subscription_count(&self) -> usize {
        self.world.lock().subscriptions.len()
    }

    pub fn subscribed_topics(&self) -> Vec<Topic> {
        self.world
            .lock()
            .subscriptions
            .iter()
            .map(|(_, topic, _)| *topic)
            .collect()
    }

    pub fn remote_current(&self, group: &GroupId) -> Option<String> {
        self.world
            .lock()
            .groups
            .iter()
            .find(|g| &g.id == group)
            .and_then(|g| g.current.clone())
    }

    pub fn state_id(&self, group: &GroupId, name: &str) -> Option<ObjectId> {
        self.world
            .lock()
            .groups
            .iter()
            .find(|g| &g.id == group)
            .and_then(|g| g.states.iter().find(|s| s.name == name))
            .map(|s| s.id.clone())
    }

    // ------------------------------------------------------------------
    // Remote-side mutations (each pushes the matching notification)
    // ------------------------------------------------------------------

    pub fn rename_group(&self, group: &GroupId, new_path: &str) {
        if let Some(g) = self.world.lock().group_mut(group) {
            g.path = new_path.to_string();
        }
        self.emit(RemoteEvent::group_renamed(group.clone(), new_path));
    }

    /// Rename a state; returns its object id
    pub fn rename_state(&self, group: &GroupId, old_name: &str, new_name: &str) -> Option<ObjectId> {
        let state = {
            let mut world = self.world.lock();
            let g = world.group_mut(group)?;
            let state = g.states.iter_mut().find(|s| s.name == old_name)?;
            state.name = new_name.to_string();
            let id = state.id.clone();
            if g.current.as_deref() == Some(old_name) {
                g.current = Some(new_name.to_string());
            }
            id
        };
        self.emit(RemoteEvent::state_renamed(
            group.clone(),
            state.clone(),
            old_name,
            new_name,
        ));
        Some(state)
    }

    pub fn change_current(&self, group: &GroupId, state: &str) {
        let state_id = {
            let mut world = self.world.lock();
            match world.group_mut(group) {
                Some(g) => {
                    g.current = Some(state.to_string());
                    g.states.iter().find(|s| s.name == state).map(|s| s.id.clone())
                }
                None => None,
            }
        };
        self.emit(RemoteEvent::CurrentStateChanged(
            wsb_core::CurrentStateChangedEvent {
                group: group.clone(),
                state: state_id,
                state_name: state.to_string(),
            },
        ));
    }

    pub fn close_project(&self) {
        self.emit(RemoteEvent::session_closing());
    }

    /// Deliver an event to every subscriber of its topic
    ///
    /// Returns once the event is delivered, unless another caller (possibly
    /// an enclosing handler on this thread) is already draining the queue;
    /// that caller then delivers it after the events queued before it.
    pub fn emit(&self, event: RemoteEvent) {
        {
            let mut delivery = self.delivery.lock();
            delivery.queue.push_back(event);
            if delivery.draining {
                return;
            }
            delivery.draining = true;
        }

        loop {
            let event = {
                let mut delivery = self.delivery.lock();
                match delivery.queue.pop_front() {
                    Some(event) => event,
                    None => {
                        delivery.draining = false;
                        return;
                    }
                }
            };
            self.deliver(&event);
        }
    }

    fn deliver(&self, event: &RemoteEvent) {
        let sinks: Vec<NotificationSink> = {
            let world = self.world.lock();
            world
                .subscriptions
                .iter()
                .filter(|(_, topic, _)| *topic == event.topic())
                .map(|(_, _, sink)| Arc::clone(sink))
                .collect()
        };
        tracing::trace!(topic = %event.topic(), subscribers = sinks.len(), "simulated emit");
        for sink in sinks {
            sink(event.clone());
        }
    }

    fn record(&self, call: RemoteCall) {
        self.world.lock().calls.push(call);
    }
}

impl Default for SimulatedRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for SimulatedRemote {
    fn open(&self, url: &str) -> WsbResult<Arc<dyn RemoteClient>> {
        let mut world = self.world.lock();
        world.calls.push(RemoteCall::Open);
        if !world.reachable {
            return Err(WsbError::ConnectionUnavailable(format!(
                "cannot reach {}",
                url
            )));
        }
        world.connected = true;
        drop(world);
        Ok(Arc::new(self.clone()))
    }
}

impl RemoteClient for SimulatedRemote {
    fn info(&self) -> WsbResult<RemoteInfo> {
        self.record(RemoteCall::Info);
        let world = self.world.lock();
        world.ensure_connected()?;
        Ok(RemoteInfo {
            version: world.version,
        })
    }

    fn project(&self) -> WsbResult<ProjectDescriptor> {
        self.record(RemoteCall::Project);
        let world = self.world.lock();
        world.ensure_connected()?;
        Ok(world.project.clone())
    }

    fn list_state_groups(&self) -> WsbResult<Vec<ObjectRecord>> {
        self.record(RemoteCall::ListStateGroups);
        let world = self.world.lock();
        world.ensure_connected()?;
        Ok(world
            .groups
            .iter()
            .map(|g| ObjectRecord {
                id: ObjectId::new(g.id.as_str()),
                name: wsb_core::leaf_name(&g.path).to_string(),
                path: g.path.clone(),
                parent: None,
            })
            .collect())
    }

    fn list_states(&self, group: &GroupId) -> WsbResult<Vec<ObjectRecord>> {
        self.record(RemoteCall::ListStates(group.clone()));
        let world = self.world.lock();
        world.ensure_connected()?;
        if world.failing_queries.contains(group) {
            return Err(WsbError::RemoteCall {
                uri: "object.get".into(),
                reason: "simulated failure".into(),
            });
        }
        let g = world.group(group)?;
        Ok(g.states
            .iter()
            .map(|s| ObjectRecord {
                id: s.id.clone(),
                name: s.name.clone(),
                path: format!("{}\\{}", g.path, s.name),
                parent: Some(ObjectId::new(g.id.as_str())),
            })
            .collect())
    }

    fn current_state(&self, group: &GroupId) -> WsbResult<Option<ObjectRecord>> {
        self.record(RemoteCall::CurrentState(group.clone()));
        let world = self.world.lock();
        world.ensure_connected()?;
        if world.failing_queries.contains(group) {
            return Err(WsbError::RemoteCall {
                uri: "getState".into(),
                reason: "simulated failure".into(),
            });
        }
        let g = world.group(group)?;
        Ok(g.current.as_ref().and_then(|name| {
            g.states.iter().find(|s| &s.name == name).map(|s| ObjectRecord {
                id: s.id.clone(),
                name: s.name.clone(),
                path: format!("{}\\{}", g.path, s.name),
                parent: Some(ObjectId::new(g.id.as_str())),
            })
        }))
    }

    fn set_state(&self, group: &GroupId, state: &str) -> WsbResult<()> {
        self.record(RemoteCall::SetState(group.clone(), state.to_string()));
        {
            let mut world = self.world.lock();
            world.ensure_connected()?;
            if world.reject_all_set_state || world.failing_set_state.contains(group) {
                return Err(WsbError::RemoteCall {
                    uri: "setState".into(),
                    reason: "simulated rejection".into(),
                });
            }
            let g = world.group_mut(group).ok_or_else(|| WsbError::RemoteCall {
                uri: "setState".into(),
                reason: format!("no such state group {}", group),
            })?;
            if !g.states.iter().any(|s| s.name == state) {
                return Err(WsbError::RemoteCall {
                    uri: "setState".into(),
                    reason: format!("no such state {}", state),
                });
            }
        }
        // The remote echoes accepted changes on its current-state topic.
        self.change_current(group, state);
        Ok(())
    }

    fn subscribe(&self, topic: Topic, sink: NotificationSink) -> WsbResult<SubscriptionId> {
        let mut world = self.world.lock();
        world.calls.push(RemoteCall::Subscribe(topic));
        world.ensure_connected()?;
        let id = SubscriptionId::new(world.next_subscription);
        world.next_subscription += 1;
        world.subscriptions.push((id, topic, sink));
        Ok(id)
    }

    fn unsubscribe(&self, subscription: SubscriptionId) -> WsbResult<()> {
        let mut world = self.world.lock();
        world.calls.push(RemoteCall::Unsubscribe(subscription));
        let before = world.subscriptions.len();
        world.subscriptions.retain(|(id, _, _)| *id != subscription);
        if world.subscriptions.len() == before {
            return Err(WsbError::RemoteCall {
                uri: "unsubscribe".into(),
                reason: format!("unknown subscription {:?}", subscription),
            });
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.world.lock().connected
    }

    fn close(&self) {
        let mut world = self.world.lock();
        world.calls.push(RemoteCall::Close);
        world.connected = false;
        world.subscriptions.clear();
    }
}
