//! `RemoteClient` implemented over a WAAPI JSON connection

use std::sync::Arc;

use serde_json::{json, Value};

use wsb_core::{
    Connector, GroupId, NotificationSink, ObjectRecord, ProjectDescriptor, RemoteClient,
    RemoteEvent, RemoteInfo, SubscriptionId, Topic, WsbResult,
};

use crate::payload::{
    decode_current_state, decode_info, decode_name_changed, decode_objects, decode_project,
    decode_state_changed,
};
use crate::{uri, JsonCallback, JsonConnector, JsonRpc, SequentialExecutor};

/// WAAPI session
pub struct WaapiClient {
    rpc: Arc<dyn JsonRpc>,
    executor: Option<SequentialExecutor>,
}

impl WaapiClient {
    pub fn new(rpc: Arc<dyn JsonRpc>) -> Self {
        WaapiClient {
            rpc,
            executor: None,
        }
    }

    /// Route every notification through `executor`
    pub fn with_executor(mut self, executor: SequentialExecutor) -> Self {
        self.executor = Some(executor);
        self
    }

    fn call(&self, function: &str, args: Value, options: Value) -> WsbResult<Value> {
        tracing::trace!(uri = function, %args, "waapi call");
        Ok(self.rpc.call(function, args, options)?)
    }

    fn topic_uri(topic: Topic) -> &'static str {
        match topic {
            Topic::NameChanged => uri::NAME_CHANGED,
            Topic::CurrentStateChanged => uri::STATE_CHANGED,
            Topic::ProjectClosing => uri::PROJECT_PRE_CLOSED,
        }
    }

    fn topic_options(topic: Topic) -> Value {
        match topic {
            Topic::NameChanged => json!({"return": ["type", "id", "name", "path", "parent"]}),
            Topic::CurrentStateChanged => json!({"return": ["id", "name", "path"]}),
            Topic::ProjectClosing => json!({}),
        }
    }

    fn decode_topic(topic: Topic, payload: Value) -> WsbResult<Option<RemoteEvent>> {
        match topic {
            Topic::NameChanged => decode_name_changed(payload),
            Topic::CurrentStateChanged => decode_state_changed(payload).map(Some),
            Topic::ProjectClosing => Ok(Some(RemoteEvent::session_closing())),
        }
    }
}

impl RemoteClient for WaapiClient {
    fn info(&self) -> WsbResult<RemoteInfo> {
        decode_info(self.call(uri::GET_INFO, json!({}), json!({}))?)
    }

    fn project(&self) -> WsbResult<ProjectDescriptor> {
        decode_project(self.call(
            uri::OBJECT_GET,
            json!({"from": {"ofType": [uri::TYPE_PROJECT]}}),
            json!({"return": ["name", "filePath"]}),
        )?)
    }

    fn list_state_groups(&self) -> WsbResult<Vec<ObjectRecord>> {
        decode_objects(self.call(
            uri::OBJECT_GET,
            json!({"from": {"ofType": [uri::TYPE_STATE_GROUP]}}),
            json!({"return": ["id", "path", "name"]}),
        )?)
    }

    fn list_states(&self, group: &GroupId) -> WsbResult<Vec<ObjectRecord>> {
        decode_objects(self.call(
            uri::OBJECT_GET,
            json!({
                "from": {"id": [group.as_str()]},
                "transform": [
                    {"select": ["children"]},
                    {"where": ["type:isIn", [uri::TYPE_STATE]]}
                ]
            }),
            json!({"return": ["id", "name", "path", "parent"]}),
        )?)
    }

    fn current_state(&self, group: &GroupId) -> WsbResult<Option<ObjectRecord>> {
        decode_current_state(self.call(
            uri::GET_STATE,
            json!({"stateGroup": group.as_str()}),
            json!({"return": ["id", "name"]}),
        )?)
    }

    fn set_state(&self, group: &GroupId, state: &str) -> WsbResult<()> {
        self.call(
            uri::SET_STATE,
            json!({"stateGroup": group.as_str(), "state": state}),
            json!({}),
        )?;
        Ok(())
    }

    fn subscribe(&self, topic: Topic, sink: NotificationSink) -> WsbResult<SubscriptionId> {
        let sink = match &self.executor {
            Some(executor) => executor.wrap(sink),
            None => sink,
        };
        let callback: JsonCallback = Arc::new(move |payload: Value| {
            match WaapiClient::decode_topic(topic, payload) {
                Ok(Some(event)) => sink(event),
                Ok(None) => tracing::trace!(%topic, "notification ignored"),
                Err(e) => tracing::warn!(%topic, error = %e, "undecodable notification dropped"),
            }
        });
        let id = self
            .rpc
            .subscribe(Self::topic_uri(topic), Self::topic_options(topic), callback)?;
        tracing::debug!(%topic, subscription = id, "subscribed");
        Ok(SubscriptionId::new(id))
    }

    fn unsubscribe(&self, subscription: SubscriptionId) -> WsbResult<()> {
        Ok(self.rpc.unsubscribe(subscription.0)?)
    }

    fn is_connected(&self) -> bool {
        self.rpc.is_connected()
    }

    fn close(&self) {
        self.rpc.disconnect();
    }
}

/// Opens `WaapiClient` sessions through a host-supplied JSON connector
pub struct WaapiConnector {
    connector: Arc<dyn JsonConnector>,
    executor: Option<SequentialExecutor>,
}

impl WaapiConnector {
    pub fn new(connector: Arc<dyn JsonConnector>) -> Self {
        WaapiConnector {
            connector,
            executor: None,
        }
    }

    pub fn with_executor(mut self, executor: SequentialExecutor) -> Self {
        self.executor = Some(executor);
        self
    }
}

impl Connector for WaapiConnector {
    fn open(&self, url: &str) -> WsbResult<Arc<dyn RemoteClient>> {
        let rpc = self.connector.connect(url)?;
        tracing::info!(url, "waapi connection opened");
        let mut client = WaapiClient::new(rpc);
        if let Some(executor) = &self.executor {
            client = client.with_executor(executor.clone());
        }
        Ok(Arc::new(client))
    }
}
