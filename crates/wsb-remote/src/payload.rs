//! WAAPI response and notification payloads
//!
//! Responses carry their items under `return`. Push payloads arrive as the
//! keyword arguments of the topic; each decodes into one typed `RemoteEvent`.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use wsb_core::{
    CurrentStateChangedEvent, GroupId, GroupRenamedEvent, ObjectId, ObjectRecord,
    ProjectDescriptor, RemoteEvent, RemoteInfo, RemoteVersion, StateRenamedEvent, WsbError,
    WsbResult,
};

use crate::uri;

/// Object fields as returned by `ak.wwise.core.object.get`
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaapiObject {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub parent: Option<WaapiRef>,
    #[serde(default)]
    pub file_path: String,
}

/// Reference to another object inside a payload
#[derive(Clone, Debug, Default, Deserialize)]
pub struct WaapiRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl From<WaapiObject> for ObjectRecord {
    fn from(o: WaapiObject) -> Self {
        ObjectRecord {
            id: ObjectId::new(o.id),
            name: o.name,
            path: o.path,
            parent: o.parent.map(|p| ObjectId::new(p.id)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReturnList {
    #[serde(rename = "return", default)]
    items: Vec<WaapiObject>,
}

#[derive(Debug, Deserialize)]
struct ReturnOne {
    #[serde(rename = "return", default)]
    item: Option<WaapiObject>,
}

#[derive(Debug, Deserialize)]
struct InfoResponse {
    version: VersionPayload,
}

#[derive(Debug, Deserialize)]
struct VersionPayload {
    year: u32,
    #[serde(default)]
    major: u32,
    #[serde(default)]
    minor: u32,
    #[serde(default)]
    build: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NameChangedPayload {
    object: WaapiObject,
    #[serde(default)]
    old_name: String,
    #[serde(default)]
    new_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StateChangedPayload {
    state_group: WaapiRef,
    state: WaapiObject,
}

fn decode<T: DeserializeOwned>(what: &str, value: Value) -> WsbResult<T> {
    serde_json::from_value(value).map_err(|e| WsbError::Decode(format!("{}: {}", what, e)))
}

pub fn decode_info(value: Value) -> WsbResult<RemoteInfo> {
    let info: InfoResponse = decode(uri::GET_INFO, value)?;
    Ok(RemoteInfo {
        version: RemoteVersion {
            year: info.version.year,
            major: info.version.major,
            minor: info.version.minor,
            build: info.version.build,
        },
    })
}

pub fn decode_project(value: Value) -> WsbResult<ProjectDescriptor> {
    let list: ReturnList = decode(uri::OBJECT_GET, value)?;
    let project = list
        .items
        .into_iter()
        .next()
        .ok_or_else(|| WsbError::Decode("no project is open".into()))?;
    Ok(ProjectDescriptor {
        name: project.name,
        file_path: project.file_path,
    })
}

pub fn decode_objects(value: Value) -> WsbResult<Vec<ObjectRecord>> {
    let list: ReturnList = decode(uri::OBJECT_GET, value)?;
    Ok(list.items.into_iter().map(ObjectRecord::from).collect())
}

/// An empty or missing name means the current state is unknown
pub fn decode_current_state(value: Value) -> WsbResult<Option<ObjectRecord>> {
    let one: ReturnOne = decode(uri::GET_STATE, value)?;
    Ok(one
        .item
        .filter(|o| !o.name.is_empty())
        .map(ObjectRecord::from))
}

/// Decode a name-changed payload
///
/// Renames of anything other than state groups and states yield `None`.
pub fn decode_name_changed(value: Value) -> WsbResult<Option<RemoteEvent>> {
    let payload: NameChangedPayload = decode(uri::NAME_CHANGED, value)?;
    let object = payload.object;
    match object.kind.as_str() {
        uri::TYPE_STATE_GROUP => Ok(Some(RemoteEvent::GroupRenamed(GroupRenamedEvent {
            group: GroupId::new(object.id),
            new_path: object.path,
        }))),
        uri::TYPE_STATE => {
            let parent = object.parent.ok_or_else(|| {
                WsbError::Decode(format!("state {} renamed without parent", object.id))
            })?;
            Ok(Some(RemoteEvent::StateRenamed(StateRenamedEvent {
                group: GroupId::new(parent.id),
                state: ObjectId::new(object.id),
                old_name: payload.old_name,
                new_name: payload.new_name,
            })))
        }
        _ => Ok(None),
    }
}

pub fn decode_state_changed(value: Value) -> WsbResult<RemoteEvent> {
    let payload: StateChangedPayload = decode(uri::STATE_CHANGED, value)?;
    let state = (!payload.state.id.is_empty()).then(|| ObjectId::new(payload.state.id.clone()));
    Ok(RemoteEvent::CurrentStateChanged(CurrentStateChangedEvent {
        group: GroupId::new(payload.state_group.id),
        state,
        state_name: payload.state.name,
    }))
}
