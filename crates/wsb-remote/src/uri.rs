//! WAAPI function and topic URIs

pub const DEFAULT_URL: &str = "ws://127.0.0.1:8080/waapi";

// Functions
pub const GET_INFO: &str = "ak.wwise.core.getInfo";
pub const OBJECT_GET: &str = "ak.wwise.core.object.get";
pub const GET_STATE: &str = "ak.soundengine.getState";
pub const SET_STATE: &str = "ak.soundengine.setState";

// Topics
pub const NAME_CHANGED: &str = "ak.wwise.core.object.nameChanged";
pub const STATE_CHANGED: &str = "ak.wwise.core.profiler.stateChanged";
pub const PROJECT_PRE_CLOSED: &str = "ak.wwise.core.project.preClosed";

// Object types
pub const TYPE_PROJECT: &str = "Project";
pub const TYPE_STATE_GROUP: &str = "StateGroup";
pub const TYPE_STATE: &str = "State";
