//! JSON call/subscribe primitive supplied by the host transport

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use wsb_core::WsbError;

/// Callback receiving the raw keyword payload of a topic
pub type JsonCallback = Arc<dyn Fn(Value) + Send + Sync>;

/// Transport-level failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RpcError {
    #[error("Cannot connect to {url}: {reason}")]
    CannotConnect { url: String, reason: String },

    #[error("{uri}: {message}")]
    CallFailed { uri: String, message: String },

    #[error("Connection closed")]
    Closed,
}

impl From<RpcError> for WsbError {
    fn from(e: RpcError) -> Self {
        match e {
            RpcError::CannotConnect { .. } => WsbError::ConnectionUnavailable(e.to_string()),
            RpcError::CallFailed { uri, message } => WsbError::RemoteCall {
                uri,
                reason: message,
            },
            RpcError::Closed => WsbError::NotConnected,
        }
    }
}

/// An open WAAPI connection
pub trait JsonRpc: Send + Sync {
    /// Blocking call; returns the response object
    fn call(&self, uri: &str, args: Value, options: Value) -> Result<Value, RpcError>;

    /// Returns a transport subscription handle
    fn subscribe(&self, uri: &str, options: Value, callback: JsonCallback) -> Result<u64, RpcError>;

    fn unsubscribe(&self, subscription: u64) -> Result<(), RpcError>;

    fn is_connected(&self) -> bool;

    fn disconnect(&self);
}

/// Opens WAAPI connections
pub trait JsonConnector: Send + Sync {
    fn connect(&self, url: &str) -> Result<Arc<dyn JsonRpc>, RpcError>;
}
