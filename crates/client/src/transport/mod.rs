//! JSON-RPC transports used by the engine client.

mod http;
pub use http::HttpTransport;

#[cfg(any(test, feature = "test-utils"))]
mod mock;
#[cfg(any(test, feature = "test-utils"))]
pub use mock::{MockReply, MockTransport, RecordedRequest};

use crate::{EngineClientError, EngineClientResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::fmt::Debug;

/// A transport for sending JSON-RPC requests to one endpoint of a node.
#[async_trait]
pub trait Transport: Debug + Send + Sync {
    /// Sends `request`, attaching `bearer` as an `Authorization: Bearer` header when present.
    async fn send(
        &self,
        request: &JsonRpcRequest,
        bearer: Option<&str>,
    ) -> EngineClientResult<JsonRpcResponse>;
}

/// A JSON-RPC request object.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    /// Always `"2.0"`.
    pub jsonrpc: &'static str,
    /// The method name.
    pub method: String,
    /// Positional parameters.
    pub params: serde_json::Value,
    /// The request id.
    pub id: u64,
}

impl JsonRpcRequest {
    /// Creates a new request with id 1.
    pub fn new(method: impl Into<String>, params: serde_json::Value) -> Self {
        Self { jsonrpc: "2.0", method: method.into(), params, id: 1 }
    }
}

/// A JSON-RPC response object.
///
/// The result is kept as raw JSON so callers can decode it more than once.
#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse {
    /// The protocol version echoed by the server.
    #[serde(default)]
    pub jsonrpc: String,
    /// The raw result. `None` when the server returned `null` or omitted the field.
    #[serde(default)]
    pub result: Option<Box<RawValue>>,
    /// The error object, if the call failed.
    #[serde(default)]
    pub error: Option<JsonRpcError>,
    /// The request id echoed by the server.
    #[serde(default)]
    pub id: serde_json::Value,
}

impl JsonRpcResponse {
    /// Splits the response into its raw result, turning an error object into
    /// [`EngineClientError::JsonRpc`].
    pub fn into_result(self) -> EngineClientResult<Option<Box<RawValue>>> {
        match self.error {
            Some(JsonRpcError { code, message }) => {
                Err(EngineClientError::JsonRpc { code, message })
            }
            None => Ok(self.result),
        }
    }
}

/// A JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// The error code.
    pub code: i64,
    /// The error message.
    pub message: String,
}
