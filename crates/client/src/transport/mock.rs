//! A mock transport for testing the engine client.

use super::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, Transport};
use crate::{EngineClientError, EngineClientResult};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json, value::to_raw_value};
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;

/// A programmed reply for a single call.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Succeed with this result. [`Value::Null`] is returned as a `null` result.
    Result(Value),
    /// Answer with a JSON-RPC error object.
    RpcError {
        /// The error code.
        code: i64,
        /// The error message.
        message: String,
    },
    /// Fail at the transport level.
    Failure(String),
    /// Never answer.
    Hang,
}

/// A request observed by the [`MockTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// The method name.
    pub method: String,
    /// The positional parameters.
    pub params: Value,
    /// The bearer token attached to the request, if any.
    pub bearer: Option<String>,
}

/// A mock transport that can be programmed with expected replies for testing.
///
/// Replies are queued per method and consumed in order. Every request is recorded, including the
/// bearer token it carried.
#[derive(Debug, Default)]
pub struct MockTransport {
    replies: Mutex<HashMap<String, VecDeque<MockReply>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    /// Creates a new, empty mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `reply` for the next unanswered call to `method`.
    pub async fn push_reply(&self, method: impl Into<String>, reply: MockReply) {
        self.replies.lock().await.entry(method.into()).or_default().push_back(reply);
    }

    /// Queues a successful result for the next unanswered call to `method`.
    pub async fn push_result(&self, method: impl Into<String>, result: impl Serialize) {
        let value = serde_json::to_value(result).expect("mock result serializes");
        self.push_reply(method, MockReply::Result(value)).await;
    }

    /// Returns every request received so far.
    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().await.clone()
    }

    /// Returns how many requests were made to `method`.
    pub async fn calls_to(&self, method: &str) -> usize {
        self.requests.lock().await.iter().filter(|r| r.method == method).count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(
        &self,
        request: &JsonRpcRequest,
        bearer: Option<&str>,
    ) -> EngineClientResult<JsonRpcResponse> {
        self.requests.lock().await.push(RecordedRequest {
            method: request.method.clone(),
            params: request.params.clone(),
            bearer: bearer.map(str::to_string),
        });

        let reply = self
            .replies
            .lock()
            .await
            .get_mut(&request.method)
            .and_then(VecDeque::pop_front);

        let response = |result, error| JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            result,
            error,
            id: json!(request.id),
        };

        match reply {
            Some(MockReply::Result(Value::Null)) => Ok(response(None, None)),
            Some(MockReply::Result(value)) => Ok(response(Some(to_raw_value(&value)?), None)),
            Some(MockReply::RpcError { code, message }) => {
                Ok(response(None, Some(JsonRpcError { code, message })))
            }
            Some(MockReply::Failure(message)) => Err(EngineClientError::Transport(message)),
            Some(MockReply::Hang) => std::future::pending().await,
            None => Err(EngineClientError::Transport(format!(
                "MockTransport: received unexpected call to method '{}'",
                request.method
            ))),
        }
    }
}
