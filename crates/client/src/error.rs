//! Error types for the engine client.

use crate::AuthError;
use std::time::Duration;
use thiserror::Error;

/// The result of an engine client call.
pub type EngineClientResult<T> = Result<T, EngineClientError>;

/// Errors surfaced by the engine client.
///
/// Every variant carries owned data so an error can be stored next to the request that
/// produced it and compared in assertions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineClientError {
    /// A required startup input is missing or malformed.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The request never completed at the network level.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The node answered with a JSON-RPC error object.
    #[error("JSON-RPC error (code {code}): {message}")]
    JsonRpc {
        /// The JSON-RPC error code.
        code: i64,
        /// The error message returned by the node.
        message: String,
    },

    /// The node answered, but the response could not be decoded.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The request parameters could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The node serviced the lookup successfully but had nothing to return.
    #[error("Not found")]
    NotFound,

    /// The block returned by the node does not carry a `totalDifficulty` field.
    #[error("Block response is missing the totalDifficulty field")]
    MissingTotalDifficulty,

    /// A bearer token could not be minted, so the privileged call was never sent.
    #[error("Authorization error: {0}")]
    Authorization(#[from] AuthError),

    /// The call did not complete within the configured deadline.
    #[error("Call timed out after {0:?}")]
    Timeout(Duration),

    /// The call was abandoned because the client's cancellation token fired.
    #[error("Call cancelled")]
    Cancelled,
}

impl EngineClientError {
    /// Returns true if the error originated at the network or RPC layer.
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::JsonRpc { .. } | Self::InvalidResponse(_) | Self::Timeout(_)
        )
    }
}

impl From<reqwest::Error> for EngineClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for EngineClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}
