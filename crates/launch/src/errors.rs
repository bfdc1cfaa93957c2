//! Errors raised while resolving launch parameters.

use hive_engine_client::EngineClientError;
use std::path::PathBuf;
use thiserror::Error;

/// A [`Result`] alias for launch parameter resolution.
pub type LaunchResult<T> = Result<T, LaunchError>;

/// Why a client could not be launched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LaunchError {
    /// No client type was configured and none is available.
    #[error("Client type was not supplied and no client types are available")]
    NoClientTypes,
    /// The files map carries no genesis file.
    #[error("Cannot start without genesis file")]
    MissingGenesis,
    /// The terminal total difficulty parameter is not a base-10 integer.
    #[error("Unable to parse TTD from parameters: {0}")]
    InvalidTerminalTotalDifficulty(String),
    /// The genesis file could not be read or does not carry a usable difficulty.
    #[error("Invalid genesis file {path}: {reason}")]
    InvalidGenesis {
        /// Local path of the genesis file.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },
    /// Applying the offset to the genesis difficulty left the `U256` range.
    #[error("Terminal total difficulty offset {offset} overflows genesis difficulty")]
    TerminalTotalDifficultyOverflow {
        /// The configured offset.
        offset: i64,
    },
    /// A boot client does not expose an enode URL.
    #[error("Unable to obtain bootnode from client {0}")]
    MissingBootnode(String),
}

impl From<LaunchError> for EngineClientError {
    fn from(err: LaunchError) -> Self {
        Self::Configuration(err.to_string())
    }
}
