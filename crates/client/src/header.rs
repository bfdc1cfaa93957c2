//! Block header paired with the node's cumulative difficulty.

use crate::{EngineClientError, EngineClientResult};
use alloy_primitives::U256;
use alloy_rpc_types_eth::Header;
use serde::Deserialize;
use serde_json::value::RawValue;

/// The extra field some nodes attach to block responses.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TotalDifficulty {
    total_difficulty: Option<U256>,
}

/// A block header together with the `totalDifficulty` reported by the node.
///
/// The header shape tolerates the field being absent, so the response is decoded twice from the
/// same buffered body: once into the header and once into a shape that carries only the extra
/// field, which here is mandatory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotalDifficultyHeader {
    /// The standard header fields.
    pub header: Header,
    /// The cumulative difficulty of the chain up to and including this block.
    pub total_difficulty: U256,
}

impl TotalDifficultyHeader {
    /// Decodes a block response body.
    ///
    /// Fails with [`EngineClientError::MissingTotalDifficulty`] when the header decodes but the
    /// body carries no `totalDifficulty`, and with [`EngineClientError::InvalidResponse`] when the
    /// body is not a header at all.
    pub fn decode(raw: &RawValue) -> EngineClientResult<Self> {
        let header: Header = serde_json::from_str(raw.get())?;
        let TotalDifficulty { total_difficulty } = serde_json::from_str(raw.get())?;
        let total_difficulty = total_difficulty.ok_or(EngineClientError::MissingTotalDifficulty)?;
        Ok(Self { header, total_difficulty })
    }
}
