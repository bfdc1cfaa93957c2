//! Test helpers for building node responses.

pub use crate::transport::{MockReply, MockTransport, RecordedRequest};

use alloy_primitives::B256;
use alloy_rpc_types_eth::Header;

/// Builds the JSON body a node returns from `eth_getBlockByNumber` for a block with the given
/// number, parent and hash. All other header fields take their default values.
pub fn header_json(number: u64, parent_hash: B256, hash: B256) -> serde_json::Value {
    let header = Header {
        hash,
        inner: alloy_consensus::Header { number, parent_hash, ..Default::default() },
        total_difficulty: None,
        size: None,
    };
    serde_json::to_value(&header).expect("header serializes")
}
