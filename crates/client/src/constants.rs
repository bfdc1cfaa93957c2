//! Defaults and method names shared by the client and its launchers.

use std::time::Duration;

/// Default port of the authenticated engine endpoint.
pub const DEFAULT_ENGINE_PORT: u16 = 8551;

/// Default port of the public eth endpoint.
pub const DEFAULT_ETH_PORT: u16 = 8545;

/// Secret used to sign engine tokens when the launcher does not provide one.
pub const DEFAULT_JWT_SECRET: &[u8; 32] = b"secretsecretsecretsecretsecretse";

/// Upper bound on a single RPC round trip.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum distance between a token's `iat` claim and the verifier's clock.
pub const JWT_IAT_WINDOW: Duration = Duration::from_secs(60);

/// Client parameter carrying the terminal total difficulty.
pub const TERMINAL_TOTAL_DIFFICULTY_PARAM: &str = "HIVE_TERMINAL_TOTAL_DIFFICULTY";

/// Client parameter carrying the comma separated boot node list.
pub const BOOTNODE_PARAM: &str = "HIVE_BOOTNODE";

/// Engine API: update the canonical head, optionally start building.
pub const ENGINE_FORKCHOICE_UPDATED_V1: &str = "engine_forkchoiceUpdatedV1";
/// Engine API: fetch a payload that is being built.
pub const ENGINE_GET_PAYLOAD_V1: &str = "engine_getPayloadV1";
/// Engine API: submit a payload for validation.
pub const ENGINE_NEW_PAYLOAD_V1: &str = "engine_newPayloadV1";
/// Engine API: exchange the merge transition configuration.
pub const ENGINE_EXCHANGE_TRANSITION_CONFIGURATION_V1: &str =
    "engine_exchangeTransitionConfigurationV1";

/// Eth API: block (or header) by number or tag.
pub const ETH_GET_BLOCK_BY_NUMBER: &str = "eth_getBlockByNumber";
/// Eth API: account nonce at a block.
pub const ETH_GET_TRANSACTION_COUNT: &str = "eth_getTransactionCount";
