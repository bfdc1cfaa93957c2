//! Start parameter resolution.

use crate::{LaunchError, LaunchResult};
use alloy_primitives::U256;
use hive_engine_client::{
    ConnectionHandle, HiveEngineClient,
    constants::{
        BOOTNODE_PARAM, DEFAULT_ENGINE_PORT, DEFAULT_ETH_PORT, DEFAULT_JWT_SECRET,
        TERMINAL_TOTAL_DIFFICULTY_PARAM,
    },
};
use serde_json::Value;
use std::{collections::BTreeMap, path::Path, str::FromStr};

/// Container path of the genesis file.
pub const GENESIS_FILE_PATH: &str = "/genesis.json";

/// Container path of the chain to import.
pub const CHAIN_FILE_PATH: &str = "/chain.rlp";

/// Local directory chain files are resolved against.
pub const CHAINS_DIR: &str = "./chains";

/// Start options for an execution client. Anything left unset falls back to the environment or
/// the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientStarter {
    /// The client type to start. Defaults to the first available type.
    pub client_type: Option<String>,
    /// Chain file under [`CHAINS_DIR`] to import at startup.
    pub chain_file: Option<String>,
    /// Offset added to the genesis difficulty to obtain the terminal total difficulty.
    pub terminal_total_difficulty: Option<i64>,
    /// Engine endpoint port.
    pub engine_port: Option<u16>,
    /// Eth endpoint port.
    pub eth_port: Option<u16>,
    /// Shared engine secret.
    pub jwt_secret: Option<Vec<u8>>,
}

/// Everything needed to start the container and connect to it afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    /// The client type to start.
    pub client_type: String,
    /// Container environment parameters.
    pub params: BTreeMap<String, String>,
    /// Container path to local path of every file to mount.
    pub files: BTreeMap<String, String>,
    /// Engine endpoint port.
    pub engine_port: u16,
    /// Eth endpoint port.
    pub eth_port: u16,
    /// Shared engine secret.
    pub jwt_secret: Vec<u8>,
    /// The terminal total difficulty the node will run with, if known.
    pub terminal_total_difficulty: Option<U256>,
}

impl ClientStarter {
    /// Resolves the start parameters of a client.
    ///
    /// `params` and `files` are the parameters and files supplied by the simulator. Boot clients
    /// must all expose an enode URL; their URLs are passed to the new client as bootnodes.
    pub fn resolve(
        &self,
        available_client_types: &[String],
        mut params: BTreeMap<String, String>,
        mut files: BTreeMap<String, String>,
        boot_clients: &[&HiveEngineClient],
    ) -> LaunchResult<LaunchPlan> {
        let client_type = match &self.client_type {
            Some(client_type) => client_type.clone(),
            None => available_client_types.first().cloned().ok_or(LaunchError::NoClientTypes)?,
        };

        if let Some(chain_file) = &self.chain_file {
            files.insert(CHAIN_FILE_PATH.to_string(), format!("{CHAINS_DIR}/{chain_file}"));
        }
        let genesis = files.get(GENESIS_FILE_PATH).ok_or(LaunchError::MissingGenesis)?;

        let terminal_total_difficulty = match self.terminal_total_difficulty {
            None => params
                .get(TERMINAL_TOTAL_DIFFICULTY_PARAM)
                .map(|ttd| {
                    U256::from_str_radix(ttd, 10)
                        .map_err(|_| LaunchError::InvalidTerminalTotalDifficulty(ttd.clone()))
                })
                .transpose()?,
            Some(offset) => {
                let ttd = calculate_real_ttd(Path::new(genesis), offset)?;
                params.insert(TERMINAL_TOTAL_DIFFICULTY_PARAM.to_string(), ttd.to_string());
                Some(ttd)
            }
        };

        if !boot_clients.is_empty() {
            let enodes = boot_clients
                .iter()
                .map(|client| {
                    client
                        .enode_url()
                        .map(str::to_string)
                        .ok_or_else(|| LaunchError::MissingBootnode(client.id().to_string()))
                })
                .collect::<LaunchResult<Vec<_>>>()?;
            params.insert(BOOTNODE_PARAM.to_string(), enodes.join(","));
        }

        debug!(
            target: "launch",
            %client_type,
            ttd = ?terminal_total_difficulty,
            bootnodes = boot_clients.len(),
            "Resolved launch plan"
        );

        Ok(LaunchPlan {
            client_type,
            params,
            files,
            engine_port: self.engine_port.unwrap_or(DEFAULT_ENGINE_PORT),
            eth_port: self.eth_port.unwrap_or(DEFAULT_ETH_PORT),
            jwt_secret: self.jwt_secret.clone().unwrap_or_else(|| DEFAULT_JWT_SECRET.to_vec()),
            terminal_total_difficulty,
        })
    }
}

impl LaunchPlan {
    /// Builds the handle for the started container `id` reachable at `host`.
    pub fn connection_handle(
        &self,
        id: impl Into<String>,
        host: impl Into<String>,
        enode: Option<String>,
    ) -> ConnectionHandle {
        ConnectionHandle {
            engine_port: self.engine_port,
            eth_port: self.eth_port,
            jwt_secret: self.jwt_secret.clone(),
            terminal_total_difficulty: self.terminal_total_difficulty,
            enode,
            ..ConnectionHandle::new(id, host)
        }
    }
}

/// Reads the `difficulty` of the genesis file at `genesis_path` and adds `offset` to it.
///
/// The difficulty may be a JSON number or a string in any radix [`U256`] parses, such as
/// `"0x20000"`.
pub fn calculate_real_ttd(genesis_path: &Path, offset: i64) -> LaunchResult<U256> {
    let invalid = |reason: String| LaunchError::InvalidGenesis {
        path: genesis_path.to_path_buf(),
        reason,
    };

    let contents = std::fs::read_to_string(genesis_path).map_err(|e| invalid(e.to_string()))?;
    let genesis: Value = serde_json::from_str(&contents).map_err(|e| invalid(e.to_string()))?;

    let difficulty = match genesis.get("difficulty") {
        Some(Value::String(s)) => U256::from_str(s).map_err(|e| invalid(e.to_string()))?,
        Some(Value::Number(n)) => n
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| invalid(format!("difficulty {n} is not an unsigned integer")))?,
        Some(other) => return Err(invalid(format!("unexpected difficulty {other}"))),
        None => return Err(invalid("missing difficulty".to_string())),
    };

    let delta = U256::from(offset.unsigned_abs());
    let ttd = if offset >= 0 {
        difficulty.checked_add(delta)
    } else {
        difficulty.checked_sub(delta)
    };
    ttd.ok_or(LaunchError::TerminalTotalDifficultyOverflow { offset })
}
