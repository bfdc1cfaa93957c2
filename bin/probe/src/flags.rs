//! Connection and logging flags shared by every subcommand.

use alloy_eips::BlockNumberOrTag;
use alloy_primitives::Bytes;
use clap::{ArgAction, Parser};
use hive_engine_client::{
    ConnectionHandle,
    constants::{DEFAULT_ENGINE_PORT, DEFAULT_ETH_PORT, DEFAULT_JWT_SECRET, DEFAULT_RPC_TIMEOUT},
};
use std::{str::FromStr, time::Duration};
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

/// Global arguments for the CLI.
#[derive(Parser, Debug, Clone)]
pub struct GlobalArgs {
    /// Verbosity level (0-3).
    #[arg(long, short, global = true, action = ArgAction::Count)]
    pub v: u8,
    /// Host name or IP address of the execution client.
    #[arg(long, global = true, default_value = "127.0.0.1", env = "HIVE_ENGINE_HOST")]
    pub host: String,
    /// Port of the authenticated engine endpoint.
    #[arg(long, global = true, default_value_t = DEFAULT_ENGINE_PORT, env = "HIVE_ENGINE_PORT")]
    pub engine_port: u16,
    /// Port of the eth endpoint.
    #[arg(long, global = true, default_value_t = DEFAULT_ETH_PORT, env = "HIVE_ETH_PORT")]
    pub eth_port: u16,
    /// Hex-encoded engine secret. Defaults to the hive test secret.
    #[arg(long, global = true, env = "HIVE_JWT_SECRET")]
    pub jwt_secret: Option<Bytes>,
    /// Upper bound on each RPC round trip, in seconds.
    #[arg(
        long,
        global = true,
        default_value_t = DEFAULT_RPC_TIMEOUT.as_secs(),
        env = "HIVE_RPC_TIMEOUT"
    )]
    pub rpc_timeout: u64,
}

impl GlobalArgs {
    /// Builds the connection handle described by the flags.
    pub fn connection_handle(&self) -> ConnectionHandle {
        ConnectionHandle {
            engine_port: self.engine_port,
            eth_port: self.eth_port,
            jwt_secret: self.secret().to_vec(),
            ..ConnectionHandle::new("probe", self.host.clone())
        }
    }

    /// Returns the engine secret, falling back to the default one.
    pub fn secret(&self) -> &[u8] {
        self.jwt_secret.as_ref().map_or(DEFAULT_JWT_SECRET.as_slice(), |s| s.as_ref())
    }

    /// Returns the RPC timeout.
    pub const fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout)
    }

    /// Installs the global fmt subscriber. `RUST_LOG` takes precedence over the verbosity count.
    pub fn init_tracing(&self) -> anyhow::Result<()> {
        let level = match self.v {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        };
        let filter = EnvFilter::builder().with_default_directive(level.into()).from_env()?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| anyhow::anyhow!(e))
    }
}

/// Parses a block selector: a tag, a hex quantity or a decimal height.
pub fn parse_block(s: &str) -> Result<BlockNumberOrTag, String> {
    if let Ok(number) = s.parse::<u64>() {
        return Ok(BlockNumberOrTag::Number(number));
    }
    BlockNumberOrTag::from_str(s).map_err(|e| e.to_string())
}
