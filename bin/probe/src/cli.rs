//! Command line entry point.

use crate::flags::{GlobalArgs, parse_block};
use alloy_eips::BlockNumberOrTag;
use alloy_primitives::Address;
use alloy_rpc_types_eth::Header;
use clap::{Parser, Subcommand};
use hive_engine_client::{HiveEngineClient, TokenIssuer, verify_token};
use std::time::SystemTime;
use tokio_util::sync::CancellationToken;

/// Probes a running execution client through the hive engine client.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global arguments for the CLI.
    #[command(flatten)]
    pub global: GlobalArgs,
    /// The call to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// The calls the probe can run.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Print the header of a block.
    Head {
        /// Block tag, hex quantity or decimal height.
        #[arg(long, default_value = "latest", value_parser = parse_block)]
        block: BlockNumberOrTag,
    },
    /// Print the total difficulty of the latest block.
    TotalDifficulty,
    /// Print the next nonce an account should use.
    Nonce {
        /// The account address.
        address: Address,
    },
    /// Mint an engine token and check it locally.
    Token,
}

impl Cli {
    /// Runs the selected subcommand and prints its result to stdout.
    pub async fn run(self) -> anyhow::Result<()> {
        self.global.init_tracing()?;

        let cancel = interrupt_token();
        let output = match self.command {
            Commands::Head { block } => {
                let client = self.global.connect()?;
                let header: Header = client.header_by_number(&cancel, block).await?;
                client.close();
                serde_json::to_string_pretty(&header)?
            }
            Commands::TotalDifficulty => {
                let client = self.global.connect()?;
                let total_difficulty = client.total_difficulty(&cancel).await?;
                client.close();
                total_difficulty.to_string()
            }
            Commands::Nonce { address } => {
                let client = self.global.connect()?;
                let nonce = client.next_account_nonce(&cancel, address).await?;
                client.close();
                nonce.to_string()
            }
            Commands::Token => {
                let token = TokenIssuer::new(self.global.secret()).mint()?;
                let claims = verify_token(self.global.secret(), &token, SystemTime::now())?;
                tracing::debug!(iat = claims.iat, "Minted engine token");
                token
            }
        };

        println!("{output}");
        Ok(())
    }
}

impl GlobalArgs {
    /// Connects to the node described by the flags.
    fn connect(&self) -> anyhow::Result<HiveEngineClient> {
        Ok(HiveEngineClient::connect(self.connection_handle())?
            .with_rpc_timeout(self.rpc_timeout()))
    }
}

/// Returns a token that is cancelled on ctrl-c.
fn interrupt_token() -> CancellationToken {
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });
    cancel
}
