#![doc = "Runs a single engine client call against a live execution client."]
#![warn(unused_crate_dependencies)]

use clap::Parser;

mod cli;
mod flags;

#[tokio::main]
async fn main() {
    if let Err(err) = cli::Cli::parse().run().await {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}
