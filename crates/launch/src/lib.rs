#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

#[macro_use]
extern crate tracing;

mod errors;
pub use errors::{LaunchError, LaunchResult};

mod starter;
pub use starter::{
    CHAIN_FILE_PATH, CHAINS_DIR, ClientStarter, GENESIS_FILE_PATH, LaunchPlan, calculate_real_ttd,
};
