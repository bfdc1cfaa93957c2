#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

#[macro_use]
extern crate tracing;

mod auth;
pub use auth::{AuthError, Claims, TokenIssuer, mint_token, verify_token};

mod block;
pub use block::block_number_arg;

mod client;
pub use client::{ConnectionHandle, HiveEngineClient};

pub mod constants;

mod error;
pub use error::{EngineClientError, EngineClientResult};

mod header;
pub use header::TotalDifficultyHeader;

mod memory;
pub use memory::{CallMemory, ForkchoiceRequest};

mod nonce;
pub use nonce::{AccountTransactionInfo, ChainHead, NonceCache, NonceSource};

pub mod transport;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
