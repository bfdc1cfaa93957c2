//! The engine client facade.

use crate::{
    CallMemory, ChainHead, EngineClientError, EngineClientResult, ForkchoiceRequest, NonceCache,
    NonceSource, TokenIssuer, TotalDifficultyHeader, block_number_arg,
    constants::{
        DEFAULT_ENGINE_PORT, DEFAULT_ETH_PORT, DEFAULT_JWT_SECRET, DEFAULT_RPC_TIMEOUT,
        ENGINE_EXCHANGE_TRANSITION_CONFIGURATION_V1, ENGINE_FORKCHOICE_UPDATED_V1,
        ENGINE_GET_PAYLOAD_V1, ENGINE_NEW_PAYLOAD_V1, ETH_GET_BLOCK_BY_NUMBER,
        ETH_GET_TRANSACTION_COUNT,
    },
    transport::{HttpTransport, JsonRpcRequest, Transport},
};
use alloy_eips::BlockNumberOrTag;
use alloy_primitives::{Address, U64, U256};
use alloy_rpc_types_engine::{
    ExecutionPayloadV1, ForkchoiceState, ForkchoiceUpdated, PayloadAttributes, PayloadId,
    PayloadStatus, TransitionConfiguration,
};
use alloy_rpc_types_eth::Header;
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json, value::RawValue};
use std::{fmt, sync::Arc, time::Duration};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Everything needed to reach one execution client under test.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionHandle {
    /// Opaque identifier of the client instance, used for logging and correlation.
    pub id: String,
    /// Host name or IP address of the node.
    pub host: String,
    /// Port of the authenticated engine endpoint.
    pub engine_port: u16,
    /// Port of the public eth endpoint.
    pub eth_port: u16,
    /// Shared secret used to sign engine tokens.
    pub jwt_secret: Vec<u8>,
    /// Terminal total difficulty the node was configured with, if any.
    pub terminal_total_difficulty: Option<U256>,
    /// The node's enode URL, if known.
    pub enode: Option<String>,
}

impl ConnectionHandle {
    /// Creates a handle for `host` with default ports and the default secret.
    pub fn new(id: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            host: host.into(),
            engine_port: DEFAULT_ENGINE_PORT,
            eth_port: DEFAULT_ETH_PORT,
            jwt_secret: DEFAULT_JWT_SECRET.to_vec(),
            terminal_total_difficulty: None,
            enode: None,
        }
    }

    /// Returns the URL of the engine endpoint.
    pub fn engine_url(&self) -> EngineClientResult<Url> {
        self.url(self.engine_port)
    }

    /// Returns the URL of the eth endpoint.
    pub fn eth_url(&self) -> EngineClientResult<Url> {
        self.url(self.eth_port)
    }

    fn url(&self, port: u16) -> EngineClientResult<Url> {
        let host = if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        Url::parse(&format!("http://{host}:{port}/"))
            .map_err(|e| EngineClientError::Configuration(format!("invalid host {host}: {e}")))
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .field("host", &self.host)
            .field("engine_port", &self.engine_port)
            .field("eth_port", &self.eth_port)
            .field("jwt_secret", &"<redacted>")
            .field("terminal_total_difficulty", &self.terminal_total_difficulty)
            .field("enode", &self.enode)
            .finish()
    }
}

/// An Engine API client bound to one execution client under test.
///
/// Holds two transports: the engine endpoint, where every privileged call carries a freshly
/// minted bearer token, and the eth endpoint for header and nonce lookups. The last forkchoice
/// update and the last new-payload call are remembered in a [`CallMemory`] so tests can inspect
/// what was sent and what came back, including failed attempts.
///
/// Every operation takes the caller's [`CancellationToken`] and is abandoned as soon as it fires.
/// Each round trip is additionally bounded by the client's RPC timeout. Tokens are scoped to a
/// single call: cancelling one leaves the client usable for the next. Nothing is retried.
#[derive(Debug)]
pub struct HiveEngineClient {
    handle: ConnectionHandle,
    engine: Arc<dyn Transport>,
    eth: Arc<dyn Transport>,
    issuer: TokenIssuer,
    rpc_timeout: Duration,
    memory: RwLock<CallMemory>,
    nonces: NonceCache,
}

impl HiveEngineClient {
    /// Creates a client that talks HTTP to the endpoints described by `handle`.
    pub fn connect(handle: ConnectionHandle) -> EngineClientResult<Self> {
        let engine = HttpTransport::new(handle.engine_url()?)?;
        let eth = HttpTransport::new(handle.eth_url()?)?;
        Ok(Self::with_transports(handle, Arc::new(engine), Arc::new(eth)))
    }

    /// Creates a client over the given engine and eth transports.
    pub fn with_transports(
        handle: ConnectionHandle,
        engine: Arc<dyn Transport>,
        eth: Arc<dyn Transport>,
    ) -> Self {
        Self {
            issuer: TokenIssuer::new(handle.jwt_secret.clone()),
            handle,
            engine,
            eth,
            rpc_timeout: DEFAULT_RPC_TIMEOUT,
            memory: RwLock::new(CallMemory::default()),
            nonces: NonceCache::new(),
        }
    }

    /// Sets the upper bound on each RPC round trip.
    pub fn with_rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_timeout = timeout;
        self
    }

    /// Returns the client's identifier.
    pub fn id(&self) -> &str {
        &self.handle.id
    }

    /// Returns the node's enode URL, if known.
    pub fn enode_url(&self) -> Option<&str> {
        self.handle.enode.as_deref()
    }

    /// Returns the terminal total difficulty the node was started with, if any.
    pub const fn terminal_total_difficulty(&self) -> Option<U256> {
        self.handle.terminal_total_difficulty
    }

    /// Returns the connection handle the client was built from.
    pub const fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    /// Sends `engine_forkchoiceUpdatedV1`.
    ///
    /// The request is recorded before it is sent and the outcome after it returns, so a failed
    /// call still shows up in [`Self::latest_forkchoice_sent`].
    pub async fn forkchoice_updated_v1(
        &self,
        cancel: &CancellationToken,
        state: ForkchoiceState,
        payload_attributes: Option<PayloadAttributes>,
    ) -> EngineClientResult<ForkchoiceUpdated> {
        let token = self.issuer.mint()?;
        let params = encode_params((&state, &payload_attributes))?;

        self.memory.write().await.record_forkchoice_sent(state, payload_attributes);
        let response =
            self.authenticated(cancel, ENGINE_FORKCHOICE_UPDATED_V1, params, token).await;
        self.memory.write().await.record_forkchoice_response(response.clone());

        response
    }

    /// Sends `engine_getPayloadV1` for a payload id returned by an earlier forkchoice update.
    pub async fn get_payload_v1(
        &self,
        cancel: &CancellationToken,
        payload_id: PayloadId,
    ) -> EngineClientResult<ExecutionPayloadV1> {
        let token = self.issuer.mint()?;
        self.authenticated(cancel, ENGINE_GET_PAYLOAD_V1, json!([payload_id]), token).await
    }

    /// Sends `engine_newPayloadV1`, recording the payload and the returned status.
    pub async fn new_payload_v1(
        &self,
        cancel: &CancellationToken,
        payload: ExecutionPayloadV1,
    ) -> EngineClientResult<PayloadStatus> {
        let token = self.issuer.mint()?;
        let params = encode_params([&payload])?;

        self.memory.write().await.record_payload_sent(payload);
        let response = self.authenticated(cancel, ENGINE_NEW_PAYLOAD_V1, params, token).await;
        self.memory.write().await.record_payload_status(response.clone());

        response
    }

    /// Sends `engine_exchangeTransitionConfigurationV1`. The call carries no token and is not
    /// recorded.
    pub async fn exchange_transition_configuration_v1(
        &self,
        cancel: &CancellationToken,
        config: TransitionConfiguration,
    ) -> EngineClientResult<TransitionConfiguration> {
        let params = encode_params([&config])?;
        let method = ENGINE_EXCHANGE_TRANSITION_CONFIGURATION_V1;
        let raw = self.call(cancel, self.engine.as_ref(), method, params, None).await?;
        decode(method, raw)
    }

    /// Fetches the header of `block`.
    ///
    /// Returns [`EngineClientError::NotFound`] when the node answers with `null`.
    pub async fn header_by_number(
        &self,
        cancel: &CancellationToken,
        block: BlockNumberOrTag,
    ) -> EngineClientResult<Header> {
        let raw = self.block_by_number(cancel, block).await?;
        Ok(serde_json::from_str(raw.get())?)
    }

    /// Fetches the header of `block` together with its `totalDifficulty`.
    pub async fn total_difficulty_header(
        &self,
        cancel: &CancellationToken,
        block: BlockNumberOrTag,
    ) -> EngineClientResult<TotalDifficultyHeader> {
        let raw = self.block_by_number(cancel, block).await?;
        TotalDifficultyHeader::decode(&raw)
    }

    /// Returns the total difficulty of the latest block.
    pub async fn total_difficulty(&self, cancel: &CancellationToken) -> EngineClientResult<U256> {
        let header = self.total_difficulty_header(cancel, BlockNumberOrTag::Latest).await?;
        Ok(header.total_difficulty)
    }

    /// Fetches the nonce of `account` at block `number` from the node.
    pub async fn nonce_at(
        &self,
        cancel: &CancellationToken,
        account: Address,
        number: u64,
    ) -> EngineClientResult<u64> {
        let params = json!([account, block_number_arg(BlockNumberOrTag::Number(number))]);
        let raw =
            self.call(cancel, self.eth.as_ref(), ETH_GET_TRANSACTION_COUNT, params, None).await?;
        let nonce: U64 = decode(ETH_GET_TRANSACTION_COUNT, raw)?;
        Ok(nonce.to())
    }

    /// Returns the next nonce `account` should use, consulting the node only when the cached
    /// value cannot be trusted. Both the head lookup and the nonce lookup observe `cancel`.
    pub async fn next_account_nonce(
        &self,
        cancel: &CancellationToken,
        account: Address,
    ) -> EngineClientResult<u64> {
        self.nonces.next_nonce(&ScopedLookup { client: self, cancel }, account).await
    }

    /// Returns the last forkchoice update sent.
    pub async fn latest_forkchoice_sent(&self) -> Option<ForkchoiceRequest> {
        self.memory.read().await.forkchoice_sent.clone()
    }

    /// Returns the outcome of the last forkchoice update.
    pub async fn latest_forkchoice_response(
        &self,
    ) -> Option<EngineClientResult<ForkchoiceUpdated>> {
        self.memory.read().await.forkchoice_response.clone()
    }

    /// Returns the last payload submitted through new-payload.
    pub async fn latest_new_payload_sent(&self) -> Option<ExecutionPayloadV1> {
        self.memory.read().await.payload_sent.clone()
    }

    /// Returns the outcome of the last new-payload call.
    pub async fn latest_new_payload_response(&self) -> Option<EngineClientResult<PayloadStatus>> {
        self.memory.read().await.payload_status_response.clone()
    }

    /// Returns a snapshot of everything remembered.
    pub async fn call_memory(&self) -> CallMemory {
        self.memory.read().await.clone()
    }

    /// Runs the checks that follow a test. A plain RPC client has none.
    pub const fn post_run_verifications(&self) -> EngineClientResult<()> {
        Ok(())
    }

    /// Releases both transports.
    pub fn close(self) {
        let Self { handle, engine, eth, .. } = self;
        debug!(target: "hive_rpc", client = %handle.id, "Closing engine and eth transports");
        drop(engine);
        drop(eth);
    }

    async fn block_by_number(
        &self,
        cancel: &CancellationToken,
        block: BlockNumberOrTag,
    ) -> EngineClientResult<Box<RawValue>> {
        let params = json!([block_number_arg(block), false]);
        self.call(cancel, self.eth.as_ref(), ETH_GET_BLOCK_BY_NUMBER, params, None)
            .await?
            .ok_or(EngineClientError::NotFound)
    }

    async fn authenticated<R: DeserializeOwned>(
        &self,
        cancel: &CancellationToken,
        method: &'static str,
        params: Value,
        token: String,
    ) -> EngineClientResult<R> {
        let raw = self.call(cancel, self.engine.as_ref(), method, params, Some(token)).await?;
        decode(method, raw)
    }

    async fn call(
        &self,
        cancel: &CancellationToken,
        transport: &dyn Transport,
        method: &'static str,
        params: Value,
        bearer: Option<String>,
    ) -> EngineClientResult<Option<Box<RawValue>>> {
        let request = JsonRpcRequest::new(method, params);
        debug!(target: "hive_rpc", client = %self.handle.id, method, "Sending request");

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(target: "hive_rpc", client = %self.handle.id, method, "Request cancelled");
                return Err(EngineClientError::Cancelled);
            }
            response = tokio::time::timeout(
                self.rpc_timeout,
                transport.send(&request, bearer.as_deref()),
            ) => response
                .map_err(|_| EngineClientError::Timeout(self.rpc_timeout))
                .and_then(|sent| sent?.into_result()),
        };

        outcome.inspect_err(|e| {
            debug!(
                target: "hive_rpc",
                client = %self.handle.id,
                method,
                error = %e,
                "Request failed"
            );
        })
    }
}

/// The client's lookups bound to the token of one nonce request.
#[derive(Debug)]
struct ScopedLookup<'a> {
    client: &'a HiveEngineClient,
    cancel: &'a CancellationToken,
}

#[async_trait]
impl NonceSource for ScopedLookup<'_> {
    async fn chain_head(&self) -> EngineClientResult<ChainHead> {
        let head = self.client.header_by_number(self.cancel, BlockNumberOrTag::Latest).await?;
        Ok(ChainHead {
            hash: head.hash,
            parent_hash: head.inner.parent_hash,
            number: head.inner.number,
        })
    }

    async fn nonce_at(&self, account: Address, number: u64) -> EngineClientResult<u64> {
        self.client.nonce_at(self.cancel, account, number).await
    }
}

fn encode_params(params: impl Serialize) -> EngineClientResult<Value> {
    serde_json::to_value(params).map_err(|e| EngineClientError::Serialization(e.to_string()))
}

fn decode<R: DeserializeOwned>(method: &str, raw: Option<Box<RawValue>>) -> EngineClientResult<R> {
    let raw = raw.ok_or_else(|| {
        EngineClientError::InvalidResponse(format!("{method} returned a null result"))
    })?;
    Ok(serde_json::from_str(raw.get())?)
}
