//! Per-account nonce tracking that survives reorgs.

use crate::EngineClientResult;
use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;

/// The identity of the chain head at the time of a nonce request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainHead {
    /// The head block hash.
    pub hash: B256,
    /// The hash of the head's parent.
    pub parent_hash: B256,
    /// The head block number.
    pub number: u64,
}

/// What the cache remembers about an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountTransactionInfo {
    /// The head under which [`Self::previous_nonce`] was handed out.
    pub previous_block: B256,
    /// The last nonce handed out for the account.
    pub previous_nonce: u64,
}

impl AccountTransactionInfo {
    /// Returns true if `head` is the block this entry was recorded at, or its direct child.
    pub fn is_continuous_with(&self, head: &ChainHead) -> bool {
        self.previous_block == head.hash || self.previous_block == head.parent_hash
    }
}

/// The node lookups the [`NonceCache`] relies on.
#[async_trait]
pub trait NonceSource: Send + Sync {
    /// Fetches the current chain head. Never cached.
    async fn chain_head(&self) -> EngineClientResult<ChainHead>;

    /// Fetches the authoritative nonce of `account` at block `number`.
    async fn nonce_at(&self, account: Address, number: u64) -> EngineClientResult<u64>;
}

/// Hands out sequential nonces per account without asking the node every time.
///
/// A cached nonce is reused and incremented only while the head is the block it was recorded at
/// or that block's child. Anything else means a reorg or a gap the cache did not observe, and the
/// nonce is fetched again from the node.
///
/// Requests for the same account are serialized; requests for distinct accounts do not contend
/// beyond a short lookup of the account's slot.
#[derive(Debug, Default)]
pub struct NonceCache {
    accounts: Mutex<HashMap<Address, Arc<Mutex<Option<AccountTransactionInfo>>>>>,
}

impl NonceCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next nonce to use for `account`.
    ///
    /// On error the cache entry is left untouched.
    pub async fn next_nonce<S>(&self, source: &S, account: Address) -> EngineClientResult<u64>
    where
        S: NonceSource + ?Sized,
    {
        let slot = self.slot(account).await;
        let mut entry = slot.lock().await;

        let head = source.chain_head().await?;

        if let Some(info) = entry.as_mut().filter(|info| info.is_continuous_with(&head)) {
            info.previous_block = head.hash;
            info.previous_nonce += 1;
            trace!(
                target: "nonce_cache",
                %account,
                head = %head.hash,
                nonce = info.previous_nonce,
                "Reusing cached nonce"
            );
            return Ok(info.previous_nonce);
        }

        if let Some(stale) = entry.as_ref() {
            debug!(
                target: "nonce_cache",
                %account,
                cached_at = %stale.previous_block,
                head = %head.hash,
                "Cached nonce is not continuous with the head, refetching"
            );
        }

        let nonce = source.nonce_at(account, head.number).await?;
        *entry = Some(AccountTransactionInfo { previous_block: head.hash, previous_nonce: nonce });
        Ok(nonce)
    }

    /// Returns the cached entry for `account`, if any.
    pub async fn get(&self, account: Address) -> Option<AccountTransactionInfo> {
        let slot = self.accounts.lock().await.get(&account).cloned()?;
        *slot.lock().await
    }

    async fn slot(&self, account: Address) -> Arc<Mutex<Option<AccountTransactionInfo>>> {
        Arc::clone(self.accounts.lock().await.entry(account).or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EngineClientError;
    use alloy_primitives::address;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ALICE: Address = address!("0x7e5f4552091a69125d5dfcb7b8c2659029395bdf");
    const BOB: Address = address!("0x2b5ad5c4795c026514f8317c7a215e218dccd6cf");

    /// A chain whose head can be moved by tests, with per-account nonces on the node.
    #[derive(Debug, Default)]
    struct FakeChain {
        head: std::sync::Mutex<Option<ChainHead>>,
        nonces: std::sync::Mutex<HashMap<Address, u64>>,
        lookups: AtomicUsize,
        fail_head: std::sync::atomic::AtomicBool,
        fail_nonce: std::sync::atomic::AtomicBool,
    }

    impl FakeChain {
        fn at(number: u64) -> Self {
            let chain = Self::default();
            chain.set_head(number);
            chain
        }

        fn set_head(&self, number: u64) {
            *self.head.lock().unwrap() = Some(block(number));
        }

        /// Replaces the head with a sibling at `number` that shares nothing with the old chain.
        fn reorg_to(&self, number: u64) {
            *self.head.lock().unwrap() = Some(ChainHead {
                hash: B256::with_last_byte(0x80 | number as u8),
                parent_hash: B256::with_last_byte(0x80 | (number as u8 - 1)),
                number,
            });
        }

        fn set_nonce(&self, account: Address, nonce: u64) {
            self.nonces.lock().unwrap().insert(account, nonce);
        }

        fn lookups(&self) -> usize {
            self.lookups.load(Ordering::SeqCst)
        }
    }

    fn block(number: u64) -> ChainHead {
        ChainHead {
            hash: B256::with_last_byte(number as u8),
            parent_hash: B256::with_last_byte(number.saturating_sub(1) as u8),
            number,
        }
    }

    #[async_trait]
    impl NonceSource for FakeChain {
        async fn chain_head(&self) -> EngineClientResult<ChainHead> {
            if self.fail_head.load(Ordering::SeqCst) {
                return Err(EngineClientError::Transport("head lookup failed".into()));
            }
            Ok(self.head.lock().unwrap().expect("head set"))
        }

        async fn nonce_at(&self, account: Address, _number: u64) -> EngineClientResult<u64> {
            if self.fail_nonce.load(Ordering::SeqCst) {
                return Err(EngineClientError::Transport("nonce lookup failed".into()));
            }
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(self.nonces.lock().unwrap().get(&account).copied().unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn test_cold_then_warm() {
        let chain = FakeChain::at(10);
        chain.set_nonce(ALICE, 5);
        let cache = NonceCache::new();

        assert_eq!(cache.next_nonce(&chain, ALICE).await.unwrap(), 5);
        assert_eq!(chain.lookups(), 1);

        assert_eq!(cache.next_nonce(&chain, ALICE).await.unwrap(), 6);
        assert_eq!(chain.lookups(), 1);
    }

    #[tokio::test]
    async fn test_stays_warm_across_single_block_steps() {
        let chain = FakeChain::at(10);
        chain.set_nonce(ALICE, 0);
        let cache = NonceCache::new();

        assert_eq!(cache.next_nonce(&chain, ALICE).await.unwrap(), 0);
        for (step, number) in (11..20).enumerate() {
            chain.set_head(number);
            assert_eq!(cache.next_nonce(&chain, ALICE).await.unwrap(), step as u64 + 1);
        }
        assert_eq!(chain.lookups(), 1);
        assert_eq!(
            cache.get(ALICE).await,
            Some(AccountTransactionInfo { previous_block: block(19).hash, previous_nonce: 9 })
        );
    }

    #[tokio::test]
    async fn test_gap_refetches() {
        let chain = FakeChain::at(10);
        chain.set_nonce(ALICE, 3);
        let cache = NonceCache::new();

        assert_eq!(cache.next_nonce(&chain, ALICE).await.unwrap(), 3);

        // Two blocks later the node has seen more transactions than the cache handed out.
        chain.set_head(12);
        chain.set_nonce(ALICE, 7);
        assert_eq!(cache.next_nonce(&chain, ALICE).await.unwrap(), 7);
        assert_eq!(chain.lookups(), 2);
        assert_eq!(
            cache.get(ALICE).await,
            Some(AccountTransactionInfo { previous_block: block(12).hash, previous_nonce: 7 })
        );
    }

    #[tokio::test]
    async fn test_reorg_refetches() {
        let chain = FakeChain::at(10);
        chain.set_nonce(ALICE, 3);
        let cache = NonceCache::new();

        assert_eq!(cache.next_nonce(&chain, ALICE).await.unwrap(), 3);
        assert_eq!(cache.next_nonce(&chain, ALICE).await.unwrap(), 4);

        // Same height, different block: the transactions behind nonce 4 were dropped.
        chain.reorg_to(11);
        assert_eq!(cache.next_nonce(&chain, ALICE).await.unwrap(), 3);
        assert_eq!(chain.lookups(), 2);
    }

    #[tokio::test]
    async fn test_accounts_are_independent() {
        let chain = FakeChain::at(10);
        chain.set_nonce(ALICE, 1);
        chain.set_nonce(BOB, 100);
        let cache = NonceCache::new();

        assert_eq!(cache.next_nonce(&chain, ALICE).await.unwrap(), 1);
        assert_eq!(cache.next_nonce(&chain, BOB).await.unwrap(), 100);
        assert_eq!(cache.next_nonce(&chain, ALICE).await.unwrap(), 2);
        assert_eq!(cache.next_nonce(&chain, BOB).await.unwrap(), 101);
        assert_eq!(chain.lookups(), 2);
    }

    #[tokio::test]
    async fn test_failures_leave_cache_untouched() {
        let chain = FakeChain::at(10);
        chain.set_nonce(ALICE, 4);
        let cache = NonceCache::new();

        chain.fail_nonce.store(true, Ordering::SeqCst);
        assert!(cache.next_nonce(&chain, ALICE).await.is_err());
        assert_eq!(cache.get(ALICE).await, None);
        chain.fail_nonce.store(false, Ordering::SeqCst);

        assert_eq!(cache.next_nonce(&chain, ALICE).await.unwrap(), 4);
        let before = cache.get(ALICE).await;

        chain.fail_head.store(true, Ordering::SeqCst);
        assert!(cache.next_nonce(&chain, ALICE).await.is_err());
        assert_eq!(cache.get(ALICE).await, before);
        chain.fail_head.store(false, Ordering::SeqCst);

        // Refetch path fails after a gap: the stale entry survives as it was.
        chain.set_head(15);
        chain.fail_nonce.store(true, Ordering::SeqCst);
        assert!(cache.next_nonce(&chain, ALICE).await.is_err());
        assert_eq!(cache.get(ALICE).await, before);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_for_one_account() {
        let chain = Arc::new(FakeChain::at(10));
        chain.set_nonce(ALICE, 0);
        let cache = Arc::new(NonceCache::new());

        let mut handles = Vec::new();
        for _ in 0..16 {
            let (chain, cache) = (Arc::clone(&chain), Arc::clone(&cache));
            handles.push(tokio::spawn(async move {
                cache.next_nonce(chain.as_ref(), ALICE).await.unwrap()
            }));
        }

        let mut nonces = Vec::new();
        for handle in handles {
            nonces.push(handle.await.unwrap());
        }
        nonces.sort_unstable();
        assert_eq!(nonces, (0..16).collect::<Vec<_>>());
        assert_eq!(chain.lookups(), 1);
    }
}
