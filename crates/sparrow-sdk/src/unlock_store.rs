//! The connected user's withdrawal queue
//!
//! The list is re-derived wholesale from the contract on every refresh and
//! kept in ascending index order. Only the raw timestamps are stored;
//! readiness and expiry are classified against the clock at each read.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use futures::future::try_join_all;
use sparrow_core::{Address, AssetConfig, UnlockRequest, UnlockState};
use tracing::{debug, warn};

use crate::contract::{RawUnlockRequest, StakingContract};
use crate::error::{SdkError, SdkResult};
use crate::wallet::WalletSession;

struct Slot {
    seq: u64,
    owner: Option<Address>,
    requests: Arc<Vec<UnlockRequest>>,
}

pub struct UnlockRequestStore {
    asset: AssetConfig,
    contract: Arc<dyn StakingContract>,
    session: Arc<WalletSession>,
    next_seq: AtomicU64,
    current: RwLock<Slot>,
}

impl UnlockRequestStore {
    pub fn new(
        asset: AssetConfig,
        contract: Arc<dyn StakingContract>,
        session: Arc<WalletSession>,
    ) -> Self {
        Self {
            asset,
            contract,
            session,
            next_seq: AtomicU64::new(0),
            current: RwLock::new(Slot {
                seq: 0,
                owner: None,
                requests: Arc::new(Vec::new()),
            }),
        }
    }

    /// Current snapshot, ascending by index
    pub fn requests(&self) -> Arc<Vec<UnlockRequest>> {
        let slot = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&slot.requests)
    }

    /// Owner the snapshot was fetched for
    pub fn owner(&self) -> Option<Address> {
        let slot = self.current.read().unwrap_or_else(PoisonError::into_inner);
        slot.owner.clone()
    }

    pub fn get(&self, index: u64) -> Option<UnlockRequest> {
        self.requests().iter().find(|r| r.index == index).cloned()
    }

    /// Every request with its lifecycle state at `now`
    pub fn classify(&self, now: u64) -> Vec<(UnlockRequest, UnlockState)> {
        self.requests()
            .iter()
            .map(|r| (r.clone(), r.state_at(now)))
            .collect()
    }

    /// Number of requests claimable at `now`
    pub fn ready_count(&self, now: u64) -> usize {
        self.requests().iter().filter(|r| r.is_claimable(now)).count()
    }

    /// Re-read the whole queue.
    ///
    /// On failure the previous snapshot is kept and the error is returned as
    /// [`SdkError::Fetch`] after being logged.
    pub async fn refresh(&self) -> SdkResult<Arc<Vec<UnlockRequest>>> {
        let seq = self.next_seq.fetch_add(1, Ordering::AcqRel) + 1;
        let owner = self.session.address();

        let requests = match &owner {
            Some(owner) => match self.fetch(owner).await {
                Ok(requests) => requests,
                Err(e) => {
                    warn!("Failed to load {} unlock requests: {}", self.asset.kind, e);
                    return Err(e);
                }
            },
            None => Vec::new(),
        };
        let requests = Arc::new(requests);

        let mut slot = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if seq < slot.seq {
            debug!("Discarding stale unlock queue response #{} (have #{})", seq, slot.seq);
            return Ok(Arc::clone(&slot.requests));
        }
        debug!("Loaded {} {} unlock requests (#{})", requests.len(), self.asset.kind, seq);
        slot.seq = seq;
        slot.owner = owner;
        slot.requests = Arc::clone(&requests);
        Ok(requests)
    }

    async fn fetch(&self, owner: &Address) -> SdkResult<Vec<UnlockRequest>> {
        let count = self
            .contract
            .get_unlock_request_count(owner)
            .await
            .map_err(SdkError::from_fetch)?;

        let raw = try_join_all((0..count).map(|index| async move {
            self.contract
                .get_unlock_request(owner, index)
                .await
                .map(|raw| (index, raw))
        }))
        .await
        .map_err(SdkError::from_fetch)?;

        Ok(raw
            .into_iter()
            .filter_map(|(index, raw)| self.decode(index, raw))
            .collect())
    }

    fn decode(&self, index: u64, raw: RawUnlockRequest) -> Option<UnlockRequest> {
        // Claimed slots read back zeroed
        if raw.share_amount == 0 && raw.unlock_time == 0 && raw.expiry_time == 0 {
            return None;
        }
        match UnlockRequest::new(
            index,
            raw.share_amount,
            raw.base_amount,
            raw.unlock_time,
            raw.expiry_time,
        ) {
            Ok(request) => Some(request),
            Err(e) => {
                warn!("Skipping {} unlock request {}: {}", self.asset.kind, index, e);
                None
            }
        }
    }

    /// Drop a request confirmed as claimed.
    ///
    /// Any refresh that started before this call is discarded when it lands,
    /// so the claimed entry cannot reappear from an older read.
    pub fn forget(&self, index: u64) {
        let seq = self.next_seq.fetch_add(1, Ordering::AcqRel) + 1;
        let mut slot = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let remaining: Vec<UnlockRequest> = slot
            .requests
            .iter()
            .filter(|r| r.index != index)
            .cloned()
            .collect();
        slot.seq = seq;
        slot.requests = Arc::new(remaining);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ContractError;
    use crate::testing::{test_address, ManualClock, MockStakingContract, MockWalletProvider};
    use sparrow_core::{Clock, WAD};

    async fn setup() -> (Arc<MockStakingContract>, Arc<ManualClock>, UnlockRequestStore) {
        let asset = AssetConfig::avax_fuji();
        let clock = Arc::new(ManualClock::new(1_000));
        let contract = Arc::new(MockStakingContract::new(&asset, test_address(1), clock.clone()));
        let provider = Arc::new(MockWalletProvider::new(vec![test_address(1)], 43113));
        let session = Arc::new(WalletSession::new(provider));
        session.connect().await.unwrap();
        let store = UnlockRequestStore::new(asset, contract.clone(), session);
        (contract, clock, store)
    }

    #[tokio::test]
    async fn test_entries_ordered_and_classified_on_read() {
        let (contract, clock, store) = setup().await;
        contract.push_request(&test_address(1), WAD, WAD, 1_060, 1_100);
        contract.push_request(&test_address(1), 2 * WAD, 2 * WAD, 900, 950);

        store.refresh().await.unwrap();
        let indices: Vec<u64> = store.requests().iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 1]);

        let states: Vec<UnlockState> = store.classify(clock.now()).into_iter().map(|(_, s)| s).collect();
        assert_eq!(states, vec![UnlockState::Pending, UnlockState::Expired]);

        // No refresh needed for time to move the request along
        clock.advance(60);
        assert_eq!(store.classify(clock.now())[0].1, UnlockState::Ready);
        assert_eq!(store.ready_count(clock.now()), 1);
    }

    #[tokio::test]
    async fn test_invalid_entry_is_skipped() {
        let (contract, _clock, store) = setup().await;
        contract.push_request(&test_address(1), WAD, WAD, 2_000, 2_000);
        contract.push_request(&test_address(1), WAD, WAD, 2_000, 3_000);

        let requests = store.refresh().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].index, 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_snapshot() {
        let (contract, _clock, store) = setup().await;
        contract.push_request(&test_address(1), WAD, WAD, 2_000, 3_000);
        store.refresh().await.unwrap();

        contract.fail_reads(Some(ContractError::Provider("connection reset".into())));
        assert!(matches!(store.refresh().await, Err(SdkError::Fetch(_))));
        assert_eq!(store.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_forget_removes_entry() {
        let (contract, _clock, store) = setup().await;
        contract.push_request(&test_address(1), WAD, WAD, 2_000, 3_000);
        contract.push_request(&test_address(1), WAD, WAD, 2_000, 3_000);
        store.refresh().await.unwrap();

        store.forget(0);
        assert!(store.get(0).is_none());
        assert!(store.get(1).is_some());
    }

    #[tokio::test]
    async fn test_forget_outlives_older_inflight_refresh() {
        let (contract, _clock, store) = setup().await;
        contract.push_request(&test_address(1), WAD, WAD, 2_000, 3_000);
        contract.push_request(&test_address(1), WAD, WAD, 2_000, 3_000);
        store.refresh().await.unwrap();

        // The chain still reports index 0 while this read is pending
        let release = contract.hold_next_queue_read();
        let refresh = store.refresh();
        let claim = async {
            contract.queue_read_started().await;
            store.forget(0);
            let _ = release.send(());
        };
        let (landed, ()) = tokio::join!(refresh, claim);

        let landed = landed.unwrap();
        assert!(landed.iter().all(|r| r.index != 0));
        assert!(store.get(0).is_none());
        assert!(store.get(1).is_some());
    }
}
