//! Protocol and user statistics
//!
//! Every refresh produces a brand-new immutable [`Stats`] snapshot. Overlapping
//! refreshes are allowed; each is stamped with a sequence number when it
//! starts, and a response older than the snapshot already applied is dropped.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use sparrow_core::{Address, AssetConfig, AssetKind, CoreResult, ExchangeRate, YieldLabel};
use tracing::{debug, warn};

use crate::contract::StakingContract;
use crate::error::{SdkError, SdkResult};
use crate::wallet::WalletSession;

/// Snapshot of protocol totals and the connected user's balances
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stats {
    pub asset: AssetKind,
    /// Account the user balances belong to; `None` when disconnected
    pub owner: Option<Address>,
    pub total_staked: u128,
    pub total_supply: u128,
    pub exchange_rate: ExchangeRate,
    pub yield_label: YieldLabel,
    pub yield_bps: u32,
    /// Native balance of the connected wallet
    pub user_balance: u128,
    /// Share token balance of the connected wallet
    pub user_staked: u128,
    /// False until the first successful fetch; the rate is a placeholder
    pub loaded: bool,
}

impl Stats {
    /// Placeholder shown before the first fetch completes
    pub fn loading(asset: &AssetConfig) -> Self {
        Self {
            asset: asset.kind,
            owner: None,
            total_staked: 0,
            total_supply: 0,
            exchange_rate: ExchangeRate::ONE,
            yield_label: asset.yield_label,
            yield_bps: asset.yield_bps,
            user_balance: 0,
            user_staked: 0,
            loaded: false,
        }
    }

    /// Whether the user balances were fetched for `owner`
    pub fn is_for(&self, owner: &Address) -> bool {
        self.loaded && self.owner.as_ref() == Some(owner)
    }

    /// Base-asset value of the user's shares at the current rate
    pub fn user_value(&self) -> CoreResult<u128> {
        self.exchange_rate.to_base(self.user_staked)
    }
}

/// What caused a refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    AssetChanged,
    WalletChanged,
    Staked,
    UnlockRequested,
    Claimed,
    Manual,
}

impl fmt::Display for RefreshTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RefreshTrigger::AssetChanged => "asset changed",
            RefreshTrigger::WalletChanged => "wallet changed",
            RefreshTrigger::Staked => "stake confirmed",
            RefreshTrigger::UnlockRequested => "unlock requested",
            RefreshTrigger::Claimed => "claim confirmed",
            RefreshTrigger::Manual => "manual",
        };
        f.write_str(name)
    }
}

struct Slot {
    seq: u64,
    stats: Arc<Stats>,
}

pub struct StatsAggregator {
    asset: AssetConfig,
    contract: Arc<dyn StakingContract>,
    session: Arc<WalletSession>,
    next_seq: AtomicU64,
    current: RwLock<Slot>,
}

impl StatsAggregator {
    pub fn new(
        asset: AssetConfig,
        contract: Arc<dyn StakingContract>,
        session: Arc<WalletSession>,
    ) -> Self {
        let stats = Arc::new(Stats::loading(&asset));
        Self {
            asset,
            contract,
            session,
            next_seq: AtomicU64::new(0),
            current: RwLock::new(Slot { seq: 0, stats }),
        }
    }

    /// Latest applied snapshot
    pub fn snapshot(&self) -> Arc<Stats> {
        let slot = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&slot.stats)
    }

    /// Fetch a fresh snapshot.
    ///
    /// A failed fetch is logged and returned as [`SdkError::Fetch`]; the
    /// previous snapshot stays in place.
    pub async fn refresh(&self, trigger: RefreshTrigger) -> SdkResult<Arc<Stats>> {
        let seq = self.next_seq.fetch_add(1, Ordering::AcqRel) + 1;
        debug!("Refreshing {} stats (#{}, {})", self.asset.kind, seq, trigger);

        let stats = match self.fetch().await {
            Ok(stats) => Arc::new(stats),
            Err(e) => {
                warn!("Failed to refresh {} stats: {}", self.asset.kind, e);
                return Err(e);
            }
        };

        let mut slot = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if seq < slot.seq {
            debug!("Discarding stale stats response #{} (have #{})", seq, slot.seq);
            return Ok(Arc::clone(&slot.stats));
        }
        slot.seq = seq;
        slot.stats = Arc::clone(&stats);
        Ok(stats)
    }

    async fn fetch(&self) -> SdkResult<Stats> {
        let address = self.session.address();

        let (raw, user_staked, user_balance) = match &address {
            Some(owner) => {
                let (raw, staked, balance) = tokio::try_join!(
                    self.contract.get_stats(),
                    self.contract.balance_of(owner),
                    self.contract.native_balance(owner),
                )
                .map_err(SdkError::from_fetch)?;
                (raw, staked, balance)
            }
            None => {
                let raw = self.contract.get_stats().await.map_err(SdkError::from_fetch)?;
                (raw, 0, 0)
            }
        };

        let exchange_rate = ExchangeRate::from_wad(raw.exchange_rate)
            .map_err(|e| SdkError::Fetch(format!("contract reported {}", e)))?;

        Ok(Stats {
            asset: self.asset.kind,
            owner: address,
            total_staked: raw.total_staked,
            total_supply: raw.total_supply,
            exchange_rate,
            yield_label: self.asset.yield_label,
            yield_bps: self.asset.yield_bps,
            user_balance,
            user_staked,
            loaded: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_address, ManualClock, MockStakingContract, MockWalletProvider};
    use crate::error::ContractError;
    use sparrow_core::WAD;

    async fn connected_session() -> Arc<WalletSession> {
        let provider = Arc::new(MockWalletProvider::new(vec![test_address(1)], 43113));
        let session = Arc::new(WalletSession::new(provider));
        session.connect().await.unwrap();
        session
    }

    #[tokio::test]
    async fn test_refresh_replaces_snapshot() {
        let asset = AssetConfig::avax_fuji();
        let contract = Arc::new(MockStakingContract::new(&asset, test_address(1), Arc::new(ManualClock::new(0))));
        contract.set_exchange_rate(WAD * 5 / 4);
        contract.set_share_balance(&test_address(1), 2 * WAD);
        contract.set_native_balance(&test_address(1), 3 * WAD);

        let stats = StatsAggregator::new(asset, contract, connected_session().await);
        assert!(!stats.snapshot().loaded);

        let snapshot = stats.refresh(RefreshTrigger::Manual).await.unwrap();
        assert!(snapshot.loaded);
        assert_eq!(snapshot.owner, Some(test_address(1)));
        assert_eq!(snapshot.user_staked, 2 * WAD);
        assert_eq!(snapshot.user_balance, 3 * WAD);
        assert_eq!(snapshot.user_value().unwrap(), 5 * WAD / 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_previous_snapshot() {
        let asset = AssetConfig::avax_fuji();
        let contract = Arc::new(MockStakingContract::new(&asset, test_address(1), Arc::new(ManualClock::new(0))));
        let stats = StatsAggregator::new(asset, contract.clone(), connected_session().await);

        let before = stats.refresh(RefreshTrigger::Manual).await.unwrap();
        contract.fail_reads(Some(ContractError::Provider("timeout".into())));

        let err = stats.refresh(RefreshTrigger::Manual).await.unwrap_err();
        assert!(matches!(err, SdkError::Fetch(_)));
        assert_eq!(stats.snapshot(), before);
    }

    #[tokio::test]
    async fn test_disconnected_user_has_zero_balances() {
        let asset = AssetConfig::beam_testnet();
        let contract = Arc::new(MockStakingContract::new(&asset, test_address(1), Arc::new(ManualClock::new(0))));
        contract.set_share_balance(&test_address(1), WAD);
        let session = Arc::new(WalletSession::without_provider());

        let stats = StatsAggregator::new(asset, contract, session);
        let snapshot = stats.refresh(RefreshTrigger::AssetChanged).await.unwrap();
        assert!(snapshot.loaded);
        assert_eq!(snapshot.user_staked, 0);
    }
}
