//! Two-phase withdrawal: request an unlock, then claim it once matured
//!
//! ```text
//! (none) --request_unlock--> PENDING --time--> READY --claim_unlock--> (removed)
//!                                                 \--time--> EXPIRED (dead)
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use sparrow_core::math::{format_units, parse_units};
use sparrow_core::{AssetConfig, Clock, UnlockState};
use tracing::{debug, error, info};

use crate::contract::{StakingContract, TxReceipt};
use crate::error::{SdkError, SdkResult, ValidationError};
use crate::gate::TxGate;
use crate::stats::{RefreshTrigger, Stats, StatsAggregator};
use crate::unlock_store::UnlockRequestStore;
use crate::wallet::WalletSession;

pub struct UnstakingController {
    asset: AssetConfig,
    contract: Arc<dyn StakingContract>,
    session: Arc<WalletSession>,
    stats: Arc<StatsAggregator>,
    store: Arc<UnlockRequestStore>,
    clock: Arc<dyn Clock>,
    gate: TxGate,
    input: Mutex<String>,
}

impl UnstakingController {
    pub fn new(
        asset: AssetConfig,
        contract: Arc<dyn StakingContract>,
        session: Arc<WalletSession>,
        stats: Arc<StatsAggregator>,
        store: Arc<UnlockRequestStore>,
        clock: Arc<dyn Clock>,
        gate: TxGate,
    ) -> Self {
        Self {
            asset,
            contract,
            session,
            stats,
            store,
            clock,
            gate,
            input: Mutex::new(String::new()),
        }
    }

    pub fn input(&self) -> String {
        self.input.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set_input(&self, amount: &str) {
        *self.input.lock().unwrap_or_else(PoisonError::into_inner) = amount.to_string();
    }

    pub fn is_busy(&self) -> bool {
        self.gate.is_busy()
    }

    /// Base asset the current input would be worth at the current rate
    pub fn preview_base(&self) -> Option<u128> {
        let shares = parse_units(&self.input(), self.asset.decimals()).ok()?;
        self.stats.snapshot().exchange_rate.to_base(shares).ok()
    }

    /// Fill the input with the whole share balance
    pub fn apply_max(&self) -> String {
        let amount = format_units(self.stats.snapshot().user_staked, self.asset.decimals());
        self.set_input(&amount);
        amount
    }

    pub fn validate(&self, share_amount: &str, stats: &Stats) -> Result<u128, ValidationError> {
        let shares = parse_units(share_amount, self.asset.decimals())
            .map_err(|_| ValidationError::InvalidAmount)?;
        if shares == 0 {
            return Err(ValidationError::InvalidAmount);
        }
        if shares > stats.user_staked {
            return Err(ValidationError::InsufficientShares);
        }
        Ok(shares)
    }

    /// Request an unlock for the amount in the input field
    pub async fn submit(&self) -> SdkResult<TxReceipt> {
        let amount = self.input();
        self.request_unlock(&amount).await
    }

    /// Burn `share_amount` shares into a new time-locked unlock request
    pub async fn request_unlock(&self, share_amount: &str) -> SdkResult<TxReceipt> {
        let _guard = self.gate.try_acquire().ok_or(SdkError::Busy)?;
        let owner = self.session.require_network(self.asset.chain_id)?;

        let stats = self.stats.snapshot();
        if !stats.is_for(&owner) {
            return Err(SdkError::Fetch(format!("Balances for {} are not loaded yet", owner.short())));
        }
        let shares = self.validate(share_amount, &stats)?;

        let receipt = self.contract.request_unlock(shares).await.map_err(|e| {
            error!("Unlock request for {} {} failed: {}", share_amount.trim(), self.asset.share_symbol, e);
            SdkError::from_submission(e)
        })?;

        info!(
            "Requested unlock of {} {} (tx {})",
            format_units(shares, self.asset.decimals()),
            self.asset.share_symbol,
            receipt.hash
        );
        self.set_input("");
        self.refresh_after(RefreshTrigger::UnlockRequested).await;
        Ok(receipt)
    }

    /// Claim a matured, unexpired request
    pub async fn claim_unlock(&self, index: u64) -> SdkResult<TxReceipt> {
        let _guard = self.gate.try_acquire().ok_or(SdkError::Busy)?;
        let owner = self.session.require_network(self.asset.chain_id)?;
        if self.store.owner().as_ref() != Some(&owner) {
            debug!("Unlock queue is not loaded for {}", owner.short());
            return Err(SdkError::NotClaimable { index });
        }

        let request = self.store.get(index).ok_or(SdkError::NotClaimable { index })?;
        let state = request.state_at(self.clock.now());
        if state != UnlockState::Ready {
            debug!("Refusing to claim unlock request {} in state {}", index, state);
            return Err(SdkError::NotClaimable { index });
        }

        let receipt = self.contract.claim_unlock(index).await.map_err(|e| {
            error!("Claim of unlock request {} failed: {}", index, e);
            SdkError::from_submission(e)
        })?;

        info!(
            "Claimed {} {} from unlock request {} (tx {})",
            format_units(request.base_amount, self.asset.decimals()),
            self.asset.base_symbol,
            index,
            receipt.hash
        );
        self.store.forget(index);
        self.refresh_after(RefreshTrigger::Claimed).await;
        Ok(receipt)
    }

    async fn refresh_after(&self, trigger: RefreshTrigger) {
        let (stats, queue) = tokio::join!(self.stats.refresh(trigger), self.store.refresh());
        if let Err(e) = stats.and(queue) {
            debug!("Refresh after {} failed: {}", trigger, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_address, ManualClock, MockStakingContract, MockWalletProvider};
    use sparrow_core::WAD;

    struct Fixture {
        contract: Arc<MockStakingContract>,
        clock: Arc<ManualClock>,
        controller: UnstakingController,
    }

    async fn setup(shares: u128) -> Fixture {
        let asset = AssetConfig::avax_fuji();
        let owner = test_address(1);
        let clock = Arc::new(ManualClock::new(10_000));
        let contract = Arc::new(MockStakingContract::new(&asset, owner.clone(), clock.clone()));
        contract.set_share_balance(&owner, shares);
        let provider = Arc::new(MockWalletProvider::new(vec![owner], asset.chain_id));
        let session = Arc::new(WalletSession::new(provider));
        session.connect().await.unwrap();
        let stats = Arc::new(StatsAggregator::new(asset.clone(), contract.clone(), session.clone()));
        stats.refresh(RefreshTrigger::Manual).await.unwrap();
        let store = Arc::new(UnlockRequestStore::new(asset.clone(), contract.clone(), session.clone()));
        let controller = UnstakingController::new(
            asset,
            contract.clone(),
            session,
            stats,
            store,
            clock.clone(),
            TxGate::new(),
        );
        Fixture { contract, clock, controller }
    }

    #[tokio::test]
    async fn test_request_unlock_creates_pending_request() {
        let f = setup(2 * WAD).await;
        f.contract.set_exchange_rate(WAD * 5 / 4);
        f.controller.stats.refresh(RefreshTrigger::Manual).await.unwrap();

        f.controller.set_input("2");
        assert_eq!(f.controller.preview_base(), Some(5 * WAD / 2));
        f.controller.submit().await.unwrap();

        let requests = f.controller.store.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].base_amount, 5 * WAD / 2);
        assert_eq!(requests[0].unlock_time, 10_060);
        assert_eq!(requests[0].expiry_time, 10_060 + 7 * 24 * 3600);
        assert_eq!(f.controller.stats.snapshot().user_staked, 0);
    }

    #[tokio::test]
    async fn test_request_over_balance_makes_no_call() {
        let f = setup(WAD).await;
        let err = f.controller.request_unlock("1.5").await.unwrap_err();
        assert!(matches!(err, SdkError::Validation(ValidationError::InsufficientShares)));
        assert_eq!(f.contract.write_calls(), 0);
    }

    #[tokio::test]
    async fn test_claim_requires_ready_state() {
        let f = setup(WAD).await;
        f.controller.request_unlock("1").await.unwrap();

        let err = f.controller.claim_unlock(0).await.unwrap_err();
        assert!(matches!(err, SdkError::NotClaimable { index: 0 }));

        f.clock.advance(61);
        f.controller.claim_unlock(0).await.unwrap();
        assert!(f.controller.store.get(0).is_none());
        assert_eq!(f.contract.claim_calls(), 1);
    }

    #[tokio::test]
    async fn test_expired_claim_rejected() {
        let f = setup(WAD).await;
        f.controller.request_unlock("1").await.unwrap();
        f.clock.advance(60 + 7 * 24 * 3600 + 1);

        let err = f.controller.claim_unlock(0).await.unwrap_err();
        assert!(matches!(err, SdkError::NotClaimable { .. }));
        assert_eq!(f.contract.claim_calls(), 0);
        assert!(f.controller.store.get(0).is_some());
    }

    #[tokio::test]
    async fn test_queue_of_previous_account_is_not_claimable() {
        let f = setup(2 * WAD).await;
        f.controller.request_unlock("1").await.unwrap();
        f.clock.advance(61);

        f.controller.session.accounts_changed(vec![test_address(2)]);
        let err = f.controller.claim_unlock(0).await.unwrap_err();
        assert!(matches!(err, SdkError::NotClaimable { index: 0 }));
        let err = f.controller.request_unlock("1").await.unwrap_err();
        assert!(matches!(err, SdkError::Fetch(_)));
        assert_eq!(f.contract.claim_calls(), 0);
        assert_eq!(f.contract.request_calls(), 1);
    }

    #[tokio::test]
    async fn test_apply_max_uses_full_share_balance() {
        let f = setup(WAD + 1).await;
        assert_eq!(f.controller.apply_max(), "1.000000000000000001");
    }
}
