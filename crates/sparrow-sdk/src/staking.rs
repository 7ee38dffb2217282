//! Stake flow: validate locally, submit, wait for confirmation, refresh

use std::sync::{Arc, Mutex, PoisonError};

use sparrow_core::math::{format_units, parse_units};
use sparrow_core::AssetConfig;
use tracing::{debug, error, info};

use crate::contract::{StakingContract, TxReceipt};
use crate::error::{SdkError, SdkResult, ValidationError};
use crate::gate::TxGate;
use crate::stats::{RefreshTrigger, Stats, StatsAggregator};
use crate::wallet::WalletSession;

pub struct StakingController {
    asset: AssetConfig,
    contract: Arc<dyn StakingContract>,
    session: Arc<WalletSession>,
    stats: Arc<StatsAggregator>,
    gate: TxGate,
    input: Mutex<String>,
}

impl StakingController {
    pub fn new(
        asset: AssetConfig,
        contract: Arc<dyn StakingContract>,
        session: Arc<WalletSession>,
        stats: Arc<StatsAggregator>,
        gate: TxGate,
    ) -> Self {
        Self {
            asset,
            contract,
            session,
            stats,
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

    /// Shares the current input would mint at the current rate
    pub fn preview_shares(&self) -> Option<u128> {
        let amount = parse_units(&self.input(), self.asset.decimals()).ok()?;
        self.stats.snapshot().exchange_rate.to_shares(amount).ok()
    }

    /// Fill the input with the balance minus the gas reserve, floored at zero
    pub fn apply_max(&self) -> String {
        let balance = self.stats.snapshot().user_balance;
        let max = balance.saturating_sub(self.asset.gas_reserve);
        let amount = format_units(max, self.asset.decimals());
        self.set_input(&amount);
        amount
    }

    /// Check `amount` against the asset minimum and the user's balance
    pub fn validate(&self, amount: &str, stats: &Stats) -> Result<u128, ValidationError> {
        let value = parse_units(amount, self.asset.decimals())
            .map_err(|_| ValidationError::InvalidAmount)?;
        if value == 0 {
            return Err(ValidationError::InvalidAmount);
        }
        if value < self.asset.minimum_stake {
            return Err(ValidationError::BelowMinimum {
                minimum: self.asset.minimum_stake,
            });
        }
        if value > stats.user_balance {
            return Err(ValidationError::InsufficientBalance);
        }
        Ok(value)
    }

    /// Stake the amount currently in the input field
    pub async fn submit(&self) -> SdkResult<TxReceipt> {
        let amount = self.input();
        self.stake(&amount).await
    }

    /// Stake `amount` (decimal, in base asset).
    ///
    /// Resolves once the transaction is confirmed. On success the input is
    /// cleared and stats are refreshed; on failure nothing is mutated.
    pub async fn stake(&self, amount: &str) -> SdkResult<TxReceipt> {
        let _guard = self.gate.try_acquire().ok_or(SdkError::Busy)?;
        let owner = self.session.require_network(self.asset.chain_id)?;

        let stats = self.stats.snapshot();
        if !stats.is_for(&owner) {
            return Err(SdkError::Fetch(format!("Balances for {} are not loaded yet", owner.short())));
        }
        let value = self.validate(amount, &stats)?;

        debug!("Submitting stake of {} {}", format_units(value, self.asset.decimals()), self.asset.base_symbol);
        let receipt = self.contract.stake(value).await.map_err(|e| {
            error!("Stake of {} {} failed: {}", amount.trim(), self.asset.base_symbol, e);
            SdkError::from_submission(e)
        })?;

        info!(
            "Staked {} {} (tx {})",
            format_units(value, self.asset.decimals()),
            self.asset.base_symbol,
            receipt.hash
        );
        self.set_input("");

        if let Err(e) = self.stats.refresh(RefreshTrigger::Staked).await {
            debug!("Post-stake refresh failed: {}", e);
        }
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_address, ManualClock, MockStakingContract, MockWalletProvider};
    use sparrow_core::WAD;

    async fn setup(asset: AssetConfig, balance: u128) -> (Arc<MockStakingContract>, StakingController) {
        let owner = test_address(1);
        let contract = Arc::new(MockStakingContract::new(&asset, owner.clone(), Arc::new(ManualClock::new(0))));
        contract.set_native_balance(&owner, balance);
        let provider = Arc::new(MockWalletProvider::new(vec![owner], asset.chain_id));
        let session = Arc::new(WalletSession::new(provider));
        session.connect().await.unwrap();
        let stats = Arc::new(StatsAggregator::new(asset.clone(), contract.clone(), session.clone()));
        stats.refresh(RefreshTrigger::Manual).await.unwrap();
        let controller = StakingController::new(asset, contract.clone(), session, stats, TxGate::new());
        (contract, controller)
    }

    #[tokio::test]
    async fn test_validation_order() {
        let (_, controller) = setup(AssetConfig::avax_fuji(), WAD).await;
        let stats = controller.stats.snapshot();

        assert_eq!(controller.validate("", &stats), Err(ValidationError::InvalidAmount));
        assert_eq!(controller.validate("abc", &stats), Err(ValidationError::InvalidAmount));
        assert_eq!(controller.validate("0", &stats), Err(ValidationError::InvalidAmount));
        assert_eq!(
            controller.validate("0.05", &stats),
            Err(ValidationError::BelowMinimum { minimum: WAD / 10 })
        );
        assert_eq!(controller.validate("1.5", &stats), Err(ValidationError::InsufficientBalance));
        assert_eq!(controller.validate("0.1", &stats), Ok(WAD / 10));
    }

    #[tokio::test]
    async fn test_apply_max_keeps_gas_reserve() {
        let (_, controller) = setup(AssetConfig::avax_fuji(), 2 * WAD).await;
        assert_eq!(controller.apply_max(), "1.99");
        assert_eq!(controller.input(), "1.99");

        let (_, poor) = setup(AssetConfig::avax_fuji(), WAD / 200).await;
        assert_eq!(poor.apply_max(), "0");
    }

    #[tokio::test]
    async fn test_stake_clears_input_and_refreshes() {
        let (contract, controller) = setup(AssetConfig::avax_fuji(), 2 * WAD).await;
        controller.set_input("1");
        assert_eq!(controller.preview_shares(), Some(WAD));

        controller.submit().await.unwrap();

        assert_eq!(contract.stake_calls(), 1);
        assert_eq!(controller.input(), "");
        let stats = controller.stats.snapshot();
        assert_eq!(stats.user_staked, WAD);
        assert_eq!(stats.user_balance, WAD);
    }
}
