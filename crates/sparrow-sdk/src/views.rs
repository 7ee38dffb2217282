//! Display-ready strings derived from snapshots
//!
//! Rounding here is presentation only; nothing produced by this module is fed
//! back into a submission.

use serde::Serialize;
use sparrow_core::math::format_display;
use sparrow_core::{
    AssetConfig, UnlockRequest, UnlockState, RATE_DISPLAY_DIGITS, SHARE_DISPLAY_DIGITS,
    TOTAL_DISPLAY_DIGITS,
};

use crate::stats::Stats;

/// Shown in place of the rate until the first fetch lands
pub const LOADING_MARKER: &str = "Loading...";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsView {
    /// `APY` or `APR`
    pub yield_label: String,
    pub yield_value: String,
    pub total_staked: String,
    pub user_staked: String,
    pub user_value: String,
    pub user_balance: String,
    /// `1 spAVAX = 1.2500 AVAX`
    pub exchange_rate: String,
    pub loading: bool,
}

impl StatsView {
    pub fn new(stats: &Stats, asset: &AssetConfig) -> Self {
        let decimals = asset.decimals();
        let share = |amount: u128| format_display(amount, decimals, SHARE_DISPLAY_DIGITS);

        let exchange_rate = if stats.loaded {
            format!(
                "1 {} = {} {}",
                asset.share_symbol,
                format_display(stats.exchange_rate.as_wad(), decimals, RATE_DISPLAY_DIGITS),
                asset.base_symbol
            )
        } else {
            LOADING_MARKER.to_string()
        };

        // Overflow here would need a balance beyond any real supply
        let user_value = stats.user_value().map(share).unwrap_or_else(|_| "-".to_string());

        Self {
            yield_label: stats.yield_label.as_str().to_string(),
            yield_value: asset.yield_display(),
            total_staked: format_display(stats.total_staked, decimals, TOTAL_DISPLAY_DIGITS),
            user_staked: share(stats.user_staked),
            user_value,
            user_balance: share(stats.user_balance),
            exchange_rate,
            loading: !stats.loaded,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnlockRequestView {
    pub index: u64,
    pub share_amount: String,
    pub base_amount: String,
    pub state: UnlockState,
    pub unlock_countdown: String,
    pub expiry_countdown: String,
    pub claim_label: String,
    /// Whether the claim action is enabled
    pub claimable: bool,
}

impl UnlockRequestView {
    /// View of `request` at the instant `now`
    pub fn new(request: &UnlockRequest, asset: &AssetConfig, now: u64) -> Self {
        let decimals = asset.decimals();
        Self {
            index: request.index,
            share_amount: format_display(request.share_amount, decimals, SHARE_DISPLAY_DIGITS),
            base_amount: format_display(request.base_amount, decimals, SHARE_DISPLAY_DIGITS),
            state: request.state_at(now),
            unlock_countdown: request.unlock_countdown(now),
            expiry_countdown: request.expiry_countdown(now),
            claim_label: request.claim_label(now, &asset.base_symbol),
            claimable: request.is_claimable(now),
        }
    }

    pub fn list(requests: &[UnlockRequest], asset: &AssetConfig, now: u64) -> Vec<Self> {
        requests.iter().map(|r| Self::new(r, asset, now)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sparrow_core::{ExchangeRate, WAD};

    #[test]
    fn test_stats_view_formats() {
        let asset = AssetConfig::avax_fuji();
        let mut stats = Stats::loading(&asset);
        assert_eq!(StatsView::new(&stats, &asset).exchange_rate, LOADING_MARKER);

        stats.loaded = true;
        stats.exchange_rate = ExchangeRate::from_decimal("1.25").unwrap();
        stats.total_staked = 1_234_567 * WAD + WAD / 200;
        stats.user_staked = 2 * WAD;

        let view = StatsView::new(&stats, &asset);
        assert_eq!(view.exchange_rate, "1 spAVAX = 1.2500 AVAX");
        assert_eq!(view.total_staked, "1,234,567.01");
        assert_eq!(view.user_staked, "2.0000");
        assert_eq!(view.user_value, "2.5000");
        assert_eq!(view.yield_label, "APY");
        assert_eq!(view.yield_value, "5.1%");
        assert!(!view.loading);
    }

    #[test]
    fn test_unlock_view_tracks_time() {
        let asset = AssetConfig::avax_fuji();
        let request = UnlockRequest::new(0, WAD, WAD * 5 / 4, 1_060, 1_060 + 7 * 86_400).unwrap();

        let pending = UnlockRequestView::new(&request, &asset, 1_030);
        assert_eq!(pending.state, UnlockState::Pending);
        assert_eq!(pending.base_amount, "1.2500");
        assert_eq!(pending.unlock_countdown, "30s remaining");
        assert!(!pending.claimable);

        let ready = UnlockRequestView::new(&request, &asset, 1_061);
        assert_eq!(ready.state, UnlockState::Ready);
        assert_eq!(ready.claim_label, "Claim AVAX");
        assert!(ready.claimable);

        let expired = UnlockRequestView::new(&request, &asset, 1_060 + 7 * 86_400 + 1);
        assert_eq!(expired.state, UnlockState::Expired);
        assert!(!expired.claimable);
    }
}
