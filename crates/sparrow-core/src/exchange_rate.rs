//! # Exchange Rate Conversion
//!
//! `1 share = rate x base asset`. The rate is a WAD fixed-point value as
//! returned by the staking contract's `getStats()`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{RATE_DISPLAY_DIGITS, WAD};
use crate::errors::{CoreError, CoreResult};
use crate::math::{format_fixed, mul_div_u128, parse_units, Rounding};

/// Base-asset value of one share token, WAD scaled
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u128", into = "u128")]
pub struct ExchangeRate(u128);

impl ExchangeRate {
    /// 1 share == 1 base unit. Only meaningful as a loading placeholder or a
    /// genuine 1:1 rate reported by the contract.
    pub const ONE: ExchangeRate = ExchangeRate(WAD);

    /// Wrap a WAD-scaled rate read from the contract
    pub fn from_wad(wad: u128) -> CoreResult<Self> {
        if wad == 0 {
            return Err(CoreError::InvalidExchangeRate);
        }
        Ok(Self(wad))
    }

    /// Parse a decimal rate such as `"1.25"`
    pub fn from_decimal(rate: &str) -> CoreResult<Self> {
        Self::from_wad(parse_units(rate, 18)?)
    }

    pub fn as_wad(&self) -> u128 {
        self.0
    }

    /// Base-asset amount -> shares: `base / rate`
    pub fn to_shares(&self, base_amount: u128) -> CoreResult<u128> {
        mul_div_u128(base_amount, WAD, self.0, Rounding::Down)
    }

    /// Shares -> base-asset amount: `shares * rate`
    pub fn to_base(&self, share_amount: u128) -> CoreResult<u128> {
        mul_div_u128(share_amount, self.0, WAD, Rounding::Down)
    }
}

impl Default for ExchangeRate {
    fn default() -> Self {
        Self::ONE
    }
}

impl TryFrom<u128> for ExchangeRate {
    type Error = CoreError;

    fn try_from(wad: u128) -> Result<Self, Self::Error> {
        Self::from_wad(wad)
    }
}

impl From<ExchangeRate> for u128 {
    fn from(rate: ExchangeRate) -> Self {
        rate.0
    }
}

impl fmt::Display for ExchangeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_fixed(self.0, 18, RATE_DISPLAY_DIGITS))
    }
}

/// Shares received for staking `base_amount` at `rate`
pub fn to_shares(base_amount: u128, rate: ExchangeRate) -> CoreResult<u128> {
    rate.to_shares(base_amount)
}

/// Base asset received for unstaking `share_amount` at `rate`
pub fn to_base(share_amount: u128, rate: ExchangeRate) -> CoreResult<u128> {
    rate.to_base(share_amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::format_fixed;

    #[test]
    fn test_zero_rate_is_rejected() {
        assert_eq!(ExchangeRate::from_wad(0), Err(CoreError::InvalidExchangeRate));
        assert_eq!(ExchangeRate::from_decimal("0.0"), Err(CoreError::InvalidExchangeRate));
    }

    #[test]
    fn test_stake_at_par() {
        // rate 1.0, stake 1.0 AVAX -> 1.0000 spAVAX
        let shares = to_shares(WAD, ExchangeRate::ONE).unwrap();
        assert_eq!(shares, WAD);
        assert_eq!(format_fixed(shares, 18, 4), "1.0000");
    }

    #[test]
    fn test_unstake_with_accrued_rewards() {
        // rate 1.25, unstake 2.0 spAVAX -> 2.5000 AVAX
        let rate = ExchangeRate::from_decimal("1.25").unwrap();
        let base = to_base(2 * WAD, rate).unwrap();
        assert_eq!(base, 2 * WAD + WAD / 2);
        assert_eq!(format_fixed(base, 18, 4), "2.5000");
    }

    #[test]
    fn test_to_shares_rounds_down() {
        let rate = ExchangeRate::from_decimal("3").unwrap();
        // 1 / 3 leaves a remainder; the caller never receives more than owed
        assert_eq!(rate.to_shares(WAD).unwrap(), 333_333_333_333_333_333);
    }

    #[test]
    fn test_display() {
        assert_eq!(ExchangeRate::ONE.to_string(), "1.0000");
        assert_eq!(ExchangeRate::from_decimal("1.123456").unwrap().to_string(), "1.1235");
    }
}
