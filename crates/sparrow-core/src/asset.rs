//! # Asset Contexts
//!
//! Each supported base-asset/share-token pair lives on its own chain with its
//! own staking contract. An [`AssetConfig`] is a configuration value; switching
//! between them is a full context switch, never a merge.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::constants::{
    DEFAULT_CLAIM_WINDOW_SECS, DEFAULT_GAS_RESERVE, DEFAULT_UNLOCK_DELAY_SECS, NATIVE_DECIMALS,
    WAD,
};
use crate::errors::{CoreError, CoreResult};
use crate::math::format_units;
use crate::unlock::UnlockSchedule;

/// Supported staking assets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Avax,
    Beam,
}

impl AssetKind {
    pub const ALL: [AssetKind; 2] = [AssetKind::Avax, AssetKind::Beam];

    /// Persisted/serialized name
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Avax => "avax",
            AssetKind::Beam => "beam",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "avax" => Ok(AssetKind::Avax),
            "beam" => Ok(AssetKind::Beam),
            _ => Err(CoreError::UnknownAsset(s.to_string())),
        }
    }
}

/// How the yield figure is labelled for an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum YieldLabel {
    Apy,
    Apr,
}

impl YieldLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            YieldLabel::Apy => "APY",
            YieldLabel::Apr => "APR",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            YieldLabel::Apy => "Annual Percentage Yield",
            YieldLabel::Apr => "Annual Percentage Rate",
        }
    }
}

/// Per-asset protocol and network configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetConfig {
    pub kind: AssetKind,

    /// Native asset symbol, e.g. `AVAX`
    pub base_symbol: String,

    /// Receipt token symbol, e.g. `spAVAX`
    pub share_symbol: String,

    /// Chain the staking contract is deployed on
    pub chain_id: u64,

    pub network_name: String,
    pub rpc_url: String,
    pub explorer_url: String,

    /// Staking contract (also the share token)
    pub contract_address: Address,

    /// Smallest stake accepted, in base units
    #[serde(with = "decimal_units")]
    pub minimum_stake: u128,

    /// Kept back by the MAX helper for transaction fees, in base units
    #[serde(with = "decimal_units")]
    pub gas_reserve: u128,

    pub yield_label: YieldLabel,

    /// Nominal yield in basis points
    pub yield_bps: u32,

    pub unlock_delay_secs: u64,
    pub claim_window_secs: u64,
}

impl AssetConfig {
    /// AVAX on Avalanche Fuji
    pub fn avax_fuji() -> Self {
        Self {
            kind: AssetKind::Avax,
            base_symbol: "AVAX".to_string(),
            share_symbol: "spAVAX".to_string(),
            chain_id: 43113,
            network_name: "Avalanche Fuji Testnet".to_string(),
            rpc_url: "https://api.avax-test.network/ext/bc/C/rpc".to_string(),
            explorer_url: "https://testnet.snowtrace.io".to_string(),
            contract_address: Address(
                "0x8f8926a38d03125c448b5ef5f2edbfc3be8c69d2".to_string(),
            ),
            minimum_stake: WAD / 10, // 0.1 AVAX
            gas_reserve: DEFAULT_GAS_RESERVE,
            yield_label: YieldLabel::Apy,
            yield_bps: 510,
            unlock_delay_secs: DEFAULT_UNLOCK_DELAY_SECS,
            claim_window_secs: DEFAULT_CLAIM_WINDOW_SECS,
        }
    }

    /// BEAM on the Beam L1 testnet
    pub fn beam_testnet() -> Self {
        Self {
            kind: AssetKind::Beam,
            base_symbol: "BEAM".to_string(),
            share_symbol: "spBEAM".to_string(),
            chain_id: 13337,
            network_name: "Beam L1 Testnet".to_string(),
            rpc_url: "https://build.onbeam.com/rpc/testnet".to_string(),
            explorer_url: "https://subnets-test.avax.network/beam".to_string(),
            contract_address: Address(
                "0x21e9726d777400c5dcbf65cf595125b21359a1dd".to_string(),
            ),
            minimum_stake: WAD / 100, // 0.01 BEAM
            gas_reserve: DEFAULT_GAS_RESERVE,
            yield_label: YieldLabel::Apy,
            yield_bps: 500,
            unlock_delay_secs: DEFAULT_UNLOCK_DELAY_SECS,
            claim_window_secs: DEFAULT_CLAIM_WINDOW_SECS,
        }
    }

    /// Built-in configuration for `kind`
    pub fn for_kind(kind: AssetKind) -> Self {
        match kind {
            AssetKind::Avax => Self::avax_fuji(),
            AssetKind::Beam => Self::beam_testnet(),
        }
    }

    pub fn decimals(&self) -> u8 {
        NATIVE_DECIMALS
    }

    pub fn schedule(&self) -> UnlockSchedule {
        UnlockSchedule::new(self.unlock_delay_secs, self.claim_window_secs)
    }

    /// Yield as shown to users, e.g. `5.1%`
    pub fn yield_display(&self) -> String {
        format!("{}%", format_units(self.yield_bps as u128, 2))
    }

    /// Explorer link for the staking contract
    pub fn contract_explorer_url(&self) -> String {
        format!(
            "{}/address/{}",
            self.explorer_url.trim_end_matches('/'),
            self.contract_address
        )
    }

    /// Validate configuration
    pub fn validate(&self) -> CoreResult<()> {
        let asset = self.kind.as_str();
        if self.base_symbol.is_empty() || self.share_symbol.is_empty() {
            return Err(CoreError::invalid_asset_config(asset, "symbols must be non-empty"));
        }
        if self.chain_id == 0 {
            return Err(CoreError::invalid_asset_config(asset, "chain_id must be greater than 0"));
        }
        if self.minimum_stake == 0 {
            return Err(CoreError::invalid_asset_config(asset, "minimum_stake must be greater than 0"));
        }
        if self.unlock_delay_secs == 0 {
            return Err(CoreError::invalid_asset_config(asset, "unlock_delay_secs must be greater than 0"));
        }
        if self.claim_window_secs == 0 {
            return Err(CoreError::invalid_asset_config(asset, "claim_window_secs must be greater than 0"));
        }
        Ok(())
    }
}

// Base-unit amounts are written as decimal strings ("0.1") since TOML
// integers cannot hold a u128
mod decimal_units {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::constants::NATIVE_DECIMALS;
    use crate::math::{format_units, parse_units};

    pub fn serialize<S>(amount: &u128, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_units(*amount, NATIVE_DECIMALS))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u128, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_units(&s, NATIVE_DECIMALS).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_kind_round_trips_through_str() {
        for kind in AssetKind::ALL {
            assert_eq!(kind.as_str().parse::<AssetKind>().unwrap(), kind);
        }
        assert_eq!("BEAM".parse::<AssetKind>().unwrap(), AssetKind::Beam);
        assert!("strk".parse::<AssetKind>().is_err());
    }

    #[test]
    fn test_defaults_are_valid() {
        for kind in AssetKind::ALL {
            let config = AssetConfig::for_kind(kind);
            assert!(config.validate().is_ok());
            assert_eq!(config.kind, kind);
        }
        assert_eq!(AssetConfig::avax_fuji().minimum_stake, WAD / 10);
        assert_eq!(AssetConfig::beam_testnet().minimum_stake, WAD / 100);
    }

    #[test]
    fn test_yield_display_and_links() {
        let avax = AssetConfig::avax_fuji();
        assert_eq!(avax.yield_display(), "5.1%");
        assert_eq!(
            avax.contract_explorer_url(),
            "https://testnet.snowtrace.io/address/0x8f8926a38d03125c448b5ef5f2edbfc3be8c69d2"
        );
        assert_eq!(AssetConfig::beam_testnet().yield_display(), "5%");
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut config = AssetConfig::avax_fuji();
        config.minimum_stake = 0;
        assert!(config.validate().is_err());

        let mut config = AssetConfig::beam_testnet();
        config.unlock_delay_secs = 0;
        assert!(config.validate().is_err());
    }
}
