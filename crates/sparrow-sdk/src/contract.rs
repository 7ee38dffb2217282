//! External staking contract interface
//!
//! The staking contract is the source of truth. This module only describes the
//! calls the client needs; transports (JSON-RPC, signing, broadcast) implement
//! [`StakingContract`] outside this crate. All amounts are integer base units.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sparrow_core::{Address, AssetConfig};

use crate::error::{ContractError, SdkResult};

pub type ContractResult<T> = Result<T, ContractError>;

/// Raw `getStats()` tuple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractStats {
    /// Base asset held by the protocol
    pub total_staked: u128,
    /// Share tokens in circulation
    pub total_supply: u128,
    /// WAD-scaled base value of one share
    pub exchange_rate: u128,
}

/// Raw `getUnlockRequest(address, index)` tuple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawUnlockRequest {
    pub share_amount: u128,
    pub base_amount: u128,
    pub unlock_time: u64,
    pub expiry_time: u64,
}

/// Confirmed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub hash: String,
}

/// Calls the client makes against one asset's staking contract.
///
/// Write methods resolve only once the transaction is confirmed on-chain.
#[async_trait]
pub trait StakingContract: Send + Sync {
    async fn get_stats(&self) -> ContractResult<ContractStats>;

    /// Share token balance
    async fn balance_of(&self, owner: &Address) -> ContractResult<u128>;

    /// Native asset balance
    async fn native_balance(&self, owner: &Address) -> ContractResult<u128>;

    /// Payable stake of `value` base units
    async fn stake(&self, value: u128) -> ContractResult<TxReceipt>;

    async fn request_unlock(&self, share_amount: u128) -> ContractResult<TxReceipt>;

    async fn claim_unlock(&self, index: u64) -> ContractResult<TxReceipt>;

    async fn get_unlock_request_count(&self, owner: &Address) -> ContractResult<u64>;

    async fn get_unlock_request(&self, owner: &Address, index: u64) -> ContractResult<RawUnlockRequest>;
}

/// Produces the contract handle for an asset context
pub trait ContractFactory: Send + Sync {
    /// Fails with `SdkError::Configuration` when no provider or signer is
    /// available for the asset
    fn contract_for(&self, asset: &AssetConfig) -> SdkResult<Arc<dyn StakingContract>>;
}
