//! Sparrow Staking SDK
//!
//! Async client for the Sparrow liquid staking contracts. Provides:
//! - Wallet session handling and network switching
//! - Staking with local validation
//! - Two-phase unstaking (request unlock, claim)
//! - Protocol and user statistics
//! - The polled unlock request queue
pub mod client;
pub mod config;
pub mod contract;
pub mod error;
pub mod gate;
pub mod poller;
pub mod selection;
pub mod staking;
pub mod stats;
pub mod telemetry;
pub mod testing;
pub mod unlock_store;
pub mod unstaking;
pub mod views;
pub mod wallet;

pub use client::{AssetContext, NetworkStatus, StakingClient};
pub use config::SdkConfig;
pub use contract::{ContractFactory, ContractStats, RawUnlockRequest, StakingContract, TxReceipt};
pub use error::{ContractError, SdkError, SdkResult, ValidationError, WalletError};
pub use gate::TxGate;
pub use poller::Poller;
pub use selection::{AssetSelection, FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use staking::StakingController;
pub use stats::{RefreshTrigger, Stats, StatsAggregator};
pub use unlock_store::UnlockRequestStore;
pub use unstaking::UnstakingController;
pub use views::{StatsView, UnlockRequestView};
pub use wallet::{AccountWatcher, NetworkParams, SessionState, WalletProvider, WalletSession};

// Re-export the core domain types
pub use sparrow_core::{
    Address, AssetConfig, AssetKind, Clock, ExchangeRate, SystemClock, UnlockRequest, UnlockState,
};
