//! # Sparrow Core - Liquid Staking Accounting
//!
//! This crate contains the pure domain logic shared by every Sparrow client.
//! It provides:
//!
//! - Share/base-asset conversion at the contract's exchange rate
//! - Decimal unit parsing and display formatting
//! - The unlock request lifecycle (pending, ready, expired)
//! - Per-asset configuration and protocol constants
//!
//! Nothing in here performs I/O; the async orchestration lives in `sparrow-sdk`.

pub mod address;
pub mod asset;
pub mod constants;
pub mod errors;
pub mod exchange_rate;
pub mod math;
pub mod time;
pub mod unlock;

// Re-export commonly used items
pub use address::Address;
pub use asset::{AssetConfig, AssetKind, YieldLabel};
pub use constants::*;
pub use errors::{CoreError, CoreResult};
pub use exchange_rate::ExchangeRate;
pub use time::{Clock, SystemClock};
pub use unlock::{UnlockRequest, UnlockSchedule, UnlockState};
