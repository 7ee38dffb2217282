//! # Protocol Constants
//!
//! Fixed-point scales, display precision, and the default protocol timings
//! used when an asset configuration does not override them.

// ============================================================================
// Fixed-Point Constants
// ============================================================================

/// Decimals of the native assets (AVAX, BEAM) and their share tokens
pub const NATIVE_DECIMALS: u8 = 18;

/// WAD fixed-point scale: 1.0 == 10^18
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// Largest decimals value `10^decimals` can represent in a u128
pub const MAX_DECIMALS: u8 = 38;

/// Basis points denominator (10,000 = 100%)
pub const BPS_DENOMINATOR: u32 = 10_000;

// ============================================================================
// Display Precision
// ============================================================================

/// Fractional digits shown for share amounts and per-user values
pub const SHARE_DISPLAY_DIGITS: u8 = 4;

/// Fractional digits shown for aggregate totals
pub const TOTAL_DISPLAY_DIGITS: u8 = 2;

/// Fractional digits shown for the exchange rate
pub const RATE_DISPLAY_DIGITS: u8 = 4;

// ============================================================================
// Unlock Queue Timing
// ============================================================================

/// Seconds between requesting an unlock and being able to claim it
pub const DEFAULT_UNLOCK_DELAY_SECS: u64 = 60;

/// Seconds after maturation during which a request stays claimable (7 days)
pub const DEFAULT_CLAIM_WINDOW_SECS: u64 = 7 * SECONDS_PER_DAY;

/// Refresh cadence of the unlock queue
pub const UNLOCK_POLL_INTERVAL_SECS: u64 = 10;

pub const SECONDS_PER_MINUTE: u64 = 60;
pub const SECONDS_PER_HOUR: u64 = 3_600;
pub const SECONDS_PER_DAY: u64 = 86_400;

// ============================================================================
// Staking Parameters
// ============================================================================

/// Native asset kept back by the MAX helper to pay transaction fees (0.01)
pub const DEFAULT_GAS_RESERVE: u128 = WAD / 100;

/// Key under which the selected asset is persisted
pub const SELECTED_ASSET_KEY: &str = "selectedAsset";
