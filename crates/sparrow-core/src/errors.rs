//! # Core Error Types
//!
//! Errors produced by the pure accounting layer. The sdk wraps these into its
//! own taxonomy at the controller boundary.

use thiserror::Error;

/// Core errors shared by every consumer of the accounting model
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    // ========================================================================
    // Math Errors
    // ========================================================================
    #[error("Math overflow")]
    MathOverflow,

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Mul div overflow")]
    MulDivOverflow,

    // ========================================================================
    // Validation Errors
    // ========================================================================
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Too many decimal places: {found} (max {max})")]
    TooManyDecimals { found: usize, max: u8 },

    #[error("Exchange rate must be greater than zero")]
    InvalidExchangeRate,

    #[error("Unlock time {unlock_time} must precede expiry time {expiry_time}")]
    InvalidUnlockWindow { unlock_time: u64, expiry_time: u64 },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Unknown asset: {0}")]
    UnknownAsset(String),

    #[error("Invalid asset configuration for {asset}: {reason}")]
    InvalidAssetConfig { asset: String, reason: String },
}

/// Result type using core errors
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create an invalid amount error with the offending input
    pub fn invalid_amount(input: &str) -> Self {
        Self::InvalidAmount(input.to_string())
    }

    /// Create an asset configuration error
    pub fn invalid_asset_config(asset: &str, reason: &str) -> Self {
        Self::InvalidAssetConfig {
            asset: asset.to_string(),
            reason: reason.to_string(),
        }
    }
}
