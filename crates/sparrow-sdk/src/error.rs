//! SDK error types

use sparrow_core::{AssetConfig, CoreError};
use thiserror::Error;

/// Local input checks; never reach the contract
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter a valid amount")]
    InvalidAmount,

    #[error("Amount is below the minimum stake of {minimum} base units")]
    BelowMinimum { minimum: u128 },

    #[error("Insufficient balance")]
    InsufficientBalance,

    #[error("Insufficient share balance")]
    InsufficientShares,
}

/// Errors reported by the external staking contract interface
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    /// The user declined to sign
    #[error("Transaction rejected: {0}")]
    Rejected(String),

    /// Node or provider failure
    #[error("Provider error: {0}")]
    Provider(String),

    /// The contract reverted
    #[error("Execution reverted: {0}")]
    Reverted(String),

    /// No provider or signer available
    #[error("Contract unavailable: {0}")]
    Unavailable(String),
}

/// Errors reported by the wallet collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("No wallet provider found")]
    NoProvider,

    #[error("Request rejected: {0}")]
    Rejected(String),

    /// The wallet does not know the chain yet (EIP-3326 code 4902)
    #[error("Unrecognized chain {0}")]
    UnknownChain(u64),

    #[error("Wallet provider error: {0}")]
    Provider(String),
}

/// SDK error type
#[derive(Error, Debug)]
pub enum SdkError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A write was rejected, failed in the provider, or reverted
    #[error("Submission failed: {0}")]
    Submission(String),

    /// A read failed; the previous snapshot is kept
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// Required collaborator missing (provider, signer, contract)
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Wallet not connected")]
    NotConnected,

    #[error("Wrong network: expected chain {expected}, connected to {actual:?}")]
    WrongNetwork { expected: u64, actual: Option<u64> },

    #[error("Another transaction is in flight")]
    Busy,

    #[error("Unlock request {index} is not claimable")]
    NotClaimable { index: u64 },

    /// Invalid or unreadable configuration file
    #[error("Invalid config: {0}")]
    Config(String),

    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for SDK operations
pub type SdkResult<T> = Result<T, SdkError>;

impl SdkError {
    /// Map a failed write at the controller boundary
    pub fn from_submission(err: ContractError) -> Self {
        match err {
            ContractError::Unavailable(reason) => SdkError::Configuration(reason),
            other => SdkError::Submission(other.to_string()),
        }
    }

    /// Map a failed read at the refresh boundary
    pub fn from_fetch(err: ContractError) -> Self {
        match err {
            ContractError::Unavailable(reason) => SdkError::Configuration(reason),
            other => SdkError::Fetch(other.to_string()),
        }
    }

    /// Whether the error was raised before anything was sent to the contract
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            SdkError::Validation(_)
                | SdkError::NotConnected
                | SdkError::WrongNetwork { .. }
                | SdkError::Busy
                | SdkError::NotClaimable { .. }
        )
    }

    /// Human-readable message for the asset the action targeted
    pub fn user_message(&self, asset: &AssetConfig) -> String {
        match self {
            SdkError::Validation(ValidationError::InvalidAmount) => {
                "Please enter a valid amount".to_string()
            }
            SdkError::Validation(ValidationError::BelowMinimum { minimum }) => format!(
                "Minimum stake is {} {}",
                sparrow_core::math::format_units(*minimum, asset.decimals()),
                asset.base_symbol
            ),
            SdkError::Validation(ValidationError::InsufficientBalance) => {
                format!("Insufficient {} balance", asset.base_symbol)
            }
            SdkError::Validation(ValidationError::InsufficientShares) => {
                format!("Insufficient {} balance", asset.share_symbol)
            }
            SdkError::WrongNetwork { .. } => format!("Please switch to {}", asset.network_name),
            SdkError::NotConnected => "Please connect your wallet".to_string(),
            SdkError::Busy => "Please wait for the pending transaction".to_string(),
            SdkError::NotClaimable { .. } => "This unlock request cannot be claimed".to_string(),
            SdkError::Submission(reason)
            | SdkError::Fetch(reason)
            | SdkError::Configuration(reason) => reason.clone(),
            other => other.to_string(),
        }
    }
}

impl From<toml::de::Error> for SdkError {
    fn from(err: toml::de::Error) -> Self {
        SdkError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for SdkError {
    fn from(err: toml::ser::Error) -> Self {
        SdkError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for SdkError {
    fn from(err: serde_json::Error) -> Self {
        SdkError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sparrow_core::WAD;

    #[test]
    fn test_user_messages() {
        let avax = AssetConfig::avax_fuji();

        let err = SdkError::from(ValidationError::BelowMinimum { minimum: WAD / 10 });
        assert_eq!(err.user_message(&avax), "Minimum stake is 0.1 AVAX");

        let err = SdkError::from(ValidationError::InsufficientShares);
        assert_eq!(err.user_message(&avax), "Insufficient spAVAX balance");

        let err = SdkError::WrongNetwork { expected: 43113, actual: Some(1) };
        assert_eq!(err.user_message(&avax), "Please switch to Avalanche Fuji Testnet");
    }

    #[test]
    fn test_contract_error_mapping() {
        let err = SdkError::from_submission(ContractError::Reverted("not ready".into()));
        assert!(matches!(err, SdkError::Submission(ref m) if m.contains("not ready")));

        let err = SdkError::from_fetch(ContractError::Unavailable("no signer".into()));
        assert!(matches!(err, SdkError::Configuration(_)));

        assert!(SdkError::Busy.is_local());
        assert!(!SdkError::Submission("x".into()).is_local());
    }
}
