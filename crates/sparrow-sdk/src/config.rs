use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sparrow_core::{AssetConfig, AssetKind, UNLOCK_POLL_INTERVAL_SECS};

use crate::error::{SdkError, SdkResult};

/// Client configuration loaded from TOML file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SdkConfig {
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,

    /// Unlock queue poll interval in seconds
    pub unlock_poll_interval_secs: u64,

    /// File holding the persisted asset selection
    pub selection_path: PathBuf,

    /// Asset used when nothing has been persisted yet
    pub default_asset: AssetKind,

    /// Supported assets
    pub assets: Vec<AssetConfig>,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            unlock_poll_interval_secs: UNLOCK_POLL_INTERVAL_SECS,
            selection_path: PathBuf::from("sparrow-state.json"),
            default_asset: AssetKind::Avax,
            assets: AssetKind::ALL.iter().map(|kind| AssetConfig::for_kind(*kind)).collect(),
        }
    }
}

impl SdkConfig {
    /// Load configuration from TOML file
    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            SdkError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let config: SdkConfig = toml::from_str(&content).map_err(|e| {
            SdkError::Config(format!("Failed to parse config file {}: {}", path.display(), e))
        })?;

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> SdkResult<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SdkResult<()> {
        if self.assets.is_empty() {
            return Err(SdkError::Config("assets: at least one asset is required".to_string()));
        }

        if self.unlock_poll_interval_secs == 0 {
            return Err(SdkError::Config(
                "unlock_poll_interval_secs: must be greater than 0".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for asset in &self.assets {
            if !seen.insert(asset.kind) {
                return Err(SdkError::Config(format!("assets: {} is configured twice", asset.kind)));
            }
            asset.validate()?;
        }

        if !seen.contains(&self.default_asset) {
            return Err(SdkError::Config(format!(
                "default_asset: {} is not among the configured assets",
                self.default_asset
            )));
        }

        Ok(())
    }

    /// Configuration for `kind`, if supported
    pub fn asset(&self, kind: AssetKind) -> Option<&AssetConfig> {
        self.assets.iter().find(|asset| asset.kind == kind)
    }

    /// Asset whose contract lives on `chain_id`
    pub fn asset_for_chain(&self, chain_id: u64) -> Option<&AssetConfig> {
        self.assets.iter().find(|asset| asset.chain_id == chain_id)
    }
}
