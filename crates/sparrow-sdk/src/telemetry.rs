//! Logging setup for embedding applications

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::SdkConfig;

/// Install a fmt subscriber filtered by `RUST_LOG`, falling back to
/// `level` for the sparrow crates.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_logging(level: &str) -> bool {
    let level = level.parse().unwrap_or(tracing::Level::INFO);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("sparrow_sdk={},sparrow_core={}", level, level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}

/// [`init_logging`] at the configured level
pub fn init_from_config(config: &SdkConfig) -> bool {
    init_logging(&config.log_level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_harmless() {
        init_logging("debug");
        assert!(!init_logging("info"));
    }
}
