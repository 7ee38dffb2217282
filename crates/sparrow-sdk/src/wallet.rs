//! Wallet session handle
//!
//! The session is created once at start-up and handed explicitly to every
//! component that needs the connected account. It lives for the whole process
//! and is reset (not dropped) on disconnect.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sparrow_core::{Address, AssetConfig};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{SdkError, SdkResult, WalletError};

/// Parameters for registering a chain with the wallet (EIP-3085)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkParams {
    pub chain_id: u64,
    pub chain_name: String,
    pub currency_name: String,
    pub currency_symbol: String,
    pub decimals: u8,
    pub rpc_urls: Vec<String>,
    pub explorer_urls: Vec<String>,
}

impl From<&AssetConfig> for NetworkParams {
    fn from(asset: &AssetConfig) -> Self {
        Self {
            chain_id: asset.chain_id,
            chain_name: asset.network_name.clone(),
            currency_name: asset.base_symbol.clone(),
            currency_symbol: asset.base_symbol.clone(),
            decimals: asset.decimals(),
            rpc_urls: vec![asset.rpc_url.clone()],
            explorer_urls: vec![asset.explorer_url.clone()],
        }
    }
}

/// Injected wallet (browser extension, WalletConnect, local signer...)
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Ask the user to authorise accounts
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError>;

    /// Accounts already authorised, without prompting
    async fn accounts(&self) -> Result<Vec<Address>, WalletError>;

    async fn chain_id(&self) -> Result<u64, WalletError>;

    async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError>;

    async fn add_chain(&self, params: &NetworkParams) -> Result<(), WalletError>;
}

/// Observable session state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub address: Option<Address>,
    pub chain_id: Option<u64>,
}

impl SessionState {
    pub fn is_connected(&self) -> bool {
        self.address.is_some()
    }
}

pub struct WalletSession {
    provider: Option<Arc<dyn WalletProvider>>,
    state: watch::Sender<SessionState>,
    connecting: AtomicBool,
}

impl WalletSession {
    pub fn new(provider: Arc<dyn WalletProvider>) -> Self {
        Self::build(Some(provider))
    }

    /// Session for an environment with no wallet installed; connecting fails
    /// with a configuration error
    pub fn without_provider() -> Self {
        Self::build(None)
    }

    fn build(provider: Option<Arc<dyn WalletProvider>>) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            provider,
            state,
            connecting: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn address(&self) -> Option<Address> {
        self.state.borrow().address.clone()
    }

    pub fn chain_id(&self) -> Option<u64> {
        self.state.borrow().chain_id
    }

    pub fn is_connected(&self) -> bool {
        self.state.borrow().is_connected()
    }

    pub fn is_connecting(&self) -> bool {
        self.connecting.load(Ordering::Acquire)
    }

    /// Receive every session change (account or chain)
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    fn provider(&self) -> SdkResult<&Arc<dyn WalletProvider>> {
        self.provider
            .as_ref()
            .ok_or_else(|| SdkError::Configuration("Please install MetaMask or Core Wallet".to_string()))
    }

    /// Pick up an existing authorisation without prompting the user
    pub async fn restore(&self) -> SdkResult<Option<Address>> {
        let provider = self.provider()?;
        let accounts = provider.accounts().await?;
        let Some(address) = accounts.into_iter().next() else {
            debug!("No previously authorised wallet account");
            return Ok(None);
        };

        let chain_id = provider.chain_id().await?;
        info!("Restored wallet session {} on chain {}", address.short(), chain_id);
        self.state.send_replace(SessionState {
            address: Some(address.clone()),
            chain_id: Some(chain_id),
        });
        Ok(Some(address))
    }

    /// Prompt the wallet for an account
    pub async fn connect(&self) -> SdkResult<Address> {
        let provider = self.provider()?.clone();
        if self.connecting.swap(true, Ordering::AcqRel) {
            return Err(SdkError::Busy);
        }

        let result = async {
            let accounts = provider.request_accounts().await?;
            let address = accounts.into_iter().next().ok_or(SdkError::NotConnected)?;
            let chain_id = provider.chain_id().await?;
            Ok::<_, SdkError>((address, chain_id))
        }
        .await;
        self.connecting.store(false, Ordering::Release);

        let (address, chain_id) = result.map_err(|e| {
            warn!("Wallet connection failed: {}", e);
            e
        })?;

        info!("Wallet connected {} on chain {}", address.short(), chain_id);
        self.state.send_replace(SessionState {
            address: Some(address.clone()),
            chain_id: Some(chain_id),
        });
        Ok(address)
    }

    pub fn disconnect(&self) {
        info!("Wallet disconnected");
        self.state.send_modify(|state| state.address = None);
    }

    /// Wallet `accountsChanged` event
    pub fn accounts_changed(&self, accounts: Vec<Address>) {
        let address = accounts.into_iter().next();
        self.state.send_if_modified(|state| {
            if state.address == address {
                return false;
            }
            debug!("Wallet account changed to {:?}", address.as_ref().map(Address::short));
            state.address = address;
            true
        });
    }

    /// Wallet `chainChanged` event
    pub fn chain_changed(&self, chain_id: u64) {
        self.state.send_if_modified(|state| {
            if state.chain_id == Some(chain_id) {
                return false;
            }
            debug!("Wallet chain changed to {}", chain_id);
            state.chain_id = Some(chain_id);
            true
        });
    }

    /// Switch the wallet to the asset's chain, registering it first if the
    /// wallet does not know it
    pub async fn switch_network(&self, asset: &AssetConfig) -> SdkResult<()> {
        let provider = self.provider()?;
        match provider.switch_chain(asset.chain_id).await {
            Ok(()) => {}
            Err(WalletError::UnknownChain(_)) => {
                info!("Adding {} (chain {}) to wallet", asset.network_name, asset.chain_id);
                provider.add_chain(&NetworkParams::from(asset)).await?;
                provider.switch_chain(asset.chain_id).await?;
            }
            Err(e) => return Err(e.into()),
        }

        let chain_id = provider.chain_id().await?;
        self.chain_changed(chain_id);
        Ok(())
    }

    /// The connected address, provided the wallet is on `expected_chain`
    pub fn require_network(&self, expected_chain: u64) -> SdkResult<Address> {
        let state = self.state.borrow();
        let address = state.address.clone().ok_or(SdkError::NotConnected)?;
        if state.chain_id != Some(expected_chain) {
            return Err(SdkError::WrongNetwork {
                expected: expected_chain,
                actual: state.chain_id,
            });
        }
        Ok(address)
    }
}

/// Background task that reacts to the session's account changing.
///
/// Chain-only changes are ignored. The task is aborted on cancel or drop and
/// ends by itself once the session is gone.
pub struct AccountWatcher {
    handle: JoinHandle<()>,
}

impl AccountWatcher {
    /// Must be called from within a tokio runtime
    pub fn spawn<F, Fut>(session: &WalletSession, mut on_change: F) -> Self
    where
        F: FnMut(Option<Address>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut changes = session.subscribe();
        let mut current = changes.borrow_and_update().address.clone();

        let handle = tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                let address = changes.borrow_and_update().address.clone();
                if address == current {
                    continue;
                }
                debug!(
                    "Wallet account now {:?}",
                    address.as_ref().map(Address::short)
                );
                current = address.clone();
                on_change(address).await;
            }
        });

        Self { handle }
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for AccountWatcher {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_address, MockWalletProvider};

    #[tokio::test]
    async fn test_connect_and_require_network() {
        let provider = Arc::new(MockWalletProvider::new(vec![test_address(1)], 43113));
        let session = WalletSession::new(provider);

        assert!(matches!(session.require_network(43113), Err(SdkError::NotConnected)));

        let address = session.connect().await.unwrap();
        assert_eq!(address, test_address(1));
        assert_eq!(session.require_network(43113).unwrap(), address);
        assert!(matches!(
            session.require_network(13337),
            Err(SdkError::WrongNetwork { expected: 13337, actual: Some(43113) })
        ));

        session.disconnect();
        assert!(!session.is_connected());
        assert_eq!(session.chain_id(), Some(43113));
    }

    #[tokio::test]
    async fn test_switch_network_adds_unknown_chain() {
        let provider = Arc::new(MockWalletProvider::new(vec![test_address(1)], 43113));
        let session = WalletSession::new(provider.clone());
        session.connect().await.unwrap();

        let beam = AssetConfig::beam_testnet();
        session.switch_network(&beam).await.unwrap();

        assert_eq!(session.chain_id(), Some(13337));
        assert_eq!(provider.added_chains(), vec![13337]);
    }

    #[tokio::test]
    async fn test_missing_provider_is_configuration_error() {
        let session = WalletSession::without_provider();
        assert!(matches!(session.connect().await, Err(SdkError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_account_events_notify_subscribers() {
        let provider = Arc::new(MockWalletProvider::new(vec![test_address(1)], 43113));
        let session = WalletSession::new(provider);
        let mut changes = session.subscribe();

        session.accounts_changed(vec![test_address(2)]);
        assert!(changes.has_changed().unwrap());
        assert_eq!(changes.borrow_and_update().address, Some(test_address(2)));

        // Same account again is not a change
        session.accounts_changed(vec![test_address(2)]);
        assert!(!changes.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_account_watcher_skips_chain_changes() {
        let provider = Arc::new(MockWalletProvider::new(vec![test_address(1)], 43113));
        let session = WalletSession::new(provider);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let watcher = AccountWatcher::spawn(&session, move |address| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(address);
            }
        });

        session.chain_changed(13337);
        session.accounts_changed(vec![test_address(2)]);
        assert_eq!(rx.recv().await, Some(Some(test_address(2))));

        session.disconnect();
        assert_eq!(rx.recv().await, Some(None));

        watcher.cancel();
        tokio::task::yield_now().await;
        session.accounts_changed(vec![test_address(3)]);
        assert!(rx.try_recv().is_err());
    }
}
