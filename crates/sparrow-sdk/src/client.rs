//! Client composition
//!
//! [`StakingClient`] owns the configuration, the wallet session and the
//! active [`AssetContext`]. Switching assets replaces the whole context:
//! fresh stats, a fresh unlock queue and a new poller, never a merge with the
//! previous asset's data.

use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use sparrow_core::{AssetConfig, AssetKind, Clock, SystemClock};
use tracing::{debug, info, warn};

use crate::config::SdkConfig;
use crate::contract::{ContractFactory, StakingContract, TxReceipt};
use crate::error::{SdkError, SdkResult};
use crate::gate::TxGate;
use crate::poller::Poller;
use crate::selection::{AssetSelection, FileKeyValueStore, KeyValueStore};
use crate::stats::{RefreshTrigger, StatsAggregator};
use crate::staking::StakingController;
use crate::unlock_store::UnlockRequestStore;
use crate::unstaking::UnstakingController;
use crate::views::{StatsView, UnlockRequestView};
use crate::wallet::{AccountWatcher, WalletSession};

/// Everything bound to one selected asset
pub struct AssetContext {
    pub asset: AssetConfig,
    pub contract: Arc<dyn StakingContract>,
    pub stats: Arc<StatsAggregator>,
    pub unlocks: Arc<UnlockRequestStore>,
    pub staking: StakingController,
    pub unstaking: UnstakingController,
    session: Arc<WalletSession>,
    clock: Arc<dyn Clock>,
    tasks: Mutex<Option<BackgroundTasks>>,
}

/// Unlock polling plus the account watcher, started and stopped together
struct BackgroundTasks {
    poller: Poller,
    watcher: AccountWatcher,
}

impl BackgroundTasks {
    fn cancel(self) {
        self.poller.cancel();
        self.watcher.cancel();
    }
}

impl AssetContext {
    fn build(
        asset: AssetConfig,
        factory: &dyn ContractFactory,
        session: Arc<WalletSession>,
        clock: Arc<dyn Clock>,
        gate: TxGate,
    ) -> SdkResult<Self> {
        let contract = factory.contract_for(&asset)?;
        let stats = Arc::new(StatsAggregator::new(
            asset.clone(),
            Arc::clone(&contract),
            Arc::clone(&session),
        ));
        let unlocks = Arc::new(UnlockRequestStore::new(
            asset.clone(),
            Arc::clone(&contract),
            Arc::clone(&session),
        ));
        let staking = StakingController::new(
            asset.clone(),
            Arc::clone(&contract),
            Arc::clone(&session),
            Arc::clone(&stats),
            gate.clone(),
        );
        let unstaking = UnstakingController::new(
            asset.clone(),
            Arc::clone(&contract),
            Arc::clone(&session),
            Arc::clone(&stats),
            Arc::clone(&unlocks),
            Arc::clone(&clock),
            gate,
        );

        Ok(Self {
            asset,
            contract,
            stats,
            unlocks,
            staking,
            unstaking,
            session,
            clock,
            tasks: Mutex::new(None),
        })
    }

    pub fn kind(&self) -> AssetKind {
        self.asset.kind
    }

    /// Re-fetch stats and the unlock queue together
    pub async fn refresh(&self, trigger: RefreshTrigger) -> SdkResult<()> {
        let (stats, queue) = tokio::join!(self.stats.refresh(trigger), self.unlocks.refresh());
        stats?;
        queue?;
        Ok(())
    }

    pub fn stats_view(&self) -> StatsView {
        StatsView::new(&self.stats.snapshot(), &self.asset)
    }

    /// Unlock queue as displayed right now
    pub fn unlock_views(&self) -> Vec<UnlockRequestView> {
        UnlockRequestView::list(&self.unlocks.requests(), &self.asset, self.clock.now())
    }

    /// Poll the unlock queue and reload user data whenever the account changes
    fn start_polling(&self, period: Duration) {
        let store = Arc::clone(&self.unlocks);
        let poller = Poller::spawn(format!("{}-unlocks", self.asset.kind), period, move || {
            let store = Arc::clone(&store);
            async move {
                // Failures are logged by the store and the snapshot is kept
                let _ = store.refresh().await;
            }
        });

        let stats = Arc::clone(&self.stats);
        let store = Arc::clone(&self.unlocks);
        let watcher = AccountWatcher::spawn(&self.session, move |_| {
            let stats = Arc::clone(&stats);
            let store = Arc::clone(&store);
            async move {
                let _ = tokio::join!(stats.refresh(RefreshTrigger::WalletChanged), store.refresh());
            }
        });

        let previous = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(BackgroundTasks { poller, watcher });
        if let Some(previous) = previous {
            previous.cancel();
        }
    }

    fn stop_polling(&self) {
        let tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(tasks) = tasks {
            tasks.cancel();
        }
    }

    pub fn is_polling(&self) -> bool {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(false, |tasks| !tasks.poller.is_finished())
    }
}

/// Whether the wallet is on the chain the active asset requires
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkStatus {
    pub required_chain: u64,
    pub network_name: String,
    pub current_chain: Option<u64>,
}

impl NetworkStatus {
    pub fn is_correct(&self) -> bool {
        self.current_chain == Some(self.required_chain)
    }
}

/// Sparrow staking client
pub struct StakingClient {
    config: SdkConfig,
    session: Arc<WalletSession>,
    factory: Arc<dyn ContractFactory>,
    selection: AssetSelection,
    clock: Arc<dyn Clock>,
    gate: TxGate,
    active: RwLock<Option<Arc<AssetContext>>>,
}

impl StakingClient {
    pub fn new(
        config: SdkConfig,
        session: Arc<WalletSession>,
        factory: Arc<dyn ContractFactory>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> SdkResult<Self> {
        config.validate()?;
        let selection = AssetSelection::new(store, config.default_asset);
        Ok(Self {
            config,
            session,
            factory,
            selection,
            clock,
            gate: TxGate::new(),
            active: RwLock::new(None),
        })
    }

    /// Client persisting its selection to `config.selection_path` and reading
    /// wall-clock time
    pub fn with_defaults(
        config: SdkConfig,
        session: Arc<WalletSession>,
        factory: Arc<dyn ContractFactory>,
    ) -> SdkResult<Self> {
        let store = Arc::new(FileKeyValueStore::new(config.selection_path.clone()));
        Self::new(config, session, factory, store, Arc::new(SystemClock))
    }

    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<WalletSession> {
        &self.session
    }

    pub fn is_busy(&self) -> bool {
        self.gate.is_busy()
    }

    /// Active asset context
    pub fn active(&self) -> SdkResult<Arc<AssetContext>> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| SdkError::Configuration("No asset selected".to_string()))
    }

    /// Restore the wallet session and the persisted asset, then activate it
    pub async fn start(&self) -> SdkResult<Arc<AssetContext>> {
        match self.session.restore().await {
            Ok(Some(address)) => debug!("Resuming as {}", address.short()),
            Ok(None) => {}
            Err(SdkError::Configuration(reason)) => debug!("No wallet: {}", reason),
            Err(e) => warn!("Failed to restore wallet session: {}", e),
        }

        let kind = self.selection.load();
        let kind = if self.config.asset(kind).is_some() {
            kind
        } else {
            self.config.default_asset
        };
        info!("Starting with {}", kind);
        self.select_asset(kind).await
    }

    /// Switch to `kind`, discarding everything fetched for the previous asset
    pub async fn select_asset(&self, kind: AssetKind) -> SdkResult<Arc<AssetContext>> {
        let asset = self
            .config
            .asset(kind)
            .cloned()
            .ok_or_else(|| SdkError::Configuration(format!("{} is not configured", kind)))?;

        let context = Arc::new(AssetContext::build(
            asset,
            self.factory.as_ref(),
            Arc::clone(&self.session),
            Arc::clone(&self.clock),
            self.gate.clone(),
        )?);

        let previous = self
            .active
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Arc::clone(&context));
        if let Some(previous) = previous {
            debug!("Leaving {}", previous.kind());
            previous.stop_polling();
        }

        if let Err(e) = self.selection.save(kind) {
            warn!("Failed to persist selected asset: {}", e);
        }

        if let Err(e) = context.refresh(RefreshTrigger::AssetChanged).await {
            debug!("Initial {} refresh failed: {}", kind, e);
        }

        {
            // A newer selection may have replaced this context during the refresh
            let active = self.active.read().unwrap_or_else(PoisonError::into_inner);
            if !active.as_ref().map_or(false, |current| Arc::ptr_eq(current, &context)) {
                debug!("{} was superseded before polling started", kind);
                return Ok(context);
            }
            context.start_polling(Duration::from_secs(self.config.unlock_poll_interval_secs));
        }

        info!("Selected {} on {}", kind, context.asset.network_name);
        Ok(context)
    }

    /// Prompt the wallet, then reload balances for the new account
    pub async fn connect(&self) -> SdkResult<()> {
        self.session.connect().await?;
        self.wallet_changed().await
    }

    pub async fn disconnect(&self) -> SdkResult<()> {
        self.session.disconnect();
        self.wallet_changed().await
    }

    /// The wallet's account changed; reload user-specific data
    pub async fn wallet_changed(&self) -> SdkResult<()> {
        self.active()?.refresh(RefreshTrigger::WalletChanged).await
    }

    /// Manual refresh trigger
    pub async fn refresh(&self) -> SdkResult<()> {
        self.active()?.refresh(RefreshTrigger::Manual).await
    }

    pub fn network_status(&self) -> SdkResult<NetworkStatus> {
        let context = self.active()?;
        Ok(NetworkStatus {
            required_chain: context.asset.chain_id,
            network_name: context.asset.network_name.clone(),
            current_chain: self.session.chain_id(),
        })
    }

    /// Ask the wallet to move to the active asset's chain
    pub async fn switch_network(&self) -> SdkResult<()> {
        let context = self.active()?;
        self.session.switch_network(&context.asset).await
    }

    pub async fn stake(&self, amount: &str) -> SdkResult<TxReceipt> {
        self.active()?.staking.stake(amount).await
    }

    pub async fn request_unlock(&self, share_amount: &str) -> SdkResult<TxReceipt> {
        self.active()?.unstaking.request_unlock(share_amount).await
    }

    pub async fn claim_unlock(&self, index: u64) -> SdkResult<TxReceipt> {
        self.active()?.unstaking.claim_unlock(index).await
    }

    /// Stop background polling
    pub fn shutdown(&self) {
        let active = self.active.read().unwrap_or_else(PoisonError::into_inner).clone();
        if let Some(context) = active {
            info!("Shutting down {} context", context.kind());
            context.stop_polling();
        }
    }
}
