//! In-memory doubles for the external collaborators
//!
//! Used by this crate's tests and by embedding applications that want to
//! exercise the controllers without a chain.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use sparrow_core::{Address, AssetConfig, AssetKind, Clock, ExchangeRate, UnlockSchedule, WAD};
use tokio::sync::{oneshot, Notify};

use crate::contract::{
    ContractFactory, ContractResult, ContractStats, RawUnlockRequest, StakingContract, TxReceipt,
};
use crate::error::{ContractError, SdkError, SdkResult, WalletError};
use crate::wallet::{NetworkParams, WalletProvider};

/// Deterministic address with `n` in the last byte
pub fn test_address(n: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[19] = n;
    Address::from_bytes(bytes)
}

/// Clock moved by hand
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(now: u64) -> Self {
        Self {
            now: AtomicU64::new(now),
        }
    }

    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct ContractState {
    stats: ContractStats,
    shares: HashMap<Address, u128>,
    native: HashMap<Address, u128>,
    requests: HashMap<Address, Vec<RawUnlockRequest>>,
    read_failure: Option<ContractError>,
    write_failure: Option<ContractError>,
}

const CLAIMED: RawUnlockRequest = RawUnlockRequest {
    share_amount: 0,
    base_amount: 0,
    unlock_time: 0,
    expiry_time: 0,
};

fn revert(reason: impl ToString) -> ContractError {
    ContractError::Reverted(reason.to_string())
}

/// Staking contract held in memory.
///
/// Writes are sent from `signer`, applied immediately and confirmed on
/// return. Claimed requests read back zeroed, as a deleted storage slot
/// would.
pub struct MockStakingContract {
    signer: Address,
    schedule: UnlockSchedule,
    clock: Arc<dyn Clock>,
    state: Mutex<ContractState>,
    stake_calls: AtomicUsize,
    request_calls: AtomicUsize,
    claim_calls: AtomicUsize,
    read_calls: AtomicUsize,
    tx_count: AtomicU64,
    held_write: Mutex<Option<oneshot::Receiver<()>>>,
    held_stats_read: Mutex<Option<oneshot::Receiver<()>>>,
    held_queue_read: Mutex<Option<oneshot::Receiver<()>>>,
    write_started: Notify,
    stats_read_started: Notify,
    queue_read_started: Notify,
}

impl MockStakingContract {
    pub fn new(asset: &AssetConfig, signer: Address, clock: Arc<dyn Clock>) -> Self {
        Self {
            signer,
            schedule: asset.schedule(),
            clock,
            state: Mutex::new(ContractState {
                stats: ContractStats {
                    total_staked: 0,
                    total_supply: 0,
                    exchange_rate: WAD,
                },
                shares: HashMap::new(),
                native: HashMap::new(),
                requests: HashMap::new(),
                read_failure: None,
                write_failure: None,
            }),
            stake_calls: AtomicUsize::new(0),
            request_calls: AtomicUsize::new(0),
            claim_calls: AtomicUsize::new(0),
            read_calls: AtomicUsize::new(0),
            tx_count: AtomicU64::new(0),
            held_write: Mutex::new(None),
            held_stats_read: Mutex::new(None),
            held_queue_read: Mutex::new(None),
            write_started: Notify::new(),
            stats_read_started: Notify::new(),
            queue_read_started: Notify::new(),
        }
    }

    fn state(&self) -> MutexGuard<'_, ContractState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_exchange_rate(&self, wad: u128) {
        self.state().stats.exchange_rate = wad;
    }

    pub fn set_totals(&self, total_staked: u128, total_supply: u128) {
        let mut state = self.state();
        state.stats.total_staked = total_staked;
        state.stats.total_supply = total_supply;
    }

    pub fn set_share_balance(&self, owner: &Address, amount: u128) {
        self.state().shares.insert(owner.clone(), amount);
    }

    pub fn set_native_balance(&self, owner: &Address, amount: u128) {
        self.state().native.insert(owner.clone(), amount);
    }

    /// Append a raw request to `owner`'s queue as-is, without validation
    pub fn push_request(
        &self,
        owner: &Address,
        share_amount: u128,
        base_amount: u128,
        unlock_time: u64,
        expiry_time: u64,
    ) {
        self.state()
            .requests
            .entry(owner.clone())
            .or_default()
            .push(RawUnlockRequest {
                share_amount,
                base_amount,
                unlock_time,
                expiry_time,
            });
    }

    pub fn share_balance(&self, owner: &Address) -> u128 {
        self.state().shares.get(owner).copied().unwrap_or(0)
    }

    pub fn native_balance_of(&self, owner: &Address) -> u128 {
        self.state().native.get(owner).copied().unwrap_or(0)
    }

    /// Make every read fail with `failure` (or succeed again with `None`)
    pub fn fail_reads(&self, failure: Option<ContractError>) {
        self.state().read_failure = failure;
    }

    /// Make every write fail with `failure` (or succeed again with `None`)
    pub fn fail_writes(&self, failure: Option<ContractError>) {
        self.state().write_failure = failure;
    }

    /// Keep the next write pending until the returned sender fires or drops
    pub fn hold_next_write(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.held_write.lock().unwrap_or_else(PoisonError::into_inner) = Some(rx);
        tx
    }

    /// Keep the next `get_stats` response pending. The response carries the
    /// state as it was when the call arrived.
    pub fn hold_next_stats_read(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.held_stats_read.lock().unwrap_or_else(PoisonError::into_inner) = Some(rx);
        tx
    }

    /// Same as [`Self::hold_next_stats_read`] for `get_unlock_request_count`
    pub fn hold_next_queue_read(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.held_queue_read.lock().unwrap_or_else(PoisonError::into_inner) = Some(rx);
        tx
    }

    /// Resolves once a write has reached the contract
    pub async fn write_started(&self) {
        self.write_started.notified().await;
    }

    /// Resolves once a `get_stats` call has reached the contract
    pub async fn stats_read_started(&self) {
        self.stats_read_started.notified().await;
    }

    pub async fn queue_read_started(&self) {
        self.queue_read_started.notified().await;
    }

    pub fn stake_calls(&self) -> usize {
        self.stake_calls.load(Ordering::SeqCst)
    }

    pub fn request_calls(&self) -> usize {
        self.request_calls.load(Ordering::SeqCst)
    }

    pub fn claim_calls(&self) -> usize {
        self.claim_calls.load(Ordering::SeqCst)
    }

    /// Submissions of any kind
    pub fn write_calls(&self) -> usize {
        self.stake_calls() + self.request_calls() + self.claim_calls()
    }

    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    fn begin_read(&self) -> ContractResult<()> {
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        match &self.state().read_failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    async fn begin_write(&self) -> ContractResult<()> {
        let held = self.held_write.lock().unwrap_or_else(PoisonError::into_inner).take();
        self.write_started.notify_one();
        if let Some(release) = held {
            let _ = release.await;
        }
        match &self.state().write_failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn receipt(&self) -> TxReceipt {
        let n = self.tx_count.fetch_add(1, Ordering::SeqCst) + 1;
        TxReceipt {
            hash: format!("0x{:064x}", n),
        }
    }
}

#[async_trait]
impl StakingContract for MockStakingContract {
    async fn get_stats(&self) -> ContractResult<ContractStats> {
        self.begin_read()?;
        let stats = self.state().stats;

        let held = self.held_stats_read.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(release) = held {
            self.stats_read_started.notify_one();
            let _ = release.await;
        }
        Ok(stats)
    }

    async fn balance_of(&self, owner: &Address) -> ContractResult<u128> {
        self.begin_read()?;
        Ok(self.share_balance(owner))
    }

    async fn native_balance(&self, owner: &Address) -> ContractResult<u128> {
        self.begin_read()?;
        Ok(self.native_balance_of(owner))
    }

    async fn stake(&self, value: u128) -> ContractResult<TxReceipt> {
        self.stake_calls.fetch_add(1, Ordering::SeqCst);
        self.begin_write().await?;

        let mut state = self.state();
        let rate = ExchangeRate::from_wad(state.stats.exchange_rate).map_err(revert)?;
        let balance = state.native.get(&self.signer).copied().unwrap_or(0);
        if value > balance {
            return Err(revert("insufficient funds"));
        }
        let shares = rate.to_shares(value).map_err(revert)?;

        state.native.insert(self.signer.clone(), balance - value);
        *state.shares.entry(self.signer.clone()).or_default() += shares;
        state.stats.total_staked += value;
        state.stats.total_supply += shares;
        drop(state);

        Ok(self.receipt())
    }

    async fn request_unlock(&self, share_amount: u128) -> ContractResult<TxReceipt> {
        self.request_calls.fetch_add(1, Ordering::SeqCst);
        self.begin_write().await?;

        let mut state = self.state();
        let rate = ExchangeRate::from_wad(state.stats.exchange_rate).map_err(revert)?;
        let shares = state.shares.get(&self.signer).copied().unwrap_or(0);
        if share_amount == 0 || share_amount > shares {
            return Err(revert("insufficient shares"));
        }
        let base_amount = rate.to_base(share_amount).map_err(revert)?;
        let (unlock_time, expiry_time) = self.schedule.window_from(self.clock.now());

        state.shares.insert(self.signer.clone(), shares - share_amount);
        state.stats.total_supply = state.stats.total_supply.saturating_sub(share_amount);
        state
            .requests
            .entry(self.signer.clone())
            .or_default()
            .push(RawUnlockRequest {
                share_amount,
                base_amount,
                unlock_time,
                expiry_time,
            });
        drop(state);

        Ok(self.receipt())
    }

    async fn claim_unlock(&self, index: u64) -> ContractResult<TxReceipt> {
        self.claim_calls.fetch_add(1, Ordering::SeqCst);
        self.begin_write().await?;

        let now = self.clock.now();
        let mut state = self.state();
        let request = state
            .requests
            .get(&self.signer)
            .and_then(|queue| queue.get(index as usize))
            .copied()
            .ok_or_else(|| revert("invalid request index"))?;

        if request == CLAIMED {
            return Err(revert("already claimed"));
        }
        if now < request.unlock_time {
            return Err(revert("unlock period not finished"));
        }
        if now > request.expiry_time {
            return Err(revert("request expired"));
        }

        if let Some(slot) = state
            .requests
            .get_mut(&self.signer)
            .and_then(|queue| queue.get_mut(index as usize))
        {
            *slot = CLAIMED;
        }
        *state.native.entry(self.signer.clone()).or_default() += request.base_amount;
        state.stats.total_staked = state.stats.total_staked.saturating_sub(request.base_amount);
        drop(state);

        Ok(self.receipt())
    }

    async fn get_unlock_request_count(&self, owner: &Address) -> ContractResult<u64> {
        self.begin_read()?;
        let count = self.state().requests.get(owner).map_or(0, |queue| queue.len() as u64);

        let held = self.held_queue_read.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(release) = held {
            self.queue_read_started.notify_one();
            let _ = release.await;
        }
        Ok(count)
    }

    async fn get_unlock_request(&self, owner: &Address, index: u64) -> ContractResult<RawUnlockRequest> {
        self.begin_read()?;
        self.state()
            .requests
            .get(owner)
            .and_then(|queue| queue.get(index as usize))
            .copied()
            .ok_or_else(|| revert("invalid request index"))
    }
}

/// Hands out one [`MockStakingContract`] per asset
pub struct MockContractFactory {
    contracts: HashMap<AssetKind, Arc<MockStakingContract>>,
    unavailable: Mutex<HashSet<AssetKind>>,
}

impl MockContractFactory {
    pub fn new(assets: &[AssetConfig], signer: Address, clock: Arc<dyn Clock>) -> Self {
        let contracts = assets
            .iter()
            .map(|asset| {
                let contract = MockStakingContract::new(asset, signer.clone(), Arc::clone(&clock));
                (asset.kind, Arc::new(contract))
            })
            .collect();
        Self {
            contracts,
            unavailable: Mutex::new(HashSet::new()),
        }
    }

    pub fn contract(&self, kind: AssetKind) -> Option<Arc<MockStakingContract>> {
        self.contracts.get(&kind).cloned()
    }

    /// Simulate a missing provider for `kind`
    pub fn set_unavailable(&self, kind: AssetKind, unavailable: bool) {
        let mut set = self.unavailable.lock().unwrap_or_else(PoisonError::into_inner);
        if unavailable {
            set.insert(kind);
        } else {
            set.remove(&kind);
        }
    }
}

impl ContractFactory for MockContractFactory {
    fn contract_for(&self, asset: &AssetConfig) -> SdkResult<Arc<dyn StakingContract>> {
        let unavailable = self
            .unavailable
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&asset.kind);
        match self.contracts.get(&asset.kind) {
            Some(contract) if !unavailable => Ok(Arc::clone(contract) as Arc<dyn StakingContract>),
            _ => Err(SdkError::Configuration(format!(
                "No provider available for {}",
                asset.network_name
            ))),
        }
    }
}

/// Wallet that knows a fixed set of chains and approves every request
/// unless told otherwise
pub struct MockWalletProvider {
    accounts: Mutex<Vec<Address>>,
    chain_id: AtomicU64,
    known_chains: Mutex<HashSet<u64>>,
    added_chains: Mutex<Vec<u64>>,
    reject: AtomicBool,
}

impl MockWalletProvider {
    /// Wallet holding `accounts`, currently on `chain_id`; only that chain is
    /// known initially
    pub fn new(accounts: Vec<Address>, chain_id: u64) -> Self {
        Self {
            accounts: Mutex::new(accounts),
            chain_id: AtomicU64::new(chain_id),
            known_chains: Mutex::new(HashSet::from([chain_id])),
            added_chains: Mutex::new(Vec::new()),
            reject: AtomicBool::new(false),
        }
    }

    pub fn set_accounts(&self, accounts: Vec<Address>) {
        *self.accounts.lock().unwrap_or_else(PoisonError::into_inner) = accounts;
    }

    /// Move the wallet to another chain from outside the session
    pub fn set_chain(&self, chain_id: u64) {
        self.known_chains
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(chain_id);
        self.chain_id.store(chain_id, Ordering::SeqCst);
    }

    /// Reject every prompt (account or chain request) as the user would
    pub fn reject_requests(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }

    /// Chains registered through `add_chain`, in order
    pub fn added_chains(&self) -> Vec<u64> {
        self.added_chains.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn check_rejected(&self) -> Result<(), WalletError> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(WalletError::Rejected("User rejected the request".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl WalletProvider for MockWalletProvider {
    async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
        self.check_rejected()?;
        Ok(self.accounts.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    async fn accounts(&self) -> Result<Vec<Address>, WalletError> {
        Ok(self.accounts.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        Ok(self.chain_id.load(Ordering::SeqCst))
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError> {
        self.check_rejected()?;
        let known = self
            .known_chains
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&chain_id);
        if !known {
            return Err(WalletError::UnknownChain(chain_id));
        }
        self.chain_id.store(chain_id, Ordering::SeqCst);
        Ok(())
    }

    async fn add_chain(&self, params: &NetworkParams) -> Result<(), WalletError> {
        self.check_rejected()?;
        self.known_chains
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(params.chain_id);
        self.added_chains
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(params.chain_id);
        Ok(())
    }
}
