//! # Unlock Request Lifecycle
//!
//! A withdrawal request burns shares and promises a fixed base-asset amount.
//! It becomes claimable at `unlock_time` and stops being claimable after
//! `expiry_time`. Readiness and expiry are never stored; they are derived from
//! the two timestamps at the instant of each read.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CLAIM_WINDOW_SECS, DEFAULT_UNLOCK_DELAY_SECS, SECONDS_PER_DAY, SECONDS_PER_HOUR,
    SECONDS_PER_MINUTE,
};
use crate::errors::{CoreError, CoreResult};

/// Mutually exclusive lifecycle states of a queued request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnlockState {
    /// Waiting for `unlock_time`
    Pending,
    /// Claimable
    Ready,
    /// Past `expiry_time`; remains visible but can no longer be claimed
    Expired,
}

impl fmt::Display for UnlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UnlockState::Pending => "Pending",
            UnlockState::Ready => "Ready",
            UnlockState::Expired => "Expired",
        };
        f.write_str(label)
    }
}

/// One pending withdrawal in a user's on-chain queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockRequest {
    /// Position in the user's on-chain request array
    pub index: u64,
    /// Shares burned at request time
    pub share_amount: u128,
    /// Base asset promised, fixed at request time
    pub base_amount: u128,
    /// Unix seconds after which the request is claimable
    pub unlock_time: u64,
    /// Unix seconds after which the request can no longer be claimed
    pub expiry_time: u64,
}

impl UnlockRequest {
    pub fn new(
        index: u64,
        share_amount: u128,
        base_amount: u128,
        unlock_time: u64,
        expiry_time: u64,
    ) -> CoreResult<Self> {
        if unlock_time >= expiry_time {
            return Err(CoreError::InvalidUnlockWindow {
                unlock_time,
                expiry_time,
            });
        }
        Ok(Self {
            index,
            share_amount,
            base_amount,
            unlock_time,
            expiry_time,
        })
    }

    /// `now >= unlock_time`
    pub fn is_ready(&self, now: u64) -> bool {
        now >= self.unlock_time
    }

    /// `now > expiry_time`
    pub fn is_expired(&self, now: u64) -> bool {
        now > self.expiry_time
    }

    /// Expiry takes precedence over readiness
    pub fn state_at(&self, now: u64) -> UnlockState {
        if self.is_expired(now) {
            UnlockState::Expired
        } else if self.is_ready(now) {
            UnlockState::Ready
        } else {
            UnlockState::Pending
        }
    }

    pub fn is_claimable(&self, now: u64) -> bool {
        self.state_at(now) == UnlockState::Ready
    }

    /// Seconds until the request matures, zero once ready
    pub fn seconds_until_unlock(&self, now: u64) -> u64 {
        self.unlock_time.saturating_sub(now)
    }

    /// Seconds until the claim window closes
    pub fn seconds_until_expiry(&self, now: u64) -> u64 {
        self.expiry_time.saturating_sub(now)
    }

    /// Countdown shown while a request matures
    pub fn unlock_countdown(&self, now: u64) -> String {
        let remaining = self.seconds_until_unlock(now);
        if remaining == 0 {
            return "Ready to claim!".to_string();
        }

        let minutes = remaining / SECONDS_PER_MINUTE;
        let seconds = remaining % SECONDS_PER_MINUTE;
        if minutes > 0 {
            format!("{}m {}s remaining", minutes, seconds)
        } else {
            format!("{}s remaining", seconds)
        }
    }

    /// Countdown to the end of the claim window
    pub fn expiry_countdown(&self, now: u64) -> String {
        if self.is_expired(now) {
            return "Expired".to_string();
        }

        let remaining = self.seconds_until_expiry(now);

        let days = remaining / SECONDS_PER_DAY;
        let hours = (remaining % SECONDS_PER_DAY) / SECONDS_PER_HOUR;
        if days > 0 {
            format!("Expires in {}d {}h", days, hours)
        } else {
            format!("Expires in {}h", hours)
        }
    }

    /// Label of the claim action for this request
    pub fn claim_label(&self, now: u64, base_symbol: &str) -> String {
        match self.state_at(now) {
            UnlockState::Pending => "Waiting...".to_string(),
            UnlockState::Ready => format!("Claim {}", base_symbol),
            UnlockState::Expired => "Expired".to_string(),
        }
    }
}

/// Protocol timing applied by the contract when a request is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockSchedule {
    pub unlock_delay_secs: u64,
    pub claim_window_secs: u64,
}

impl UnlockSchedule {
    pub fn new(unlock_delay_secs: u64, claim_window_secs: u64) -> Self {
        Self {
            unlock_delay_secs,
            claim_window_secs,
        }
    }

    /// Expected `(unlock_time, expiry_time)` for a request made at `now`
    pub fn window_from(&self, now: u64) -> (u64, u64) {
        let unlock_time = now.saturating_add(self.unlock_delay_secs);
        (unlock_time, unlock_time.saturating_add(self.claim_window_secs))
    }
}

impl Default for UnlockSchedule {
    fn default() -> Self {
        Self::new(DEFAULT_UNLOCK_DELAY_SECS, DEFAULT_CLAIM_WINDOW_SECS)
    }
}
