//! In-flight transaction gate
//!
//! At most one user-initiated write (stake, request unlock, claim) may be in
//! flight per client. The contract remains the arbiter of double-claims; this
//! only keeps the client from initiating a second write.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct TxGate {
    busy: Arc<AtomicBool>,
}

impl TxGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the gate, or `None` if a transaction is already in flight
    pub fn try_acquire(&self) -> Option<TxGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| TxGuard {
                busy: Arc::clone(&self.busy),
            })
    }

    /// Whether triggering actions should be disabled
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases the gate when dropped
#[derive(Debug)]
pub struct TxGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for TxGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_holder() {
        let gate = TxGate::new();
        let shared = gate.clone();

        let guard = gate.try_acquire().unwrap();
        assert!(shared.is_busy());
        assert!(shared.try_acquire().is_none());

        drop(guard);
        assert!(!gate.is_busy());
        assert!(shared.try_acquire().is_some());
    }
}
