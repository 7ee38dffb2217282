//! Wall-clock abstraction
//!
//! Unlock readiness depends on elapsed real time, so every classification takes
//! `now` explicitly and callers obtain it from a [`Clock`].

/// Source of the current unix time in seconds
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

/// Wall-clock time via `chrono`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        chrono::Utc::now().timestamp().max(0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_past_2024() {
        assert!(SystemClock.now() > 1_704_067_200);
    }
}
