//! Cancellable periodic background task
//!
//! Cycles run back to back on a tokio interval and never overlap: the next
//! tick is not taken until the previous cycle has finished. Cancelling
//! abandons an in-flight cycle.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

pub struct Poller {
    name: String,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Poller {
    /// Start polling; the first cycle runs immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F, Fut>(name: impl Into<String>, period: Duration, mut task: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let task_name = name.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("Poller {} started ({:?})", task_name, period);

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => {}
                }

                debug!("Poller {} cycle", task_name);
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = task() => {}
                }
            }

            info!("Poller {} stopped", task_name);
        });

        Self {
            name,
            shutdown,
            handle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop polling, abandoning any cycle in progress
    pub fn cancel(&self) {
        if !self.handle.is_finished() {
            debug!("Cancelling poller {}", self.name);
        }
        self.shutdown.send_replace(true);
        self.handle.abort();
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_runs_each_period_until_cancelled() {
        let cycles = Arc::new(AtomicUsize::new(0));
        let counter = cycles.clone();
        let poller = Poller::spawn("test", Duration::from_secs(10), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(cycles.load(Ordering::SeqCst), 3);

        poller.cancel();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(cycles.load(Ordering::SeqCst), 3);
        assert!(poller.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let cycles = Arc::new(AtomicUsize::new(0));
        let counter = cycles.clone();
        let poller = Poller::spawn("drop", Duration::from_secs(1), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        tokio::time::sleep(Duration::from_millis(1500)).await;
        drop(poller);

        let seen = cycles.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(cycles.load(Ordering::SeqCst), seen);
    }
}
