//! 后台定时任务
//!
//! [`PeriodicTask`] runs a synchronous tick on a fixed interval until it is
//! stopped. The rate limiter and the TTL cache each own one for their sweeps.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Smallest accepted period; `tokio::time::interval` rejects zero
const MIN_PERIOD: Duration = Duration::from_millis(1);
/// Largest accepted period; keeps instant arithmetic in range
const MAX_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

/// Cancellable interval loop
///
/// The first tick fires one full period after spawn. `stop()` may be called
/// any number of times; dropping the task also cancels it, so no timer
/// outlives its owner.
///
/// ```ignore
/// let sweep = PeriodicTask::spawn("cache_sweep", Duration::from_secs(30), move || {
///     store.write().retain(|_, e| !e.is_expired(Instant::now()));
/// });
/// sweep.stop();
/// ```
#[derive(Debug)]
pub struct PeriodicTask {
    name: &'static str,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    /// Spawn on the current tokio runtime
    ///
    /// A panicking tick is logged and the loop keeps running.
    pub fn spawn<F>(name: &'static str, period: Duration, mut tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let period = period.clamp(MIN_PERIOD, MAX_PERIOD);
        let token = CancellationToken::new();
        let cancelled = token.clone();
        // Anchored at spawn, not at the first poll of the loop
        let start = Instant::now() + period;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(panic_info) = catch_unwind(AssertUnwindSafe(&mut tick)) {
                            let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                                (*s).to_string()
                            } else if let Some(s) = panic_info.downcast_ref::<String>() {
                                s.clone()
                            } else {
                                "Unknown panic".to_string()
                            };
                            tracing::error!(task = %name, panic = %panic_msg, "Periodic task tick panicked");
                        }
                    }
                }
            }
            tracing::debug!(task = %name, "Periodic task stopped");
        });

        tracing::debug!(task = %name, period_ms = period.as_millis() as u64, "Registered periodic task");
        Self {
            name,
            token,
            handle,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Signal the loop to exit (idempotent)
    pub fn stop(&self) {
        if !self.token.is_cancelled() {
            self.token.cancel();
            tracing::debug!(task = %self.name, "Stop requested");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// True once the loop has exited
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn settle() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_on_period() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let task = PeriodicTask::spawn("counter", Duration::from_secs(1), move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        settle().await;
        assert!(count.load(Ordering::SeqCst) >= 2);
        task.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_anchored_at_spawn() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let task = PeriodicTask::spawn("counter", Duration::from_millis(100), move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        // Clock moves before the loop is ever polled
        tokio::time::advance(Duration::from_millis(150)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        task.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent_and_halts_ticks() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let task = PeriodicTask::spawn("counter", Duration::from_millis(100), move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        task.stop();
        task.stop();
        assert!(task.is_stopped());
        settle().await;
        assert!(task.is_finished());

        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let task = PeriodicTask::spawn("counter", Duration::from_millis(100), move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        drop(task);

        tokio::time::advance(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_tick_keeps_running() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let task = PeriodicTask::spawn("flaky", Duration::from_millis(100), move || {
            if c.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("first tick fails");
            }
        });

        for _ in 0..3 {
            tokio::time::advance(Duration::from_millis(100)).await;
            settle().await;
        }
        assert!(count.load(Ordering::SeqCst) >= 2);
        assert!(!task.is_finished());
    }
}
