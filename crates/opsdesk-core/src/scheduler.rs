// ── Periodic tasks ──
//
// A `Ticker` owns one spawned interval loop. Stopping it (or dropping it)
// cancels the loop; nothing keeps running after its owner is gone.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// When the first tick fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstTick {
    /// Right away, then every period.
    Immediate,
    /// After one full period.
    AfterPeriod,
}

pub struct Ticker {
    name: &'static str,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Spawn a loop calling `tick` every `period`.
    ///
    /// Ticks never overlap: a slow tick delays the next one instead of
    /// queueing a burst.
    pub fn start<F, Fut>(
        name: &'static str,
        period: Duration,
        first: FirstTick,
        mut tick: F,
    ) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            if first == FirstTick::AfterPeriod {
                interval.tick().await; // consume the immediate first tick
            }

            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    _ = interval.tick() => {
                        tokio::select! {
                            biased;
                            () = token.cancelled() => break,
                            () = tick() => {}
                        }
                    }
                }
            }
            debug!(ticker = name, "stopped");
        });
        debug!(ticker = name, ?period, "started");

        Self {
            name,
            cancel,
            handle: Some(handle),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Cancel the loop and wait for it to exit.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!(ticker = self.name, error = %e, "ticker task failed");
            }
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn counting(first: FirstTick) -> (Arc<AtomicUsize>, Ticker) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let ticker = Ticker::start("test", Duration::from_millis(100), first, move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        (count, ticker)
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_ticks_at_start() {
        let (count, ticker) = counting(FirstTick::Immediate);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
        ticker.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn after_period_waits_one_period() {
        let (count, ticker) = counting(FirstTick::AfterPeriod);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        ticker.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_and_drop_end_the_loop() {
        let (count, ticker) = counting(FirstTick::Immediate);
        assert!(ticker.is_running());
        ticker.stop().await;
        let seen = count.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), seen);

        let (count, ticker) = counting(FirstTick::Immediate);
        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(ticker);
        let seen = count.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), seen);
    }
}
