use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use stockroom_core::Clock;

use super::{ExpiryReaper, SweepReport};
use crate::store::ShopStore;

/// Config for the background reaper thread.
#[derive(Debug, Clone)]
pub struct ReaperRunner {
    pub interval: Duration,
    pub max_retries: u32,
    pub base_backoff: Duration,
}

impl Default for ReaperRunner {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            max_retries: 5,
            base_backoff: Duration::from_millis(250),
        }
    }
}

impl ReaperRunner {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Spawn the sweep loop on a named thread.
    ///
    /// - Schedule: sweeps once on startup, then every `interval`
    /// - Trigger: `handle.trigger()` requests an extra sweep
    /// - Failures: a sweep that could not list pending orders is retried up to
    ///   `max_retries` times with doubling delays, then waits for the next tick
    /// - Dropping the handle without `shutdown()` also stops the thread
    pub fn spawn<S, C>(
        &self,
        name: &'static str,
        reaper: Arc<ExpiryReaper<S, C>>,
    ) -> std::io::Result<ReaperRunnerHandle>
    where
        S: ShopStore + 'static,
        C: Clock + 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let (trigger_tx, trigger_rx) = mpsc::sync_channel::<()>(1);
        let stats = Arc::new(Mutex::new(ReaperStats::default()));

        let cfg = self.clone();
        let loop_stats = Arc::clone(&stats);
        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || runner_loop(name, cfg, shutdown_rx, trigger_rx, reaper, loop_stats))?;

        Ok(ReaperRunnerHandle {
            shutdown: shutdown_tx,
            trigger: trigger_tx,
            join: Some(join),
            stats,
        })
    }
}

/// Cumulative counters of a running reaper.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReaperStats {
    pub sweeps: u64,
    pub sweep_errors: u64,
    pub orders_cancelled: u64,
    pub orders_skipped: u64,
    pub orders_failed: u64,
}

impl ReaperStats {
    fn record(&mut self, report: &SweepReport) {
        self.sweeps += 1;
        self.orders_cancelled += report.cancelled as u64;
        self.orders_skipped += report.skipped as u64;
        self.orders_failed += report.failed as u64;
    }
}

/// Handle for the running reaper (shutdown, trigger, stats).
#[derive(Debug)]
pub struct ReaperRunnerHandle {
    shutdown: mpsc::Sender<()>,
    trigger: mpsc::SyncSender<()>,
    join: Option<thread::JoinHandle<()>>,
    stats: Arc<Mutex<ReaperStats>>,
}

impl ReaperRunnerHandle {
    /// Request a sweep ahead of schedule. Coalesced: a no-op while one is
    /// already queued.
    pub fn trigger(&self) {
        let _ = self.trigger.try_send(());
    }

    pub fn stats(&self) -> ReaperStats {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Stop the thread and wait for the current sweep to finish.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

/// Upper bound on how long the loop blocks before checking for a trigger.
const TRIGGER_POLL: Duration = Duration::from_millis(50);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(10);

fn runner_loop<S, C>(
    name: &'static str,
    cfg: ReaperRunner,
    shutdown_rx: mpsc::Receiver<()>,
    trigger_rx: mpsc::Receiver<()>,
    reaper: Arc<ExpiryReaper<S, C>>,
    stats: Arc<Mutex<ReaperStats>>,
) where
    S: ShopStore + 'static,
    C: Clock + 'static,
{
    info!(runner = name, interval_secs = cfg.interval.as_secs(), "expiry reaper started");

    let interval = cfg.interval.max(TRIGGER_POLL);
    // Startup sweep, then one per interval on a fixed grid.
    let mut scheduled = Instant::now();
    let mut retry_at: Option<Instant> = None;
    let mut attempts: u32 = 0;

    loop {
        let wake = retry_at.map_or(scheduled, |r| r.min(scheduled));
        let wait = wake.saturating_duration_since(Instant::now()).min(TRIGGER_POLL);
        match shutdown_rx.recv_timeout(wait) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }

        let mut due = false;
        while trigger_rx.try_recv().is_ok() {
            due = true;
        }
        let now = Instant::now();
        due |= now >= scheduled || retry_at.is_some_and(|r| now >= r);
        if !due {
            continue;
        }

        while scheduled <= now {
            scheduled += interval;
        }

        let outcome = reaper.sweep();
        let mut stats = stats.lock().unwrap_or_else(PoisonError::into_inner);
        match outcome {
            Ok(report) => {
                stats.record(&report);
                attempts = 0;
                retry_at = None;
            }
            Err(e) => {
                // Only listing pending orders aborts a sweep; per-order
                // failures are already inside the report.
                stats.sweep_errors += 1;
                attempts += 1;
                if attempts <= cfg.max_retries {
                    let delay = retry_delay(cfg.base_backoff, attempts);
                    warn!(runner = name, error = %e, attempt = attempts, retry_in_ms = delay.as_millis() as u64, "expiry sweep failed");
                    retry_at = Some(now + delay);
                } else {
                    warn!(runner = name, error = %e, "expiry sweep failed; waiting for next interval");
                    attempts = 0;
                    retry_at = None;
                }
            }
        }
    }

    info!(runner = name, "expiry reaper stopped");
}

/// `base` doubled per failed attempt, capped at [`MAX_RETRY_DELAY`].
fn retry_delay(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    base.saturating_mul(factor).min(MAX_RETRY_DELAY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_core::ManualClock;
    use stockroom_products::{Money, ProductFields};

    use std::sync::atomic::{AtomicU32, Ordering};

    use stockroom_core::{DomainError, DomainResult, OrderId, ProductId};
    use stockroom_products::ProductGeneration;
    use stockroom_sales::{Order, OrderStatus};

    use crate::lifecycle::{OrderLifecycle, OrderLineRequest};
    use crate::revisioning::ProductRevisioning;
    use crate::store::{ChangeSet, Committed, InMemoryShopStore};

    /// Fails the pending-order listing a fixed number of times.
    struct FlakyStore {
        inner: Arc<InMemoryShopStore>,
        listing_failures: AtomicU32,
    }

    impl ShopStore for FlakyStore {
        fn find_product(&self, id: ProductId) -> DomainResult<Option<ProductGeneration>> {
            self.inner.find_product(id)
        }

        fn list_products(&self) -> DomainResult<Vec<ProductGeneration>> {
            self.inner.list_products()
        }

        fn find_order(&self, id: OrderId) -> DomainResult<Option<Order>> {
            self.inner.find_order(id)
        }

        fn list_orders(&self) -> DomainResult<Vec<Order>> {
            self.inner.list_orders()
        }

        fn find_orders_by_status(&self, status: OrderStatus) -> DomainResult<Vec<Order>> {
            let left = self.listing_failures.load(Ordering::SeqCst);
            if left > 0 {
                self.listing_failures.store(left - 1, Ordering::SeqCst);
                return Err(DomainError::store("order table unavailable"));
            }
            self.inner.find_orders_by_status(status)
        }

        fn find_orders_referencing(&self, product_id: ProductId) -> DomainResult<Vec<Order>> {
            self.inner.find_orders_referencing(product_id)
        }

        fn commit(&self, changes: ChangeSet) -> DomainResult<Committed> {
            self.inner.commit(changes)
        }
    }

    fn wait_for(handle: &ReaperRunnerHandle, done: impl Fn(&ReaperStats) -> bool) -> ReaperStats {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let stats = handle.stats();
            if done(&stats) || Instant::now() > deadline {
                return stats;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn retry_delay_doubles_up_to_the_cap() {
        let base = Duration::from_millis(250);
        assert_eq!(retry_delay(base, 1), Duration::from_millis(250));
        assert_eq!(retry_delay(base, 3), Duration::from_secs(1));
        assert_eq!(retry_delay(base, 40), MAX_RETRY_DELAY);
    }

    #[test]
    fn runner_sweeps_on_startup_and_on_trigger() {
        let store = Arc::new(InMemoryShopStore::new());
        let clock = Arc::new(ManualClock::starting_now());
        let product = ProductRevisioning::new(Arc::clone(&store))
            .create_product(ProductFields::new("Tea", Money::from_minor(2990), 5))
            .unwrap();
        let lifecycle = Arc::new(OrderLifecycle::new(Arc::clone(&store), Arc::clone(&clock)));
        let line = [OrderLineRequest {
            product_id: product.id_typed(),
            quantity: 2,
        }];
        lifecycle.create(&line).unwrap();
        clock.advance(chrono::Duration::hours(1));

        let reaper = Arc::new(ExpiryReaper::new(Arc::clone(&lifecycle)));
        let handle = ReaperRunner::default()
            .with_interval(Duration::from_secs(3600))
            .spawn("reaper-test", reaper)
            .unwrap();

        let stats = wait_for(&handle, |s| s.sweeps >= 1);
        assert_eq!(stats.orders_cancelled, 1);

        lifecycle.create(&line).unwrap();
        clock.advance(chrono::Duration::hours(1));
        handle.trigger();

        let stats = wait_for(&handle, |s| s.orders_cancelled >= 2);
        assert_eq!(stats.orders_cancelled, 2);
        assert_eq!(stats.sweep_errors, 0);
        handle.shutdown();

        let stock = store.find_product(product.id_typed()).unwrap().unwrap().stock_quantity();
        assert_eq!(stock, 5);
    }

    #[test]
    fn failed_sweep_is_retried_before_the_next_tick() {
        let store = Arc::new(InMemoryShopStore::new());
        let clock = Arc::new(ManualClock::starting_now());
        let product = ProductRevisioning::new(Arc::clone(&store))
            .create_product(ProductFields::new("Honey", Money::from_minor(7990), 4))
            .unwrap();
        OrderLifecycle::new(Arc::clone(&store), Arc::clone(&clock))
            .create(&[OrderLineRequest {
                product_id: product.id_typed(),
                quantity: 4,
            }])
            .unwrap();
        clock.advance(chrono::Duration::hours(1));

        let flaky = FlakyStore {
            inner: Arc::clone(&store),
            listing_failures: AtomicU32::new(2),
        };
        let lifecycle = Arc::new(OrderLifecycle::new(flaky, Arc::clone(&clock)));
        let reaper = Arc::new(ExpiryReaper::new(lifecycle));
        let handle = ReaperRunner {
            interval: Duration::from_secs(3600),
            max_retries: 5,
            base_backoff: Duration::from_millis(10),
        }
        .spawn("reaper-retry-test", reaper)
        .unwrap();

        let stats = wait_for(&handle, |s| s.orders_cancelled >= 1);
        handle.shutdown();

        assert_eq!(stats.sweep_errors, 2);
        assert_eq!(stats.sweeps, 1);
        assert_eq!(stats.orders_cancelled, 1);
        let stock = store.find_product(product.id_typed()).unwrap().unwrap().stock_quantity();
        assert_eq!(stock, 4);
    }
}
