//! Expiry reaper: force-cancels pending orders past their expiry.
//!
//! [`ExpiryReaper::sweep`] is one stateless pass; [`runner::ReaperRunner`]
//! owns the timer.

pub mod runner;

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use stockroom_core::{Clock, DomainError, DomainResult};

use crate::lifecycle::OrderLifecycle;
use crate::store::ShopStore;

pub use runner::{ReaperRunner, ReaperRunnerHandle, ReaperStats};

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Pending orders looked at.
    pub examined: usize,
    pub cancelled: usize,
    /// Expired orders that left PENDING before the reaper got to them.
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug)]
pub struct ExpiryReaper<S, C> {
    lifecycle: Arc<OrderLifecycle<S, C>>,
}

impl<S, C> ExpiryReaper<S, C>
where
    S: ShopStore,
    C: Clock,
{
    pub fn new(lifecycle: Arc<OrderLifecycle<S, C>>) -> Self {
        Self { lifecycle }
    }

    /// Cancel every pending order whose expiry has passed.
    ///
    /// Only failing to list pending orders aborts the sweep; per-order
    /// failures are logged and counted.
    pub fn sweep(&self) -> DomainResult<SweepReport> {
        let mut report = SweepReport::default();

        for order in self.lifecycle.pending()? {
            report.examined += 1;
            if !self.lifecycle.is_expired(&order) {
                continue;
            }

            let id = order.id_typed();
            match self.lifecycle.cancel(id) {
                Ok(_) => report.cancelled += 1,
                Err(DomainError::InvalidStateTransition(reason)) => {
                    debug!(order = %id, %reason, "expired order no longer pending; skipped");
                    report.skipped += 1;
                }
                Err(e) => {
                    warn!(order = %id, error = %e, "failed to cancel expired order");
                    report.failed += 1;
                }
            }
        }

        if report.cancelled > 0 || report.failed > 0 {
            info!(
                examined = report.examined,
                cancelled = report.cancelled,
                skipped = report.skipped,
                failed = report.failed,
                "expiry sweep finished"
            );
        }
        Ok(report)
    }
}
