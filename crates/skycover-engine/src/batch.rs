//! Batch settlement driver
//!
//! Thin loop over [`ClaimSettlement::settle`]. Each item carries its
//! own `Result`; validation, guard, and replay failures are counted and
//! the loop moves on, while a fatal arithmetic error aborts the whole
//! batch immediately. Invocation cadence belongs to the caller.

use crate::settlement::{ClaimSettlement, SettlementOutcome};
use serde::{Deserialize, Serialize};
use skycover_common::{now_ms, require, Caller, ErrorClass, Permission, Result};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Aggregate counters for one batch invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Eligible policies examined
    pub scanned: usize,
    /// Settled with a payout
    pub paid: usize,
    /// Settled without a payout
    pub expired: usize,
    /// Window not yet open, or already handled elsewhere
    pub skipped: usize,
    /// Rejected by validation or an invariant guard
    pub failed: usize,
}

impl BatchReport {
    /// Policies that reached a terminal state this invocation.
    pub fn processed(&self) -> usize {
        self.paid + self.expired
    }
}

/// Drives settlement over the eligible-policy set.
pub struct BatchProcessor {
    settlement: Arc<ClaimSettlement>,
}

impl BatchProcessor {
    pub fn new(settlement: Arc<ClaimSettlement>) -> Self {
        Self { settlement }
    }

    /// Settle up to `max_items` eligible policies (bounded further by
    /// the configured cap). One bad policy never blocks the rest.
    #[instrument(skip(self, caller), fields(account = %caller.account))]
    pub async fn run_batch(&self, caller: &Caller, max_items: usize) -> Result<BatchReport> {
        require(caller, Permission::RunBatch)?;

        let now = now_ms();
        let cap = max_items.min(self.settlement.batch_settings().max_items);
        let candidates = self.settlement.eligible_policies(now);
        let mut report = BatchReport::default();

        for (policy_id, window_open) in candidates.into_iter().take(cap) {
            report.scanned += 1;
            if !window_open {
                debug!(policy_id = %policy_id, "settlement window not open, skipping");
                report.skipped += 1;
                continue;
            }
            match self.settlement.settle(&policy_id).await {
                Ok(SettlementOutcome::Paid { amount }) => {
                    debug!(policy_id = %policy_id, amount, "batch item paid");
                    report.paid += 1;
                }
                Ok(SettlementOutcome::Expired) => {
                    debug!(policy_id = %policy_id, "batch item expired");
                    report.expired += 1;
                }
                Err(err) => match err.class() {
                    ErrorClass::Fatal => {
                        error!(policy_id = %policy_id, %err, "fatal error, aborting batch");
                        return Err(err);
                    }
                    ErrorClass::Replay => {
                        debug!(policy_id = %policy_id, %err, "stale batch item, skipping");
                        report.skipped += 1;
                    }
                    ErrorClass::Validation | ErrorClass::Guard => {
                        warn!(policy_id = %policy_id, %err, "batch item rejected");
                        report.failed += 1;
                    }
                },
            }
        }

        info!(
            scanned = report.scanned,
            paid = report.paid,
            expired = report.expired,
            skipped = report.skipped,
            failed = report.failed,
            "batch complete"
        );
        Ok(report)
    }
}
