//! Claim settlement orchestration
//!
//! Single write path over the pool ledger and policy registry. Every
//! mutating operation takes the engine lock, applies all of its writes,
//! and only then touches the external transfer capability, so a crash
//! or transfer failure can never leave a half-applied settlement.
//! Proof verification happens before the lock is taken; nothing inside
//! the lock performs I/O.

use crate::config::{BatchSettings, EngineConfig};
use crate::journal::{Journal, LedgerEvent};
use crate::transfer::CapitalTransfer;
use parking_lot::Mutex;
use skycover_attest::{AttestationGate, AttestationProof};
use skycover_common::{
    now_ms, require, Amount, AttestError, AttestationId, Caller, EngineError, FlightId, Permission,
    PolicyError, PolicyId, PoolError, Result, TimestampMs,
};
use skycover_policy::{Policy, PayoutSchedule, PolicyConfig, PolicyRegistry};
use skycover_pool::{PoolConfig, PoolHealth, PoolLedger, PoolStats};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Outcome of settling one policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementOutcome {
    /// Qualifying trigger; payout transferred to the holder
    Paid { amount: Amount },
    /// No qualifying trigger; reservation released without payout
    Expired,
}

/// Pool ledger and policy registry behind one lock. The two structures
/// move together in every transition, so they share a critical section.
struct EngineState {
    pool: PoolLedger,
    policies: PolicyRegistry,
}

/// The settlement engine. Construct once, share via `Arc`.
pub struct ClaimSettlement {
    state: Mutex<EngineState>,
    gate: AttestationGate,
    transfer: Arc<dyn CapitalTransfer>,
    journal: Arc<dyn Journal>,
    paused: AtomicBool,
    batch: BatchSettings,
}

impl ClaimSettlement {
    pub fn new(
        config: EngineConfig,
        transfer: Arc<dyn CapitalTransfer>,
        journal: Arc<dyn Journal>,
    ) -> Self {
        Self {
            state: Mutex::new(EngineState {
                pool: PoolLedger::new(config.pool),
                policies: PolicyRegistry::new(config.policy),
            }),
            gate: AttestationGate::new(),
            transfer,
            journal,
            paused: AtomicBool::new(config.start_paused),
            batch: config.batch,
        }
    }

    /// Attestation trust-root surface (publish/finalize rounds).
    pub fn gate(&self) -> &AttestationGate {
        &self.gate
    }

    pub fn batch_settings(&self) -> &BatchSettings {
        &self.batch
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Blocks deposits, withdrawals, and new policies. Settlement of
    /// already-Active policies stays available: a paused pool must
    /// still pay out.
    pub fn pause(&self, caller: &Caller) -> Result<()> {
        require(caller, Permission::Pause)?;
        self.paused.store(true, Ordering::SeqCst);
        warn!(account = %caller.account, "engine paused");
        self.journal.append(LedgerEvent::PauseChanged {
            paused: true,
            timestamp: now_ms(),
        })
    }

    pub fn resume(&self, caller: &Caller) -> Result<()> {
        require(caller, Permission::Resume)?;
        self.paused.store(false, Ordering::SeqCst);
        info!(account = %caller.account, "engine resumed");
        self.journal.append(LedgerEvent::PauseChanged {
            paused: false,
            timestamp: now_ms(),
        })
    }

    pub fn set_pool_config(&self, caller: &Caller, config: PoolConfig) -> Result<()> {
        require(caller, Permission::ConfigurePool)?;
        self.state.lock().pool.set_config(config);
        Ok(())
    }

    pub fn set_policy_config(&self, caller: &Caller, config: PolicyConfig) -> Result<()> {
        require(caller, Permission::ConfigurePool)?;
        self.state.lock().policies.set_config(config);
        Ok(())
    }

    /// Consistent snapshot of pool statistics. Never used to authorize
    /// a write; mutating paths re-validate under the lock.
    pub fn stats(&self) -> PoolStats {
        self.state.lock().pool.stats()
    }

    pub fn health(&self) -> PoolHealth {
        self.state.lock().pool.health()
    }

    pub fn policy(&self, policy_id: &PolicyId) -> Option<Policy> {
        self.state.lock().policies.get(policy_id).cloned()
    }

    pub fn provider_shares(&self, account: &str) -> u128 {
        self.state
            .lock()
            .pool
            .provider(account)
            .map(|p| p.share_balance)
            .unwrap_or(0)
    }

    /// Deposit capital and mint shares at the current price.
    #[instrument(skip(self))]
    pub async fn deposit(&self, account: &str, amount: Amount) -> Result<u128> {
        self.ensure_not_paused()?;
        self.transfer.transfer_in(account, amount).await?;

        let now = now_ms();
        let minted = {
            let mut state = self.state.lock();
            match state.pool.deposit(account, amount, now) {
                Ok(shares) => shares,
                Err(err) => {
                    drop(state);
                    // Funds already in custody; send them back before
                    // surfacing the rejection.
                    if let Err(refund_err) = self.transfer.transfer_out(account, amount).await {
                        error!(account, amount, %refund_err, "deposit refund failed");
                    }
                    return Err(err);
                }
            }
        };

        self.journal.append(LedgerEvent::Deposited {
            account: account.to_string(),
            amount,
            shares: minted,
            timestamp: now,
        })?;
        Ok(minted)
    }

    /// Burn shares and pay out the proportional amount.
    #[instrument(skip(self))]
    pub async fn withdraw(&self, account: &str, shares: u128) -> Result<Amount> {
        self.ensure_not_paused()?;

        let now = now_ms();
        let amount = self.state.lock().pool.withdraw(account, shares, now)?;

        // The transfer runs before the journal append so a failing sink
        // can never leave the withdrawer unpaid.
        self.transfer.transfer_out(account, amount).await?;
        self.journal.append(LedgerEvent::Withdrawn {
            account: account.to_string(),
            shares,
            amount,
            timestamp: now,
        })?;
        Ok(amount)
    }

    /// Underwrite a new policy: collect the premium, validate, reserve
    /// pool capital, and activate. A rejected reservation refunds the
    /// premium and leaves no trace in the registry.
    #[instrument(skip(self, flight, schedule))]
    pub async fn underwrite(
        &self,
        holder: &str,
        flight: FlightId,
        coverage_amount: Amount,
        premium: Amount,
        schedule: Option<PayoutSchedule>,
    ) -> Result<PolicyId> {
        self.ensure_not_paused()?;
        self.transfer.transfer_in(holder, premium).await?;

        let now = now_ms();
        match self.underwrite_locked(holder, flight, coverage_amount, premium, schedule, now) {
            Ok((policy_id, max_payout)) => {
                self.journal.append(LedgerEvent::PolicyUnderwritten {
                    policy_id: policy_id.to_string(),
                    holder: holder.to_string(),
                    coverage_amount,
                    premium,
                    max_payout,
                    timestamp: now,
                })?;
                Ok(policy_id)
            }
            Err(err) => {
                if let Err(refund_err) = self.transfer.transfer_out(holder, premium).await {
                    error!(holder, premium, %refund_err, "premium refund failed");
                }
                Err(err)
            }
        }
    }

    /// Create, reserve, activate as one critical section. A failed
    /// reservation discards the pending policy so nothing survives.
    fn underwrite_locked(
        &self,
        holder: &str,
        flight: FlightId,
        coverage_amount: Amount,
        premium: Amount,
        schedule: Option<PayoutSchedule>,
        now: TimestampMs,
    ) -> Result<(PolicyId, Amount)> {
        let mut state = self.state.lock();
        let policy_id = state
            .policies
            .create(holder, flight, coverage_amount, premium, schedule, now)?;
        let max_payout = state
            .policies
            .get(&policy_id)
            .map(|p| p.max_payout)
            .ok_or_else(|| EngineError::Policy(PolicyError::NotFound(policy_id.to_string())))?;
        match state.pool.reserve_for_policy(premium, max_payout) {
            Ok(()) => {
                state.policies.activate(&policy_id, now)?;
                Ok((policy_id, max_payout))
            }
            Err(err) => {
                state.policies.discard_pending(&policy_id)?;
                Err(err)
            }
        }
    }

    /// Verify an inclusion proof and attach the attested fact to its
    /// policy. Verification completes before the engine lock is taken.
    #[instrument(skip(self, proof), fields(policy_id = %policy_id))]
    pub fn attach_attestation(
        &self,
        policy_id: &PolicyId,
        proof: &AttestationProof,
    ) -> Result<AttestationId> {
        let fact = self.gate.verify(proof)?;
        let attestation_id = fact.attestation_id()?;

        let mut state = self.state.lock();
        let policy = state
            .policies
            .get(policy_id)
            .ok_or_else(|| EngineError::Policy(PolicyError::NotFound(policy_id.to_string())))?;
        if fact.flight != policy.flight {
            return Err(AttestError::FactMismatch.into());
        }
        state
            .policies
            .set_attestation_reference(policy_id, attestation_id)?;
        drop(state);

        self.journal.append(LedgerEvent::AttestationAttached {
            policy_id: policy_id.to_string(),
            attestation_id: attestation_id.to_string(),
            timestamp: now_ms(),
        })?;
        Ok(attestation_id)
    }

    /// Settle one policy against its attached attestation.
    ///
    /// The payout is computed before the attestation is consumed;
    /// everything that can be rejected is rejected before the first
    /// write, so either every write lands or none do. Available while
    /// paused.
    #[instrument(skip(self), fields(policy_id = %policy_id))]
    pub async fn settle(&self, policy_id: &PolicyId) -> Result<SettlementOutcome> {
        let now = now_ms();
        let (outcome, holder, attestation_id) = {
            let mut state = self.state.lock();
            let policy = state
                .policies
                .get(policy_id)
                .ok_or_else(|| EngineError::Policy(PolicyError::NotFound(policy_id.to_string())))?;
            if !policy.is_active() {
                return Err(PolicyError::WrongStatus {
                    policy_id: policy_id.to_string(),
                    expected: skycover_policy::PolicyStatus::Active.to_string(),
                    actual: policy.status.to_string(),
                }
                .into());
            }
            let attestation_id = policy
                .attestation_reference
                .ok_or_else(|| {
                    EngineError::Policy(PolicyError::NoAttestationReference(policy_id.to_string()))
                })?;
            let fact = self.gate.fact(&attestation_id).ok_or_else(|| {
                EngineError::Attestation(AttestError::UnknownAttestation {
                    attestation_id: attestation_id.to_string(),
                })
            })?;

            let holder = policy.holder.clone();
            let max_payout = policy.max_payout;
            let payout =
                policy
                    .schedule
                    .evaluate(policy.coverage_amount, fact.delay_minutes, fact.status)?;

            // Last rejection point. After the consume flag flips, only
            // a fatal arithmetic error can fail, and that aborts loudly.
            if !self.gate.consume_once(&attestation_id)? {
                return Err(AttestError::AlreadyProcessed {
                    attestation_id: attestation_id.to_string(),
                }
                .into());
            }

            let outcome = if payout > 0 {
                state.pool.settle_claim(payout, max_payout)?;
                state.policies.mark_paid(policy_id, payout, now)?;
                SettlementOutcome::Paid { amount: payout }
            } else {
                state.pool.release_reserve(max_payout)?;
                state.policies.mark_expired(policy_id, now)?;
                SettlementOutcome::Expired
            };
            (outcome, holder, attestation_id)
        };

        match outcome {
            SettlementOutcome::Paid { amount } => {
                // Pay the holder before appending. The pool is already
                // debited and the policy marked Paid, so a journal
                // failure here must not strand the payout.
                self.transfer.transfer_out(&holder, amount).await?;
                self.journal.append(LedgerEvent::ClaimPaid {
                    policy_id: policy_id.to_string(),
                    attestation_id: attestation_id.to_string(),
                    amount,
                    timestamp: now,
                })?;
                info!(policy_id = %policy_id, amount, "claim paid");
            }
            SettlementOutcome::Expired => {
                self.journal.append(LedgerEvent::PolicyExpired {
                    policy_id: policy_id.to_string(),
                    attestation_id: attestation_id.to_string(),
                    timestamp: now,
                })?;
                info!(policy_id = %policy_id, "policy expired, reservation released");
            }
        }
        Ok(outcome)
    }

    /// Administrative void of an Active policy. Releases the
    /// reservation; the premium stays with the pool.
    pub fn cancel_policy(&self, caller: &Caller, policy_id: &PolicyId) -> Result<()> {
        require(caller, Permission::CancelPolicy)?;
        let now = now_ms();
        {
            let mut state = self.state.lock();
            let max_payout = state
                .policies
                .get(policy_id)
                .filter(|p| p.is_active())
                .map(|p| p.max_payout)
                .ok_or_else(|| EngineError::Policy(PolicyError::NotFound(policy_id.to_string())))?;
            state.pool.release_reserve(max_payout)?;
            state.policies.cancel(policy_id, now)?;
        }
        self.journal.append(LedgerEvent::PolicyCancelled {
            policy_id: policy_id.to_string(),
            timestamp: now,
        })
    }

    /// Distribute premium surplus to providers, pro-rata by shares.
    pub fn distribute_yield(&self, caller: &Caller) -> Result<Amount> {
        require(caller, Permission::DistributeYield)?;
        let now = now_ms();
        let amount = self.state.lock().pool.distribute_yield(now)?;
        self.journal.append(LedgerEvent::YieldDistributed {
            amount,
            timestamp: now,
        })?;
        Ok(amount)
    }

    /// Pay a provider their accrued, unclaimed yield.
    pub async fn claim_yield(&self, account: &str) -> Result<Amount> {
        self.ensure_not_paused()?;
        let amount = self.state.lock().pool.claim_yield(account)?;
        self.transfer.transfer_out(account, amount).await?;
        self.journal.append(LedgerEvent::YieldClaimed {
            account: account.to_string(),
            amount,
            timestamp: now_ms(),
        })?;
        Ok(amount)
    }

    /// Active policies carrying an attestation whose settlement window
    /// has opened.
    pub(crate) fn eligible_policies(&self, now: TimestampMs) -> Vec<(PolicyId, bool)> {
        let state = self.state.lock();
        state
            .policies
            .settlement_candidates()
            .map(|p| {
                let window_open =
                    now >= p.flight.scheduled_departure_ms + self.batch.processing_delay_ms;
                (p.policy_id, window_open)
            })
            .collect()
    }

    fn ensure_not_paused(&self) -> Result<()> {
        if self.is_paused() {
            return Err(PoolError::Paused.into());
        }
        Ok(())
    }
}
