//! Policy registry
//!
//! Owns every policy's lifecycle state. Creation validates the
//! underwriting guards and yields a Pending policy; the engine books the
//! pool reservation and then activates (or discards) it. Settlement
//! transitions are only reachable through the engine's orchestration.

use crate::policy::{Policy, PolicyStatus};
use crate::schedule::PayoutSchedule;
use serde::{Deserialize, Serialize};
use skycover_common::{
    math::bps_of, Amount, AttestationId, EngineError, FlightId, PolicyError, PolicyId, Result,
    TimestampMs,
};
use std::collections::HashMap;
use tracing::{debug, info};

/// Underwriting bounds and defaults. Role-gated at the engine boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub min_coverage: Amount,
    pub max_coverage: Amount,
    /// Premium floor as a fraction of coverage
    pub min_premium_bps: u16,
    /// Premium ceiling as a fraction of coverage
    pub max_premium_bps: u16,
    /// Schedule used when the holder does not supply one
    pub default_schedule: PayoutSchedule,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            min_coverage: 100,
            max_coverage: 1_000_000,
            min_premium_bps: 200,
            max_premium_bps: 1_500,
            default_schedule: PayoutSchedule::default(),
        }
    }
}

/// Registry of all coverage agreements
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRegistry {
    config: PolicyConfig,
    policies: HashMap<PolicyId, Policy>,
}

impl PolicyRegistry {
    pub fn new(config: PolicyConfig) -> Self {
        Self {
            config,
            policies: HashMap::new(),
        }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: PolicyConfig) {
        info!(
            min_coverage = config.min_coverage,
            max_coverage = config.max_coverage,
            "policy configuration updated"
        );
        self.config = config;
    }

    pub fn get(&self, policy_id: &PolicyId) -> Option<&Policy> {
        self.policies.get(policy_id)
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Iterate all policies (any status).
    pub fn policies(&self) -> impl Iterator<Item = &Policy> {
        self.policies.values()
    }

    /// Active policies that already carry an attestation reference —
    /// the candidate set for batch settlement.
    pub fn settlement_candidates(&self) -> impl Iterator<Item = &Policy> {
        self.policies
            .values()
            .filter(|p| p.is_active() && p.attestation_reference.is_some())
    }

    /// Validate underwriting guards and create a Pending policy.
    ///
    /// The policy id is derived from holder + flight + a fresh salt, so
    /// ids are never reused. Returns the new id; the policy stays
    /// Pending until the pool accepts the reservation.
    pub fn create(
        &mut self,
        holder: &str,
        flight: FlightId,
        coverage_amount: Amount,
        premium: Amount,
        schedule: Option<PayoutSchedule>,
        now: TimestampMs,
    ) -> Result<PolicyId> {
        if flight.scheduled_departure_ms <= now {
            return Err(PolicyError::DepartureInPast.into());
        }
        if coverage_amount < self.config.min_coverage || coverage_amount > self.config.max_coverage
        {
            return Err(PolicyError::CoverageOutOfBounds {
                amount: coverage_amount,
                min: self.config.min_coverage,
                max: self.config.max_coverage,
            }
            .into());
        }

        let min_premium = bps_of(coverage_amount, self.config.min_premium_bps)?;
        let max_premium = bps_of(coverage_amount, self.config.max_premium_bps)?;
        if premium < min_premium || premium > max_premium {
            return Err(PolicyError::PremiumOutOfBounds {
                premium,
                min: min_premium,
                max: max_premium,
            }
            .into());
        }

        let schedule = schedule.unwrap_or_else(|| self.config.default_schedule.clone());
        let max_payout = schedule.max_payout(coverage_amount)?;
        // A policy whose best tier rounds to nothing can never trigger;
        // booking it would strand the premium behind a zero reservation.
        if max_payout == 0 {
            return Err(PolicyError::ZeroMaxPayout {
                coverage: coverage_amount,
            }
            .into());
        }

        let salt = PolicyId::random_salt();
        let policy_id = PolicyId::derive(holder, &flight, &salt);

        let policy = Policy {
            policy_id,
            holder: holder.to_string(),
            flight,
            coverage_amount,
            premium_paid: premium,
            status: PolicyStatus::Pending,
            schedule,
            max_payout,
            attestation_reference: None,
            claim_amount: 0,
            created_ms: now,
            activated_ms: None,
            settled_ms: None,
        };

        info!(policy_id = %policy_id, holder, coverage_amount, premium, "policy created");
        self.policies.insert(policy_id, policy);
        Ok(policy_id)
    }

    /// Pending -> Active, once the pool has booked the reservation.
    pub fn activate(&mut self, policy_id: &PolicyId, now: TimestampMs) -> Result<()> {
        let policy = self.get_mut_expect(policy_id, PolicyStatus::Pending)?;
        policy.status = PolicyStatus::Active;
        policy.activated_ms = Some(now);
        info!(policy_id = %policy_id, "policy activated");
        Ok(())
    }

    /// Remove a Pending policy whose reservation was rejected.
    pub fn discard_pending(&mut self, policy_id: &PolicyId) -> Result<()> {
        self.get_mut_expect(policy_id, PolicyStatus::Pending)?;
        self.policies.remove(policy_id);
        debug!(policy_id = %policy_id, "pending policy discarded");
        Ok(())
    }

    /// Attach the verified attestation reference; set once, never
    /// reassigned.
    pub fn set_attestation_reference(
        &mut self,
        policy_id: &PolicyId,
        attestation_id: AttestationId,
    ) -> Result<()> {
        let policy = self.get_mut_expect(policy_id, PolicyStatus::Active)?;
        if policy.attestation_reference.is_some() {
            return Err(PolicyError::AttestationAlreadyAttached(policy_id.to_string()).into());
        }
        policy.attestation_reference = Some(attestation_id);
        info!(policy_id = %policy_id, attestation_id = %attestation_id, "attestation attached");
        Ok(())
    }

    /// Active -> Triggered -> Paid with the settled claim amount.
    /// Triggered is not separately observable outside a partial failure.
    pub fn mark_paid(
        &mut self,
        policy_id: &PolicyId,
        claim_amount: Amount,
        now: TimestampMs,
    ) -> Result<()> {
        let policy = self.get_mut_expect(policy_id, PolicyStatus::Active)?;
        policy.status = PolicyStatus::Triggered;
        policy.claim_amount = claim_amount;
        policy.status = PolicyStatus::Paid;
        policy.settled_ms = Some(now);
        info!(policy_id = %policy_id, claim_amount, "policy paid");
        Ok(())
    }

    /// Active -> Expired: attested outcome did not qualify.
    pub fn mark_expired(&mut self, policy_id: &PolicyId, now: TimestampMs) -> Result<()> {
        let policy = self.get_mut_expect(policy_id, PolicyStatus::Active)?;
        policy.status = PolicyStatus::Expired;
        policy.settled_ms = Some(now);
        info!(policy_id = %policy_id, "policy expired without trigger");
        Ok(())
    }

    /// Active -> Cancelled through the administrative path.
    pub fn cancel(&mut self, policy_id: &PolicyId, now: TimestampMs) -> Result<()> {
        let policy = self.get_mut_expect(policy_id, PolicyStatus::Active)?;
        policy.status = PolicyStatus::Cancelled;
        policy.settled_ms = Some(now);
        info!(policy_id = %policy_id, "policy cancelled");
        Ok(())
    }

    fn get_mut_expect(
        &mut self,
        policy_id: &PolicyId,
        expected: PolicyStatus,
    ) -> Result<&mut Policy> {
        let policy = self
            .policies
            .get_mut(policy_id)
            .ok_or_else(|| EngineError::Policy(PolicyError::NotFound(policy_id.to_string())))?;
        if policy.status != expected {
            return Err(PolicyError::WrongStatus {
                policy_id: policy_id.to_string(),
                expected: expected.to_string(),
                actual: policy.status.to_string(),
            }
            .into());
        }
        Ok(policy)
    }
}
