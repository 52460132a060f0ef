//! Payout schedules
//!
//! A schedule maps delay thresholds to basis-point fractions of the
//! coverage amount, plus one cancellation fraction. Evaluation is a pure
//! function: cancellation dominates, delay tiers are checked from the
//! longest threshold downward, first match wins, no match pays zero.

use serde::{Deserialize, Serialize};
use skycover_common::{
    math::bps_of, Amount, EngineError, FlightStatus, PolicyError, Result,
};

/// One delay tier: `delay >= delay_minutes` pays `payout_bps`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutTier {
    pub delay_minutes: u32,
    pub payout_bps: u16,
}

/// Ordered payout schedule for one policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutSchedule {
    /// Delay tiers, kept sorted by threshold ascending
    tiers: Vec<PayoutTier>,
    /// Fraction paid on cancellation
    cancellation_bps: u16,
}

impl PayoutSchedule {
    /// Build a schedule; tiers are sorted by threshold. At least one
    /// non-zero fraction must exist.
    pub fn new(mut tiers: Vec<PayoutTier>, cancellation_bps: u16) -> Result<Self> {
        tiers.sort_by_key(|t| t.delay_minutes);
        let has_payout = cancellation_bps > 0 || tiers.iter().any(|t| t.payout_bps > 0);
        if !has_payout {
            return Err(EngineError::Policy(PolicyError::EmptySchedule));
        }
        Ok(Self {
            tiers,
            cancellation_bps,
        })
    }

    pub fn tiers(&self) -> &[PayoutTier] {
        &self.tiers
    }

    pub fn cancellation_bps(&self) -> u16 {
        self.cancellation_bps
    }

    /// Highest fraction this schedule can ever pay.
    pub fn max_bps(&self) -> u16 {
        self.tiers
            .iter()
            .map(|t| t.payout_bps)
            .max()
            .unwrap_or(0)
            .max(self.cancellation_bps)
    }

    /// Maximum possible payout for a coverage amount; this is what the
    /// pool reserves for the policy's lifetime.
    pub fn max_payout(&self, coverage_amount: Amount) -> Result<Amount> {
        Ok(bps_of(coverage_amount, self.max_bps())?)
    }

    /// Evaluate the qualifying fraction for an attested outcome.
    pub fn evaluate_bps(&self, delay_minutes: u32, status: FlightStatus) -> u16 {
        if status == FlightStatus::Cancelled {
            return self.cancellation_bps;
        }
        // Longest threshold first; first match wins
        self.tiers
            .iter()
            .rev()
            .find(|t| delay_minutes >= t.delay_minutes)
            .map(|t| t.payout_bps)
            .unwrap_or(0)
    }

    /// Payout amount for an attested outcome; zero means no trigger.
    pub fn evaluate(
        &self,
        coverage_amount: Amount,
        delay_minutes: u32,
        status: FlightStatus,
    ) -> Result<Amount> {
        Ok(bps_of(
            coverage_amount,
            self.evaluate_bps(delay_minutes, status),
        )?)
    }
}

impl Default for PayoutSchedule {
    /// Default flight-delay schedule: 60m -> 10%, 120m -> 30%,
    /// 240m -> 50%, cancellation -> 100%.
    fn default() -> Self {
        Self {
            tiers: vec![
                PayoutTier {
                    delay_minutes: 60,
                    payout_bps: 1_000,
                },
                PayoutTier {
                    delay_minutes: 120,
                    payout_bps: 3_000,
                },
                PayoutTier {
                    delay_minutes: 240,
                    payout_bps: 5_000,
                },
            ],
            cancellation_bps: 10_000,
        }
    }
}
