//! Coverage agreements

use crate::schedule::PayoutSchedule;
use serde::{Deserialize, Serialize};
use skycover_common::{Amount, AttestationId, FlightId, PolicyId, TimestampMs};
use std::fmt;

/// Lifecycle state of a policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyStatus {
    /// Created, reservation not yet booked
    Pending,
    /// Reservation booked, coverage live
    Active,
    /// Non-zero payout computed, transfer in flight
    Triggered,
    /// Payout transferred
    Paid,
    /// Attested outcome did not qualify; reservation released
    Expired,
    /// Administratively cancelled
    Cancelled,
}

impl fmt::Display for PolicyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PolicyStatus::Pending => "pending",
            PolicyStatus::Active => "active",
            PolicyStatus::Triggered => "triggered",
            PolicyStatus::Paid => "paid",
            PolicyStatus::Expired => "expired",
            PolicyStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

impl PolicyStatus {
    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PolicyStatus::Paid | PolicyStatus::Expired | PolicyStatus::Cancelled
        )
    }
}

/// A single coverage agreement between a holder and the pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    /// Unique, never reused
    pub policy_id: PolicyId,
    /// Holder account
    pub holder: String,
    /// Insured flight
    pub flight: FlightId,
    pub coverage_amount: Amount,
    pub premium_paid: Amount,
    pub status: PolicyStatus,
    /// Delay/cancellation tiers for this policy
    pub schedule: PayoutSchedule,
    /// coverage_amount x max schedule fraction; reserved in the pool
    pub max_payout: Amount,
    /// Set once when a verified fact is attached; never reassigned
    pub attestation_reference: Option<AttestationId>,
    /// Zero until settled with a payout
    pub claim_amount: Amount,
    pub created_ms: TimestampMs,
    pub activated_ms: Option<TimestampMs>,
    pub settled_ms: Option<TimestampMs>,
}

impl Policy {
    pub fn is_active(&self) -> bool {
        self.status == PolicyStatus::Active
    }
}
