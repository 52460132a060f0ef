//! Capital provider positions
//!
//! One position per contributor, created on first deposit and never
//! deleted: a zero-balance position stays behind for audit.

use serde::{Deserialize, Serialize};
use skycover_common::{Amount, TimestampMs};

/// A single capital contributor's position in the pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderPosition {
    /// Account identifier
    pub account: String,
    /// Running total of deposits, decremented on withdrawal
    pub contributed_amount: Amount,
    /// Claim on pool value, in shares
    pub share_balance: u128,
    /// Timestamp of the most recent deposit; gates the cooldown
    pub last_deposit_ms: TimestampMs,
    /// Yield allocated to this provider across distributions
    pub earned_yield: Amount,
    /// Yield already claimed; never exceeds `earned_yield`
    pub claimed_yield: Amount,
}

impl ProviderPosition {
    pub fn new(account: String, now: TimestampMs) -> Self {
        Self {
            account,
            contributed_amount: 0,
            share_balance: 0,
            last_deposit_ms: now,
            earned_yield: 0,
            claimed_yield: 0,
        }
    }

    /// Yield the provider may still claim.
    pub fn claimable_yield(&self) -> Amount {
        // claimed <= earned always; saturate rather than trust it here
        self.earned_yield.saturating_sub(self.claimed_yield)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_position_is_empty() {
        let p = ProviderPosition::new("alice".into(), 1_000);
        assert_eq!(p.share_balance, 0);
        assert_eq!(p.claimable_yield(), 0);
        assert_eq!(p.last_deposit_ms, 1_000);
    }

    #[test]
    fn test_claimable_yield_delta() {
        let mut p = ProviderPosition::new("alice".into(), 0);
        p.earned_yield = 500;
        p.claimed_yield = 120;
        assert_eq!(p.claimable_yield(), 380);
    }
}
