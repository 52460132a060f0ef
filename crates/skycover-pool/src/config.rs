//! Pool ledger configuration

use serde::{Deserialize, Serialize};
use skycover_common::{Amount, TimestampMs};

/// Tunable pool parameters. Role-gated at the engine boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Smallest accepted deposit
    pub min_deposit: Amount,
    /// Maximum fraction of the pool that may be reserved, in basis points
    pub max_utilization_bps: u16,
    /// How long after a deposit withdrawals stay blocked
    pub withdrawal_cooldown_ms: TimestampMs,
    /// Minimum interval between yield distributions
    pub yield_interval_ms: TimestampMs,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_deposit: 100,
            max_utilization_bps: 8_000,
            withdrawal_cooldown_ms: 24 * 60 * 60 * 1000,
            yield_interval_ms: 7 * 24 * 60 * 60 * 1000,
        }
    }
}
