//! Read-only pool statistics and health reporting
//!
//! Snapshots are for dashboards and operators. They must never be used
//! to authorize a write decision: every mutating path re-validates
//! against live ledger state under the engine lock.

use crate::ledger::PoolLedger;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use skycover_common::{math::mul_div, Amount};

/// Consistent snapshot of aggregate pool state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolStats {
    pub total_shares: u128,
    pub total_liquidity: Amount,
    pub reserved_liquidity: Amount,
    pub available_liquidity: Amount,
    pub total_premiums_collected: Amount,
    pub total_payouts: Amount,
    pub policies_issued: u64,
    pub claims_paid: u64,
    /// Utilization as a percentage
    pub utilization_pct: Decimal,
    /// Liquidity per share (1.0 at the first-deposit baseline)
    pub share_price: Decimal,
}

/// Qualitative pool risk assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Health report with operator-facing warnings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolHealth {
    pub healthy: bool,
    pub risk_level: RiskLevel,
    pub utilization_bps: u128,
    pub available_liquidity: Amount,
    pub warnings: Vec<String>,
}

impl PoolLedger {
    /// Snapshot the aggregate counters for reporting.
    pub fn stats(&self) -> PoolStats {
        let utilization_bps = self.utilization_bps();
        // bps <= 10_000 for a solvent pool, fits i64 comfortably
        let utilization_pct = Decimal::new(utilization_bps.min(i64::MAX as u128) as i64, 2);

        let share_price = if self.total_shares() == 0 {
            Decimal::ONE
        } else {
            let price_e6 = mul_div(self.total_liquidity(), 1_000_000, self.total_shares())
                .unwrap_or(u128::MAX);
            Decimal::from_i128_with_scale(price_e6.min(i128::MAX as u128) as i128, 6)
        };

        PoolStats {
            total_shares: self.total_shares(),
            total_liquidity: self.total_liquidity(),
            reserved_liquidity: self.reserved_liquidity(),
            available_liquidity: self.available_liquidity(),
            total_premiums_collected: self.total_premiums_collected(),
            total_payouts: self.total_payouts(),
            policies_issued: self.policies_issued(),
            claims_paid: self.claims_paid(),
            utilization_pct,
            share_price,
        }
    }

    /// Operator health report: warnings plus a coarse risk level.
    pub fn health(&self) -> PoolHealth {
        let utilization_bps = self.utilization_bps();
        let cap_bps = self.config().max_utilization_bps as u128;
        let available = self.available_liquidity();
        let mut warnings = Vec::new();

        if cap_bps > 0 && utilization_bps * 10 > cap_bps * 8 {
            warnings.push(format!(
                "utilization {}bps above 80% of the {}bps cap",
                utilization_bps, cap_bps
            ));
        }
        if available < self.config().min_deposit.saturating_mul(10) {
            warnings.push("low unreserved capital".to_string());
        }
        if self.total_payouts() > self.total_premiums_collected() {
            warnings.push("lifetime payouts exceed premium income".to_string());
        }

        let risk_level = match warnings.len() {
            0 => RiskLevel::Low,
            1 => RiskLevel::Medium,
            _ => RiskLevel::High,
        };

        PoolHealth {
            healthy: warnings.is_empty(),
            risk_level,
            utilization_bps,
            available_liquidity: available,
            warnings,
        }
    }
}
