//! Share-based pool ledger
//!
//! The ledger is a single owned aggregate: every mutating operation
//! takes `&mut self` and is atomic with respect to all pool state. The
//! engine wraps it in one lock; nothing here performs I/O.
//!
//! Solvency invariants, checked after every mutation:
//! - `reserved_liquidity <= total_liquidity`
//! - `reserved_liquidity / total_liquidity <= max_utilization`
//! - `total_shares == 0  <=>  total_liquidity == 0`

use crate::config::PoolConfig;
use crate::provider::ProviderPosition;
use serde::{Deserialize, Serialize};
use skycover_common::{
    math::{checked_add, checked_sub, mul_div, ratio_bps},
    Amount, PoolError, Result, TimestampMs,
};
use std::collections::HashMap;
use tracing::{debug, info};

/// The pool ledger: share accounting plus reserved-capital tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolLedger {
    config: PoolConfig,

    /// Outstanding shares
    total_shares: u128,
    /// Capital currently held, including reserved capital and premium
    total_liquidity: Amount,
    /// Capital earmarked against open policies' maximum payouts
    reserved_liquidity: Amount,
    /// Lifetime premium income
    total_premiums_collected: Amount,
    /// Lifetime payouts
    total_payouts: Amount,
    /// Premium surplus already allocated to providers as yield
    yield_distributed: Amount,
    /// Last successful yield distribution
    last_yield_distribution_ms: Option<TimestampMs>,

    /// Lifetime counters
    policies_issued: u64,
    claims_paid: u64,

    /// Provider positions by account; never removed
    providers: HashMap<String, ProviderPosition>,
}

impl PoolLedger {
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            total_shares: 0,
            total_liquidity: 0,
            reserved_liquidity: 0,
            total_premiums_collected: 0,
            total_payouts: 0,
            yield_distributed: 0,
            last_yield_distribution_ms: None,
            policies_issued: 0,
            claims_paid: 0,
            providers: HashMap::new(),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Replace the pool parameters. Capability-checked by the engine.
    pub fn set_config(&mut self, config: PoolConfig) {
        info!(
            min_deposit = config.min_deposit,
            max_utilization_bps = config.max_utilization_bps,
            "pool configuration updated"
        );
        self.config = config;
    }

    pub fn total_shares(&self) -> u128 {
        self.total_shares
    }

    pub fn total_liquidity(&self) -> Amount {
        self.total_liquidity
    }

    pub fn reserved_liquidity(&self) -> Amount {
        self.reserved_liquidity
    }

    pub fn total_premiums_collected(&self) -> Amount {
        self.total_premiums_collected
    }

    pub fn total_payouts(&self) -> Amount {
        self.total_payouts
    }

    pub fn policies_issued(&self) -> u64 {
        self.policies_issued
    }

    pub fn claims_paid(&self) -> u64 {
        self.claims_paid
    }

    /// Capital not earmarked against open policies.
    pub fn available_liquidity(&self) -> Amount {
        self.total_liquidity.saturating_sub(self.reserved_liquidity)
    }

    /// Current utilization in basis points (0 for an empty pool).
    pub fn utilization_bps(&self) -> u128 {
        if self.total_liquidity == 0 {
            0
        } else {
            // total > 0, cannot fail
            ratio_bps(self.reserved_liquidity, self.total_liquidity).unwrap_or(0)
        }
    }

    pub fn provider(&self, account: &str) -> Option<&ProviderPosition> {
        self.providers.get(account)
    }

    pub fn providers(&self) -> impl Iterator<Item = &ProviderPosition> {
        self.providers.values()
    }

    /// Deposit capital; mints shares at the current price.
    ///
    /// The first depositor sets the 1:1 baseline, which both avoids a
    /// divide-by-zero and stops price manipulation against an empty
    /// pool. Returns the number of shares minted.
    pub fn deposit(&mut self, account: &str, amount: Amount, now: TimestampMs) -> Result<u128> {
        if amount < self.config.min_deposit {
            return Err(PoolError::DepositBelowMinimum {
                amount,
                minimum: self.config.min_deposit,
            }
            .into());
        }

        let shares = if self.total_shares == 0 {
            amount
        } else {
            mul_div(amount, self.total_shares, self.total_liquidity)?
        };

        self.total_liquidity = checked_add(self.total_liquidity, amount)?;
        self.total_shares = checked_add(self.total_shares, shares)?;

        let position = self
            .providers
            .entry(account.to_string())
            .or_insert_with(|| ProviderPosition::new(account.to_string(), now));
        position.contributed_amount = checked_add(position.contributed_amount, amount)?;
        position.share_balance = checked_add(position.share_balance, shares)?;
        position.last_deposit_ms = now;

        info!(account, amount, shares, "deposit accepted");
        Ok(shares)
    }

    /// Burn shares and pay out the proportional amount.
    ///
    /// Fails inside the deposit cooldown, when shares exceed the
    /// caller's balance, or when the payout would dip into reserved
    /// capital. All bookkeeping lands before any external transfer.
    pub fn withdraw(&mut self, account: &str, shares: u128, now: TimestampMs) -> Result<Amount> {
        let position = self
            .providers
            .get(account)
            .ok_or_else(|| PoolError::ProviderNotFound(account.to_string()))?;

        if shares > position.share_balance {
            return Err(PoolError::InsufficientShares {
                required: shares,
                available: position.share_balance,
            }
            .into());
        }

        let cooldown_until = position.last_deposit_ms + self.config.withdrawal_cooldown_ms;
        if now < cooldown_until {
            return Err(PoolError::CooldownActive {
                remaining_ms: cooldown_until - now,
            }
            .into());
        }

        let amount = mul_div(shares, self.total_liquidity, self.total_shares)?;
        let available = self.available_liquidity();
        if amount > available {
            return Err(PoolError::InsufficientAvailable {
                required: amount,
                available,
            }
            .into());
        }
        self.ensure_cap_after_removal(amount)?;

        self.total_shares = checked_sub(self.total_shares, shares)?;
        self.total_liquidity = checked_sub(self.total_liquidity, amount)?;

        let position = self
            .providers
            .get_mut(account)
            .ok_or_else(|| PoolError::ProviderNotFound(account.to_string()))?;
        position.share_balance = checked_sub(position.share_balance, shares)?;
        // A withdrawal can exceed the running contribution once yield
        // has accrued; the counter floors at zero.
        position.contributed_amount = position.contributed_amount.saturating_sub(amount);

        info!(account, shares, amount, "withdrawal settled");
        Ok(amount)
    }

    /// Accept a premium and earmark a policy's maximum payout.
    ///
    /// Fails closed when the projected utilization (reservation added,
    /// premium counted in) would exceed the cap. On success both the
    /// premium and the reservation are booked before the policy is
    /// allowed to become active.
    pub fn reserve_for_policy(&mut self, premium: Amount, max_payout: Amount) -> Result<()> {
        // An empty pool cannot back coverage. Booking a premium against
        // zero shares would leave liquidity outside share accounting.
        if self.total_shares == 0 {
            return Err(PoolError::InsufficientLiquidity {
                required: max_payout,
                available: 0,
            }
            .into());
        }

        let projected_reserved = checked_add(self.reserved_liquidity, max_payout)?;
        let projected_liquidity = checked_add(self.total_liquidity, premium)?;

        let projected_bps = ratio_bps(projected_reserved, projected_liquidity)?;
        if projected_bps > self.config.max_utilization_bps as u128 {
            debug!(
                premium,
                max_payout, projected_bps, "reservation rejected: utilization cap"
            );
            return Err(PoolError::UtilizationCapExceeded {
                projected_bps,
                cap_bps: self.config.max_utilization_bps,
            }
            .into());
        }

        self.total_liquidity = projected_liquidity;
        self.reserved_liquidity = projected_reserved;
        self.total_premiums_collected = checked_add(self.total_premiums_collected, premium)?;
        self.policies_issued += 1;

        info!(premium, max_payout, projected_bps, "policy reservation booked");
        Ok(())
    }

    /// Pay a claim: release the policy's full original reservation and
    /// remove the paid amount from the pool.
    ///
    /// The unpaid remainder of the reservation stays in the pool as
    /// yield. Bookkeeping completes before the external transfer-out.
    pub fn settle_claim(&mut self, amount: Amount, max_payout: Amount) -> Result<()> {
        if amount > self.total_liquidity {
            return Err(PoolError::InsufficientLiquidity {
                required: amount,
                available: self.total_liquidity,
            }
            .into());
        }

        self.reserved_liquidity = checked_sub(self.reserved_liquidity, max_payout)?;
        self.total_liquidity = checked_sub(self.total_liquidity, amount)?;
        self.total_payouts = checked_add(self.total_payouts, amount)?;
        self.claims_paid += 1;

        info!(amount, max_payout, "claim settled against pool");
        Ok(())
    }

    /// Release a reservation with no payout (policy expired untriggered).
    /// The reserved capital stays in the pool and becomes yield.
    pub fn release_reserve(&mut self, max_payout: Amount) -> Result<()> {
        self.reserved_liquidity = checked_sub(self.reserved_liquidity, max_payout)?;
        debug!(max_payout, "reservation released without payout");
        Ok(())
    }

    /// Allocate undistributed premium surplus to providers pro-rata by
    /// share balance. Rate-limited to once per configured interval.
    /// Returns the total allocated.
    pub fn distribute_yield(&mut self, now: TimestampMs) -> Result<Amount> {
        if let Some(last) = self.last_yield_distribution_ms {
            let next_at = last + self.config.yield_interval_ms;
            if now < next_at {
                return Err(PoolError::YieldIntervalNotElapsed {
                    remaining_ms: next_at - now,
                }
                .into());
            }
        }

        let surplus = self
            .total_premiums_collected
            .saturating_sub(self.total_payouts);
        let distributable = surplus.saturating_sub(self.yield_distributed);

        self.last_yield_distribution_ms = Some(now);

        if distributable == 0 || self.total_shares == 0 {
            debug!("yield distribution ran with nothing to allocate");
            return Ok(0);
        }

        let total_shares = self.total_shares;
        let mut allocated: Amount = 0;
        for position in self.providers.values_mut() {
            if position.share_balance == 0 {
                continue;
            }
            let slice = mul_div(distributable, position.share_balance, total_shares)?;
            position.earned_yield = checked_add(position.earned_yield, slice)?;
            allocated = checked_add(allocated, slice)?;
        }

        // Rounding dust stays undistributed and rolls into the next run
        self.yield_distributed = checked_add(self.yield_distributed, allocated)?;

        info!(allocated, distributable, "yield distributed");
        Ok(allocated)
    }

    /// Pay out a provider's earned-but-unclaimed yield.
    /// Returns the amount to transfer.
    pub fn claim_yield(&mut self, account: &str) -> Result<Amount> {
        let claimable = self
            .providers
            .get(account)
            .ok_or_else(|| PoolError::ProviderNotFound(account.to_string()))?
            .claimable_yield();

        if claimable == 0 {
            return Err(PoolError::NoClaimableYield {
                provider: account.to_string(),
            }
            .into());
        }

        let available = self.available_liquidity();
        if claimable > available {
            return Err(PoolError::InsufficientAvailable {
                required: claimable,
                available,
            }
            .into());
        }
        self.ensure_cap_after_removal(claimable)?;

        self.total_liquidity = checked_sub(self.total_liquidity, claimable)?;
        let position = self
            .providers
            .get_mut(account)
            .ok_or_else(|| PoolError::ProviderNotFound(account.to_string()))?;
        position.claimed_yield = checked_add(position.claimed_yield, claimable)?;

        info!(account, amount = claimable, "yield claimed");
        Ok(claimable)
    }

    /// Reject a removal that would push utilization over the cap.
    fn ensure_cap_after_removal(&self, amount: Amount) -> Result<()> {
        let new_total = checked_sub(self.total_liquidity, amount)?;
        if new_total == 0 {
            // Removal of the last capital requires zero reservations,
            // which the available-liquidity guard already enforced.
            return Ok(());
        }
        let projected_bps = ratio_bps(self.reserved_liquidity, new_total)?;
        if projected_bps > self.config.max_utilization_bps as u128 {
            return Err(PoolError::UtilizationCapExceeded {
                projected_bps,
                cap_bps: self.config.max_utilization_bps,
            }
            .into());
        }
        Ok(())
    }

    /// Debug-time invariant check; used by tests after mutation batches.
    pub fn check_invariants(&self) -> bool {
        let solvent = self.reserved_liquidity <= self.total_liquidity;
        let shares_iff_liquidity = (self.total_shares == 0) == (self.total_liquidity == 0);
        solvent && shares_iff_liquidity
    }
}
