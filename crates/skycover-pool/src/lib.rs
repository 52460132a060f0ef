//! # Skycover Pool
//!
//! Share-based accounting of pooled underwriting capital. The
//! [`PoolLedger`] is a single owned aggregate: deposits mint shares at
//! the current price, withdrawals burn them against unreserved capital,
//! underwriting earmarks each policy's maximum payout, and settlement
//! releases the full reservation while removing only the paid amount.
//!
//! All amounts are integers in the smallest currency unit; all ratios
//! are basis points; all subtractions are checked.

pub mod config;
pub mod ledger;
pub mod provider;
pub mod stats;

pub use config::PoolConfig;
pub use ledger::PoolLedger;
pub use provider::ProviderPosition;
pub use stats::{PoolHealth, PoolStats, RiskLevel};
