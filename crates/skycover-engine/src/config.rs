//! Engine configuration

use anyhow::Result;
use serde::{Deserialize, Serialize};
use skycover_pool::PoolConfig;
use skycover_policy::PolicyConfig;

/// Settlement engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Pool ledger settings
    pub pool: PoolConfig,
    /// Underwriting bounds
    pub policy: PolicyConfig,
    /// Batch driver settings
    pub batch: BatchSettings,
    /// Start with deposits/withdrawals/underwriting blocked
    pub start_paused: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            policy: PolicyConfig::default(),
            batch: BatchSettings::default(),
            start_paused: false,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self> {
        // Try to load .env file
        let _ = dotenvy::dotenv();

        let mut cfg = Self::default();

        // Pool settings
        if let Ok(val) = std::env::var("SKYCOVER_MIN_DEPOSIT") {
            if let Ok(v) = val.parse() {
                cfg.pool.min_deposit = v;
            }
        }
        if let Ok(val) = std::env::var("SKYCOVER_MAX_UTILIZATION_BPS") {
            if let Ok(v) = val.parse() {
                cfg.pool.max_utilization_bps = v;
            }
        }
        if let Ok(val) = std::env::var("SKYCOVER_WITHDRAWAL_COOLDOWN_MS") {
            if let Ok(v) = val.parse() {
                cfg.pool.withdrawal_cooldown_ms = v;
            }
        }
        if let Ok(val) = std::env::var("SKYCOVER_YIELD_INTERVAL_MS") {
            if let Ok(v) = val.parse() {
                cfg.pool.yield_interval_ms = v;
            }
        }

        // Underwriting bounds
        if let Ok(val) = std::env::var("SKYCOVER_MIN_COVERAGE") {
            if let Ok(v) = val.parse() {
                cfg.policy.min_coverage = v;
            }
        }
        if let Ok(val) = std::env::var("SKYCOVER_MAX_COVERAGE") {
            if let Ok(v) = val.parse() {
                cfg.policy.max_coverage = v;
            }
        }
        if let Ok(val) = std::env::var("SKYCOVER_MIN_PREMIUM_BPS") {
            if let Ok(v) = val.parse() {
                cfg.policy.min_premium_bps = v;
            }
        }
        if let Ok(val) = std::env::var("SKYCOVER_MAX_PREMIUM_BPS") {
            if let Ok(v) = val.parse() {
                cfg.policy.max_premium_bps = v;
            }
        }

        // Batch settings
        if let Ok(val) = std::env::var("SKYCOVER_BATCH_MAX_ITEMS") {
            if let Ok(v) = val.parse() {
                cfg.batch.max_items = v;
            }
        }
        if let Ok(val) = std::env::var("SKYCOVER_PROCESSING_DELAY_MS") {
            if let Ok(v) = val.parse() {
                cfg.batch.processing_delay_ms = v;
            }
        }

        if let Ok(val) = std::env::var("SKYCOVER_START_PAUSED") {
            cfg.start_paused = val == "1" || val.eq_ignore_ascii_case("true");
        }

        Ok(cfg)
    }
}

/// Batch driver settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSettings {
    /// Hard cap on policies settled per batch invocation
    pub max_items: usize,
    /// Settlement waits this long after scheduled departure so late
    /// attestation corrections can land first
    pub processing_delay_ms: i64,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            max_items: 50,
            processing_delay_ms: 2 * 60 * 60 * 1000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The only test that touches the process environment; keep it that
    // way so parallel tests never observe half-set variables.
    #[test]
    fn test_load_layers_env_over_defaults() {
        std::env::set_var("SKYCOVER_MIN_DEPOSIT", "250");
        std::env::set_var("SKYCOVER_START_PAUSED", "true");
        std::env::set_var("SKYCOVER_BATCH_MAX_ITEMS", "not-a-number");

        let cfg = EngineConfig::load().unwrap();

        assert_eq!(cfg.pool.min_deposit, 250);
        assert!(cfg.start_paused);
        // Unparseable values keep their defaults
        assert_eq!(cfg.batch.max_items, BatchSettings::default().max_items);
        // Untouched settings keep their defaults
        assert_eq!(
            cfg.pool.max_utilization_bps,
            PoolConfig::default().max_utilization_bps
        );

        std::env::remove_var("SKYCOVER_MIN_DEPOSIT");
        std::env::remove_var("SKYCOVER_START_PAUSED");
        std::env::remove_var("SKYCOVER_BATCH_MAX_ITEMS");

        let cfg = EngineConfig::load().unwrap();
        assert_eq!(cfg.pool.min_deposit, PoolConfig::default().min_deposit);
        assert!(!cfg.start_paused);
    }
}
