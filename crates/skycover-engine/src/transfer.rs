//! Capital transfer boundary
//!
//! The engine never moves money itself; it instructs an external
//! transfer capability and assumes each call is atomic. All internal
//! bookkeeping lands before `transfer_out` is invoked, so a failed
//! transfer can never be mistaken for a successful one.

use async_trait::async_trait;
use parking_lot::Mutex;
use skycover_common::{Amount, Result};

/// External token-transfer capability.
#[async_trait]
pub trait CapitalTransfer: Send + Sync {
    /// Pull `amount` from `from` into pool custody.
    async fn transfer_in(&self, from: &str, amount: Amount) -> Result<()>;

    /// Push `amount` from pool custody to `to`.
    async fn transfer_out(&self, to: &str, amount: Amount) -> Result<()>;
}

/// Direction of a recorded transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    In,
    Out,
}

/// A single recorded movement of funds
#[derive(Debug, Clone)]
pub struct TransferEntry {
    pub direction: TransferDirection,
    pub account: String,
    pub amount: Amount,
}

/// In-memory transfer ledger. Used by local deployments without an
/// on-chain custodian and by the test suite.
#[derive(Default)]
pub struct RecordingTransfer {
    entries: Mutex<Vec<TransferEntry>>,
}

impl RecordingTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<TransferEntry> {
        self.entries.lock().clone()
    }

    /// Sum of all transfers out to `account`.
    pub fn total_out(&self, account: &str) -> Amount {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.direction == TransferDirection::Out && e.account == account)
            .map(|e| e.amount)
            .sum()
    }

    /// Sum of all transfers in from `account`.
    pub fn total_in(&self, account: &str) -> Amount {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.direction == TransferDirection::In && e.account == account)
            .map(|e| e.amount)
            .sum()
    }
}

#[async_trait]
impl CapitalTransfer for RecordingTransfer {
    async fn transfer_in(&self, from: &str, amount: Amount) -> Result<()> {
        self.entries.lock().push(TransferEntry {
            direction: TransferDirection::In,
            account: from.to_string(),
            amount,
        });
        Ok(())
    }

    async fn transfer_out(&self, to: &str, amount: Amount) -> Result<()> {
        self.entries.lock().push(TransferEntry {
            direction: TransferDirection::Out,
            account: to.to_string(),
            amount,
        });
        Ok(())
    }
}
