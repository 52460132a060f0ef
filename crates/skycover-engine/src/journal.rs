//! Append-only settlement journal
//!
//! Every state-changing engine operation emits one event after its
//! writes land. The journal is the audit trail used to reconstruct the
//! ledger after a restart; the in-memory implementation backs local
//! deployments and tests, durable backends implement the same trait.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use skycover_common::{Amount, EngineError, Result, TimestampMs};

/// Events appended to the settlement journal
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum LedgerEvent {
    /// Capital deposited, shares minted
    Deposited {
        account: String,
        amount: Amount,
        shares: u128,
        timestamp: TimestampMs,
    },
    /// Shares burned, capital paid out
    Withdrawn {
        account: String,
        shares: u128,
        amount: Amount,
        timestamp: TimestampMs,
    },
    /// Policy underwritten and reservation booked
    PolicyUnderwritten {
        policy_id: String,
        holder: String,
        coverage_amount: Amount,
        premium: Amount,
        max_payout: Amount,
        timestamp: TimestampMs,
    },
    /// Verified attestation attached to a policy
    AttestationAttached {
        policy_id: String,
        attestation_id: String,
        timestamp: TimestampMs,
    },
    /// Claim settled with a payout
    ClaimPaid {
        policy_id: String,
        attestation_id: String,
        amount: Amount,
        timestamp: TimestampMs,
    },
    /// Policy expired without a qualifying trigger
    PolicyExpired {
        policy_id: String,
        attestation_id: String,
        timestamp: TimestampMs,
    },
    /// Policy voided through the administrative path
    PolicyCancelled {
        policy_id: String,
        timestamp: TimestampMs,
    },
    /// Premium surplus distributed to providers
    YieldDistributed {
        amount: Amount,
        timestamp: TimestampMs,
    },
    /// Provider claimed accrued yield
    YieldClaimed {
        account: String,
        amount: Amount,
        timestamp: TimestampMs,
    },
    /// Pause switch flipped
    PauseChanged {
        paused: bool,
        timestamp: TimestampMs,
    },
}

/// Append-only event sink.
pub trait Journal: Send + Sync {
    fn append(&self, event: LedgerEvent) -> Result<()>;
}

/// In-memory journal
#[derive(Default)]
pub struct InMemoryJournal {
    events: RwLock<Vec<LedgerEvent>>,
}

impl InMemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LedgerEvent> {
        self.events.read().clone()
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Serialize the whole journal as JSON lines.
    pub fn to_json_lines(&self) -> Result<String> {
        let events = self.events.read();
        let mut out = String::new();
        for event in events.iter() {
            let line = serde_json::to_string(event).map_err(EngineError::from)?;
            out.push_str(&line);
            out.push('\n');
        }
        Ok(out)
    }
}

impl Journal for InMemoryJournal {
    fn append(&self, event: LedgerEvent) -> Result<()> {
        self.events.write().push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_journal_appends_in_order() {
        let journal = InMemoryJournal::new();
        journal
            .append(LedgerEvent::Deposited {
                account: "alice".into(),
                amount: 100,
                shares: 100,
                timestamp: 1,
            })
            .unwrap();
        journal
            .append(LedgerEvent::YieldDistributed {
                amount: 10,
                timestamp: 2,
            })
            .unwrap();

        let events = journal.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], LedgerEvent::Deposited { .. }));
        assert!(matches!(events[1], LedgerEvent::YieldDistributed { .. }));
    }

    #[test]
    fn test_journal_json_lines_tagged() {
        let journal = InMemoryJournal::new();
        journal
            .append(LedgerEvent::PauseChanged {
                paused: true,
                timestamp: 5,
            })
            .unwrap();
        let lines = journal.to_json_lines().unwrap();
        assert!(lines.contains("\"type\":\"PauseChanged\""));
    }
}
