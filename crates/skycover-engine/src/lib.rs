//! # Skycover Engine
//!
//! Settlement orchestration for the Skycover parametric-insurance pool.
//! [`ClaimSettlement`] is the single write path over the pool ledger and
//! policy registry: underwriting, attested payouts, yield, and the
//! administrative surface. [`BatchProcessor`] drives settlement over the
//! eligible-policy set with per-item failure isolation.

pub mod batch;
pub mod config;
pub mod journal;
pub mod settlement;
pub mod telemetry;
pub mod transfer;

pub use batch::{BatchProcessor, BatchReport};
pub use config::{BatchSettings, EngineConfig};
pub use journal::{InMemoryJournal, Journal, LedgerEvent};
pub use settlement::{ClaimSettlement, SettlementOutcome};
pub use transfer::{CapitalTransfer, RecordingTransfer, TransferDirection, TransferEntry};
