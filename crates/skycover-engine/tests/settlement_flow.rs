//! End-to-end settlement flows: deposit, underwrite, attest, settle,
//! and the batch driver, against the in-memory transfer and journal.

use skycover_attest::{build_round_tree, AttestationProof, AttestedFact};
use skycover_common::{
    now_ms, AttestError, Caller, EngineError, FlightId, FlightStatus, PolicyError, PoolError, Role,
};
use skycover_engine::{
    BatchProcessor, CapitalTransfer, ClaimSettlement, EngineConfig, InMemoryJournal, Journal,
    LedgerEvent, RecordingTransfer, SettlementOutcome,
};
use skycover_policy::{PayoutSchedule, PolicyStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const HOUR_MS: i64 = 60 * 60 * 1000;

struct Harness {
    engine: Arc<ClaimSettlement>,
    transfer: Arc<RecordingTransfer>,
    journal: Arc<InMemoryJournal>,
}

fn harness_with(config: EngineConfig) -> Harness {
    let transfer = Arc::new(RecordingTransfer::new());
    let journal = Arc::new(InMemoryJournal::new());
    let engine = Arc::new(ClaimSettlement::new(
        config,
        transfer.clone() as Arc<dyn CapitalTransfer>,
        journal.clone(),
    ));
    Harness {
        engine,
        transfer,
        journal,
    }
}

fn harness() -> Harness {
    harness_with(EngineConfig::default())
}

/// Batch-testing config: the settlement window is already open for
/// flights that have not yet departed.
fn open_window_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.batch.processing_delay_ms = -48 * HOUR_MS;
    config
}

fn flight(number: &str, departure_ms: i64) -> FlightId {
    FlightId {
        carrier: "SK".into(),
        number: number.into(),
        scheduled_departure_ms: departure_ms,
    }
}

fn admin() -> Caller {
    Caller::new("ops", vec![Role::Admin])
}

/// Publish and finalize a single-fact round, returning the proof.
fn attest(engine: &ClaimSettlement, fact: AttestedFact) -> AttestationProof {
    let leaf = fact.leaf_hash().unwrap();
    let tree = build_round_tree(&[leaf]).unwrap();
    engine.gate().publish_root(fact.round, tree.root()).unwrap();
    engine.gate().finalize_root(fact.round).unwrap();
    AttestationProof {
        fact,
        path: tree.path(0).unwrap(),
    }
}

fn delayed_fact(flight: FlightId, delay_minutes: u32, round: u64) -> AttestedFact {
    AttestedFact {
        actual_departure_ms: Some(flight.scheduled_departure_ms + delay_minutes as i64 * 60_000),
        flight,
        delay_minutes,
        status: if delay_minutes > 0 {
            FlightStatus::Delayed
        } else {
            FlightStatus::OnTime
        },
        round,
    }
}

#[tokio::test]
async fn test_delayed_flight_pays_and_releases_full_reservation() {
    let h = harness();
    let departure = now_ms() + HOUR_MS;

    let shares = h.engine.deposit("alice", 10_000).await.unwrap();
    assert_eq!(shares, 10_000);

    let policy_id = h
        .engine
        .underwrite("bob", flight("451", departure), 1_000, 50, None)
        .await
        .unwrap();
    let stats = h.engine.stats();
    assert_eq!(stats.total_liquidity, 10_050);
    assert_eq!(stats.reserved_liquidity, 1_000);

    // 150-minute delay: the 120-minute tier (30%) qualifies
    let proof = attest(&h.engine, delayed_fact(flight("451", departure), 150, 1));
    h.engine.attach_attestation(&policy_id, &proof).unwrap();

    let outcome = h.engine.settle(&policy_id).await.unwrap();
    assert_eq!(outcome, SettlementOutcome::Paid { amount: 300 });

    let stats = h.engine.stats();
    assert_eq!(stats.total_liquidity, 9_750);
    assert_eq!(stats.reserved_liquidity, 0);
    assert_eq!(stats.total_payouts, 300);
    assert_eq!(stats.claims_paid, 1);

    let policy = h.engine.policy(&policy_id).unwrap();
    assert_eq!(policy.status, PolicyStatus::Paid);
    assert_eq!(policy.claim_amount, 300);

    assert_eq!(h.transfer.total_out("bob"), 300);
    assert!(h
        .journal
        .events()
        .iter()
        .any(|e| matches!(e, LedgerEvent::ClaimPaid { amount: 300, .. })));
}

#[tokio::test]
async fn test_on_time_flight_expires_without_payout() {
    let h = harness();
    let departure = now_ms() + HOUR_MS;

    h.engine.deposit("alice", 10_000).await.unwrap();
    let policy_id = h
        .engine
        .underwrite("bob", flight("451", departure), 1_000, 50, None)
        .await
        .unwrap();

    let proof = attest(&h.engine, delayed_fact(flight("451", departure), 0, 1));
    h.engine.attach_attestation(&policy_id, &proof).unwrap();

    let outcome = h.engine.settle(&policy_id).await.unwrap();
    assert_eq!(outcome, SettlementOutcome::Expired);

    let stats = h.engine.stats();
    // The reservation returns to the pool as yield; nothing leaves
    assert_eq!(stats.total_liquidity, 10_050);
    assert_eq!(stats.reserved_liquidity, 0);
    assert_eq!(stats.total_payouts, 0);
    assert_eq!(
        h.engine.policy(&policy_id).unwrap().status,
        PolicyStatus::Expired
    );
    assert_eq!(h.transfer.total_out("bob"), 0);
}

#[tokio::test]
async fn test_second_settle_rejected_without_state_change() {
    let h = harness();
    let departure = now_ms() + HOUR_MS;

    h.engine.deposit("alice", 10_000).await.unwrap();
    let policy_id = h
        .engine
        .underwrite("bob", flight("451", departure), 1_000, 50, None)
        .await
        .unwrap();
    let proof = attest(&h.engine, delayed_fact(flight("451", departure), 150, 1));
    h.engine.attach_attestation(&policy_id, &proof).unwrap();
    h.engine.settle(&policy_id).await.unwrap();

    let before = h.engine.stats();
    let err = h.engine.settle(&policy_id).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Policy(PolicyError::WrongStatus { .. })
    ));
    let after = h.engine.stats();
    assert_eq!(before.total_liquidity, after.total_liquidity);
    assert_eq!(before.total_payouts, after.total_payouts);
    assert_eq!(h.transfer.total_out("bob"), 300);
}

#[tokio::test]
async fn test_one_fact_never_pays_two_policies() {
    let h = harness();
    let departure = now_ms() + HOUR_MS;

    h.engine.deposit("alice", 10_000).await.unwrap();
    let first = h
        .engine
        .underwrite("bob", flight("451", departure), 1_000, 50, None)
        .await
        .unwrap();
    let second = h
        .engine
        .underwrite("carol", flight("451", departure), 1_000, 50, None)
        .await
        .unwrap();

    // Both policies cover the same flight; one attested fact exists
    let proof = attest(&h.engine, delayed_fact(flight("451", departure), 150, 1));
    h.engine.attach_attestation(&first, &proof).unwrap();
    h.engine.attach_attestation(&second, &proof).unwrap();

    let outcome = h.engine.settle(&first).await.unwrap();
    assert_eq!(outcome, SettlementOutcome::Paid { amount: 300 });

    let err = h.engine.settle(&second).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Attestation(AttestError::AlreadyProcessed { .. })
    ));

    // Second policy untouched, its reservation still held
    assert_eq!(
        h.engine.policy(&second).unwrap().status,
        PolicyStatus::Active
    );
    let stats = h.engine.stats();
    assert_eq!(stats.reserved_liquidity, 1_000);
    assert_eq!(stats.total_payouts, 300);
    assert_eq!(h.transfer.total_out("carol"), 0);
}

#[tokio::test]
async fn test_batch_settles_eligible_and_is_idempotent() {
    let h = harness_with(open_window_config());
    let departure = now_ms() + HOUR_MS;

    h.engine.deposit("alice", 10_000).await.unwrap();
    let delayed = h
        .engine
        .underwrite("bob", flight("451", departure), 1_000, 50, None)
        .await
        .unwrap();
    let on_time = h
        .engine
        .underwrite("carol", flight("452", departure), 1_000, 50, None)
        .await
        .unwrap();

    let proof_a = attest(&h.engine, delayed_fact(flight("451", departure), 150, 1));
    let proof_b = attest(&h.engine, delayed_fact(flight("452", departure), 0, 2));
    h.engine.attach_attestation(&delayed, &proof_a).unwrap();
    h.engine.attach_attestation(&on_time, &proof_b).unwrap();

    let batch = BatchProcessor::new(h.engine.clone());
    let report = batch.run_batch(&admin(), 10).await.unwrap();
    assert_eq!(report.scanned, 2);
    assert_eq!(report.paid, 1);
    assert_eq!(report.expired, 1);
    assert_eq!(report.failed, 0);

    // Immediate re-run finds nothing left to do
    let report = batch.run_batch(&admin(), 10).await.unwrap();
    assert_eq!(report.scanned, 0);
    assert_eq!(report.processed(), 0);
    assert_eq!(h.transfer.total_out("bob"), 300);
}

#[tokio::test]
async fn test_batch_skips_unopened_settlement_window() {
    // Default config: window opens 2h after scheduled departure
    let h = harness();
    let departure = now_ms() + HOUR_MS;

    h.engine.deposit("alice", 10_000).await.unwrap();
    let policy_id = h
        .engine
        .underwrite("bob", flight("451", departure), 1_000, 50, None)
        .await
        .unwrap();
    let proof = attest(&h.engine, delayed_fact(flight("451", departure), 150, 1));
    h.engine.attach_attestation(&policy_id, &proof).unwrap();

    let batch = BatchProcessor::new(h.engine.clone());
    let report = batch.run_batch(&admin(), 10).await.unwrap();
    assert_eq!(report.scanned, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.processed(), 0);
    assert_eq!(
        h.engine.policy(&policy_id).unwrap().status,
        PolicyStatus::Active
    );
}

#[tokio::test]
async fn test_batch_requires_permission() {
    let h = harness();
    let batch = BatchProcessor::new(h.engine.clone());
    let err = batch
        .run_batch(&Caller::user("random"), 10)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Auth(_)));
}

#[tokio::test]
async fn test_rejected_reservation_refunds_premium() {
    let h = harness();
    let departure = now_ms() + HOUR_MS;

    h.engine.deposit("alice", 1_000).await.unwrap();
    // Projected utilization 900 / 1_018 well above the 80% cap
    let err = h
        .engine
        .underwrite("bob", flight("451", departure), 900, 18, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Pool(PoolError::UtilizationCapExceeded { .. })
    ));

    let stats = h.engine.stats();
    assert_eq!(stats.reserved_liquidity, 0);
    assert_eq!(stats.total_premiums_collected, 0);
    assert_eq!(stats.policies_issued, 0);
    // Premium went in and came straight back
    assert_eq!(h.transfer.total_in("bob"), 18);
    assert_eq!(h.transfer.total_out("bob"), 18);
}

#[tokio::test]
async fn test_pause_blocks_entry_points_but_not_settlement() {
    let h = harness();
    let departure = now_ms() + HOUR_MS;

    h.engine.deposit("alice", 10_000).await.unwrap();
    let policy_id = h
        .engine
        .underwrite("bob", flight("451", departure), 1_000, 50, None)
        .await
        .unwrap();
    let proof = attest(&h.engine, delayed_fact(flight("451", departure), 150, 1));
    h.engine.attach_attestation(&policy_id, &proof).unwrap();

    h.engine.pause(&admin()).unwrap();

    let err = h.engine.deposit("dave", 5_000).await.unwrap_err();
    assert!(matches!(err, EngineError::Pool(PoolError::Paused)));
    let err = h
        .engine
        .underwrite("dave", flight("452", departure), 1_000, 50, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Pool(PoolError::Paused)));

    // A paused pool must still pay out
    let outcome = h.engine.settle(&policy_id).await.unwrap();
    assert_eq!(outcome, SettlementOutcome::Paid { amount: 300 });

    h.engine.resume(&admin()).unwrap();
    assert!(h.engine.deposit("dave", 5_000).await.is_ok());
}

#[tokio::test]
async fn test_invalid_proof_never_attaches() {
    let h = harness();
    let departure = now_ms() + HOUR_MS;

    h.engine.deposit("alice", 10_000).await.unwrap();
    let policy_id = h
        .engine
        .underwrite("bob", flight("451", departure), 1_000, 50, None)
        .await
        .unwrap();

    let mut proof = attest(&h.engine, delayed_fact(flight("451", departure), 150, 1));
    // Tamper with the claimed fact after the root was finalized
    proof.fact.delay_minutes = 500;

    let err = h.engine.attach_attestation(&policy_id, &proof).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Attestation(AttestError::InvalidProof)
    ));
    assert!(h
        .engine
        .policy(&policy_id)
        .unwrap()
        .attestation_reference
        .is_none());
}

#[tokio::test]
async fn test_fact_for_wrong_flight_rejected() {
    let h = harness();
    let departure = now_ms() + HOUR_MS;

    h.engine.deposit("alice", 10_000).await.unwrap();
    let policy_id = h
        .engine
        .underwrite("bob", flight("451", departure), 1_000, 50, None)
        .await
        .unwrap();

    let proof = attest(&h.engine, delayed_fact(flight("999", departure), 150, 1));
    let err = h.engine.attach_attestation(&policy_id, &proof).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Attestation(AttestError::FactMismatch)
    ));
}

#[tokio::test]
async fn test_yield_distribution_and_claim() {
    let mut config = EngineConfig::default();
    config.pool.yield_interval_ms = 0;
    let h = harness_with(config);
    let departure = now_ms() + HOUR_MS;

    h.engine.deposit("alice", 10_000).await.unwrap();
    let policy_id = h
        .engine
        .underwrite("bob", flight("451", departure), 1_000, 50, None)
        .await
        .unwrap();
    let proof = attest(&h.engine, delayed_fact(flight("451", departure), 0, 1));
    h.engine.attach_attestation(&policy_id, &proof).unwrap();
    h.engine.settle(&policy_id).await.unwrap();

    // Premium 50, no payouts: the whole surplus goes to alice
    let distributed = h.engine.distribute_yield(&admin()).unwrap();
    assert_eq!(distributed, 50);

    let claimed = h.engine.claim_yield("alice").await.unwrap();
    assert_eq!(claimed, 50);
    assert_eq!(h.transfer.total_out("alice"), 50);

    let err = h.engine.claim_yield("alice").await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Pool(PoolError::NoClaimableYield { .. })
    ));
}

#[tokio::test]
async fn test_dust_coverage_cannot_strand_premium() {
    let h = harness();
    let departure = now_ms() + HOUR_MS;

    // Cancellation-only schedule whose 1 bps of coverage 100 rounds to
    // a zero maximum payout. Underwriting must reject it outright; an
    // empty pool must never end up holding the premium with no shares.
    let schedule = PayoutSchedule::new(vec![], 1).unwrap();
    let err = h
        .engine
        .underwrite("bob", flight("451", departure), 100, 2, Some(schedule))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Policy(PolicyError::ZeroMaxPayout { .. })
    ));

    let stats = h.engine.stats();
    assert_eq!(stats.total_shares, 0);
    assert_eq!(stats.total_liquidity, 0);

    // The collected premium came straight back
    assert_eq!(h.transfer.total_in("bob"), 2);
    assert_eq!(h.transfer.total_out("bob"), 2);
}

/// Journal sink that can be switched into a failing state.
struct FlakyJournal {
    fail: AtomicBool,
}

impl Journal for FlakyJournal {
    fn append(&self, _event: LedgerEvent) -> skycover_common::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(EngineError::Journal("sink unavailable".into()));
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_journal_failure_does_not_block_payout() {
    let transfer = Arc::new(RecordingTransfer::new());
    let journal = Arc::new(FlakyJournal {
        fail: AtomicBool::new(false),
    });
    let engine = ClaimSettlement::new(
        EngineConfig::default(),
        transfer.clone() as Arc<dyn CapitalTransfer>,
        journal.clone(),
    );
    let departure = now_ms() + HOUR_MS;

    engine.deposit("alice", 10_000).await.unwrap();
    let policy_id = engine
        .underwrite("bob", flight("451", departure), 1_000, 50, None)
        .await
        .unwrap();
    let proof = attest(&engine, delayed_fact(flight("451", departure), 150, 1));
    engine.attach_attestation(&policy_id, &proof).unwrap();

    journal.fail.store(true, Ordering::SeqCst);
    let err = engine.settle(&policy_id).await.unwrap_err();
    assert!(matches!(err, EngineError::Journal(_)));

    // The holder was still paid and the books agree
    assert_eq!(transfer.total_out("bob"), 300);
    assert_eq!(engine.policy(&policy_id).unwrap().status, PolicyStatus::Paid);
    let stats = engine.stats();
    assert_eq!(stats.total_payouts, 300);
    assert_eq!(stats.reserved_liquidity, 0);
}
