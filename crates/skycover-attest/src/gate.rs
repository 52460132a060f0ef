//! Attestation gate
//!
//! Verifies inclusion proofs against published trust roots and enforces
//! exactly-once consumption of each attested fact. The `consumed` flag
//! kept here is the sole source of truth for "has this real-world fact
//! already been paid for" — including across two policies that happen to
//! reference the same underlying event.

use crate::fact::{AttestationProof, AttestedFact};
use crate::merkle::HASH_SIZE;
use dashmap::DashMap;
use parking_lot::RwLock;
use skycover_common::{now_ms, AttestError, AttestationId, TimestampMs};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// A published round digest. Only finalized roots authorize payouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrustRoot {
    pub round: u64,
    pub digest: [u8; HASH_SIZE],
    pub finalized: bool,
    pub published_at_ms: TimestampMs,
}

/// Per-fact record created on first valid proof
#[derive(Debug, Clone)]
pub struct AttestationRecord {
    pub fact: AttestedFact,
    pub consumed: bool,
    pub first_seen_ms: TimestampMs,
}

/// Gate over externally attested facts
pub struct AttestationGate {
    /// Published trust roots by voting round
    roots: RwLock<HashMap<u64, TrustRoot>>,
    /// Facts seen with a valid proof, keyed by attestation id
    records: DashMap<AttestationId, AttestationRecord>,
}

impl Default for AttestationGate {
    fn default() -> Self {
        Self::new()
    }
}

impl AttestationGate {
    pub fn new() -> Self {
        Self {
            roots: RwLock::new(HashMap::new()),
            records: DashMap::new(),
        }
    }

    /// Publish a (not yet finalized) root digest for a round.
    ///
    /// A finalized root can never be replaced.
    pub fn publish_root(&self, round: u64, digest: [u8; HASH_SIZE]) -> Result<(), AttestError> {
        let mut roots = self.roots.write();
        if let Some(existing) = roots.get(&round) {
            if existing.finalized {
                warn!(round, "attempt to replace finalized trust root");
                return Err(AttestError::InvalidProof);
            }
        }
        roots.insert(
            round,
            TrustRoot {
                round,
                digest,
                finalized: false,
                published_at_ms: now_ms(),
            },
        );
        info!(round, digest = %hex::encode(&digest[..8]), "trust root published");
        Ok(())
    }

    /// Mark a published root as finalized.
    pub fn finalize_root(&self, round: u64) -> Result<(), AttestError> {
        let mut roots = self.roots.write();
        let root = roots
            .get_mut(&round)
            .ok_or(AttestError::UnknownRoot { round })?;
        root.finalized = true;
        info!(round, "trust root finalized");
        Ok(())
    }

    pub fn root(&self, round: u64) -> Option<TrustRoot> {
        self.roots.read().get(&round).copied()
    }

    /// Verify an inclusion proof and return the decoded fact.
    ///
    /// On the first valid proof for a fact, an attestation record is
    /// created (unconsumed). Callers must not act on a fact that did not
    /// come out of this method.
    pub fn verify(&self, proof: &AttestationProof) -> Result<AttestedFact, AttestError> {
        let round = proof.fact.round;
        let root = {
            let roots = self.roots.read();
            *roots.get(&round).ok_or(AttestError::UnknownRoot { round })?
        };
        if !root.finalized {
            return Err(AttestError::RootNotFinalized { round });
        }

        let leaf = proof.fact.leaf_hash()?;
        if proof.path.compute_root(&leaf) != root.digest {
            warn!(round, flight = %proof.fact.flight, "inclusion proof rejected");
            return Err(AttestError::InvalidProof);
        }

        let id = proof.fact.attestation_id()?;
        self.records.entry(id).or_insert_with(|| {
            debug!(attestation_id = %id, round, "attestation recorded");
            AttestationRecord {
                fact: proof.fact.clone(),
                consumed: false,
                first_seen_ms: now_ms(),
            }
        });

        Ok(proof.fact.clone())
    }

    /// Look up a previously verified fact.
    pub fn fact(&self, id: &AttestationId) -> Option<AttestedFact> {
        self.records.get(id).map(|r| r.fact.clone())
    }

    pub fn is_consumed(&self, id: &AttestationId) -> bool {
        self.records.get(id).map(|r| r.consumed).unwrap_or(false)
    }

    /// Consume an attested fact exactly once.
    ///
    /// Returns `false` when the id was already consumed (benign replay),
    /// `true` when this call performed the consumption. Unknown ids are
    /// an error: nothing may be consumed that was not first verified.
    pub fn consume_once(&self, id: &AttestationId) -> Result<bool, AttestError> {
        let mut record = self
            .records
            .get_mut(id)
            .ok_or_else(|| AttestError::UnknownAttestation {
                attestation_id: id.to_string(),
            })?;

        if record.consumed {
            debug!(attestation_id = %id, "replayed attestation ignored");
            return Ok(false);
        }
        record.consumed = true;
        Ok(true)
    }
}
