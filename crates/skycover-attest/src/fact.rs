//! Attested facts and their wire encoding

use crate::merkle::{hash_leaf, InclusionPath, HASH_SIZE};
use serde::{Deserialize, Serialize};
use skycover_common::{AttestError, AttestationId, FlightId, FlightStatus, TimestampMs};

/// A verified real-world fact about a flight, as attested by the
/// external network in a given voting round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttestedFact {
    /// Flight this fact refers to
    pub flight: FlightId,
    /// Actual departure, absent when the flight never departed
    pub actual_departure_ms: Option<TimestampMs>,
    /// Departure delay in minutes (0 for on-time and cancelled)
    pub delay_minutes: u32,
    /// Reported status
    pub status: FlightStatus,
    /// Voting round whose trust root covers this fact
    pub round: u64,
}

impl AttestedFact {
    /// Canonical wire encoding, also the preimage of the fact's id.
    pub fn encode(&self) -> Result<Vec<u8>, AttestError> {
        bincode::serialize(self).map_err(|e| AttestError::Decode(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, AttestError> {
        bincode::deserialize(bytes).map_err(|e| AttestError::Decode(e.to_string()))
    }

    /// Leaf hash of this fact in the round tree.
    pub fn leaf_hash(&self) -> Result<[u8; HASH_SIZE], AttestError> {
        Ok(hash_leaf(&self.encode()?))
    }

    /// Deterministic attestation id: digest of the canonical encoding.
    pub fn attestation_id(&self) -> Result<AttestationId, AttestError> {
        Ok(AttestationId::from_bytes(*blake3::hash(&self.encode()?).as_bytes()))
    }
}

/// Opaque proof blob handed to the gate: the claimed fact plus its
/// sibling path in the round tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttestationProof {
    pub fact: AttestedFact,
    pub path: InclusionPath,
}
