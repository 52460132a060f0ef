//! Engine identifiers
//!
//! Policy ids are derived from holder + flight + scheduled departure +
//! a random salt so an id is never reused even when the same holder
//! covers the same flight twice. Attestation ids are the digest of the
//! attested fact as published by the attestation network.

use crate::types::flight::FlightId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique policy identifier (BLAKE3 digest)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyId(pub [u8; 32]);

impl PolicyId {
    /// Derive a policy id from holder, flight, and salt.
    pub fn derive(holder: &str, flight: &FlightId, salt: &[u8; 16]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(holder.as_bytes());
        hasher.update(flight.carrier.as_bytes());
        hasher.update(flight.number.as_bytes());
        hasher.update(&flight.scheduled_departure_ms.to_le_bytes());
        hasher.update(salt);
        Self(*hasher.finalize().as_bytes())
    }

    /// Fresh random salt for id derivation.
    pub fn random_salt() -> [u8; 16] {
        let mut salt = [0u8; 16];
        rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut salt);
        salt
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for PolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short hex form for logs
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

/// Identifier of an attested fact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttestationId(pub [u8; 32]);

impl AttestationId {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for AttestationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flight() -> FlightId {
        FlightId {
            carrier: "SK".to_string(),
            number: "100".to_string(),
            scheduled_departure_ms: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_policy_id_deterministic_for_same_salt() {
        let salt = [7u8; 16];
        let a = PolicyId::derive("holder-1", &flight(), &salt);
        let b = PolicyId::derive("holder-1", &flight(), &salt);
        assert_eq!(a, b);
    }

    #[test]
    fn test_policy_id_unique_across_salts() {
        let a = PolicyId::derive("holder-1", &flight(), &PolicyId::random_salt());
        let b = PolicyId::derive("holder-1", &flight(), &PolicyId::random_salt());
        assert_ne!(a, b);
    }

    #[test]
    fn test_policy_id_depends_on_holder() {
        let salt = [7u8; 16];
        let a = PolicyId::derive("holder-1", &flight(), &salt);
        let b = PolicyId::derive("holder-2", &flight(), &salt);
        assert_ne!(a, b);
    }
}
