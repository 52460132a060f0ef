//! # Skycover Attest
//!
//! Attestation gate for the settlement engine: BLAKE3 merkle inclusion
//! proofs verified against per-round trust roots, and an exactly-once
//! consumption registry that makes replaying a single attested fact into
//! two payouts impossible.
//!
//! Producing attestations (and any retry/backoff around fetching them)
//! is the caller's problem; only verification and consumption live here.

pub mod fact;
pub mod gate;
pub mod merkle;

pub use fact::{AttestationProof, AttestedFact};
pub use gate::{AttestationGate, AttestationRecord, TrustRoot};
pub use merkle::{build_round_tree, InclusionPath, RoundTree, HASH_SIZE};
