//! Error types for the Skycover settlement engine
//!
//! Provides a unified error type and domain-specific error variants.
//! Every error maps onto one of four handling classes: input validation,
//! invariant guard, replay/consistency, or fatal arithmetic. The batch
//! driver isolates the first three and aborts on the fourth.

use thiserror::Error;

/// Result type alias using EngineError
pub type Result<T> = std::result::Result<T, EngineError>;

/// How a failed operation must be handled by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad input, retryable after the caller corrects it
    Validation,
    /// Invariant guard held, retryable after conditions change
    Guard,
    /// Replay or stale reference, benign no-op at the batch level
    Replay,
    /// Arithmetic that should be structurally impossible; ledger
    /// corruption risk, never retried
    Fatal,
}

/// Unified error type for engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),

    #[error("Attestation error: {0}")]
    Attestation(#[from] AttestError),

    #[error("Arithmetic error: {0}")]
    Arithmetic(#[from] MathError),

    #[error("Authorization error: {0}")]
    Auth(#[from] AuthError),

    #[error("Capital transfer failed: {0}")]
    Transfer(String),

    #[error("Journal append failed: {0}")]
    Journal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl EngineError {
    /// Handling class for this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            EngineError::Pool(e) => e.class(),
            EngineError::Policy(e) => e.class(),
            EngineError::Attestation(e) => e.class(),
            EngineError::Arithmetic(_) => ErrorClass::Fatal,
            EngineError::Auth(_) => ErrorClass::Validation,
            EngineError::Transfer(_) => ErrorClass::Guard,
            EngineError::Journal(_) => ErrorClass::Guard,
            EngineError::Config(_) => ErrorClass::Validation,
        }
    }

    /// True when the error indicates ledger corruption risk.
    pub fn is_fatal(&self) -> bool {
        self.class() == ErrorClass::Fatal
    }
}

/// Pool ledger errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PoolError {
    #[error("Deposit below minimum: amount {amount}, minimum {minimum}")]
    DepositBelowMinimum { amount: u128, minimum: u128 },

    #[error("Insufficient shares: required {required}, available {available}")]
    InsufficientShares { required: u128, available: u128 },

    #[error("Deposit cooldown active for {remaining_ms}ms")]
    CooldownActive { remaining_ms: i64 },

    #[error("Insufficient unreserved liquidity: required {required}, available {available}")]
    InsufficientAvailable { required: u128, available: u128 },

    #[error("Insufficient pool liquidity: required {required}, available {available}")]
    InsufficientLiquidity { required: u128, available: u128 },

    #[error("Utilization cap exceeded: projected {projected_bps}bps, cap {cap_bps}bps")]
    UtilizationCapExceeded { projected_bps: u128, cap_bps: u16 },

    #[error("Yield distribution interval not elapsed: {remaining_ms}ms remaining")]
    YieldIntervalNotElapsed { remaining_ms: i64 },

    #[error("No claimable yield for provider {provider}")]
    NoClaimableYield { provider: String },

    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("Pool is paused")]
    Paused,
}

impl PoolError {
    pub fn class(&self) -> ErrorClass {
        match self {
            PoolError::DepositBelowMinimum { .. } => ErrorClass::Validation,
            PoolError::ProviderNotFound(_) => ErrorClass::Replay,
            _ => ErrorClass::Guard,
        }
    }
}

/// Policy registry errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PolicyError {
    #[error("Policy not found: {0}")]
    NotFound(String),

    #[error("Policy {policy_id} has status {actual}, expected {expected}")]
    WrongStatus {
        policy_id: String,
        expected: String,
        actual: String,
    },

    #[error("Departure time is in the past")]
    DepartureInPast,

    #[error("Coverage out of bounds: {amount} not in [{min}, {max}]")]
    CoverageOutOfBounds { amount: u128, min: u128, max: u128 },

    #[error("Premium out of bounds: {premium} not in [{min}, {max}]")]
    PremiumOutOfBounds { premium: u128, min: u128, max: u128 },

    #[error("Payout schedule has no tiers")]
    EmptySchedule,

    #[error("Maximum payout rounds to zero for coverage {coverage}")]
    ZeroMaxPayout { coverage: u128 },

    #[error("Policy {0} already has an attestation reference")]
    AttestationAlreadyAttached(String),

    #[error("Policy {0} has no attestation reference")]
    NoAttestationReference(String),
}

impl PolicyError {
    pub fn class(&self) -> ErrorClass {
        match self {
            PolicyError::NotFound(_) | PolicyError::WrongStatus { .. } => ErrorClass::Replay,
            PolicyError::NoAttestationReference(_) => ErrorClass::Guard,
            PolicyError::AttestationAlreadyAttached(_) => ErrorClass::Replay,
            _ => ErrorClass::Validation,
        }
    }
}

/// Attestation gate errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AttestError {
    #[error("Inclusion proof is invalid")]
    InvalidProof,

    #[error("Unknown trust root for round {round}")]
    UnknownRoot { round: u64 },

    #[error("Trust root for round {round} is not finalized")]
    RootNotFinalized { round: u64 },

    #[error("Attestation {attestation_id} already processed")]
    AlreadyProcessed { attestation_id: String },

    #[error("Unknown attestation: {attestation_id}")]
    UnknownAttestation { attestation_id: String },

    #[error("Attested fact does not match policy flight")]
    FactMismatch,

    #[error("Failed to decode attested fact: {0}")]
    Decode(String),
}

impl AttestError {
    pub fn class(&self) -> ErrorClass {
        match self {
            AttestError::InvalidProof
            | AttestError::FactMismatch
            | AttestError::Decode(_) => ErrorClass::Validation,
            AttestError::AlreadyProcessed { .. }
            | AttestError::UnknownAttestation { .. } => ErrorClass::Replay,
            AttestError::UnknownRoot { .. } | AttestError::RootNotFinalized { .. } => {
                ErrorClass::Guard
            }
        }
    }
}

/// Checked-arithmetic errors. Always fatal: the guards upstream are
/// supposed to make these unreachable.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MathError {
    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Arithmetic underflow")]
    Underflow,

    #[error("Division by zero")]
    DivideByZero,
}

/// Capability check errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AuthError {
    #[error("Caller {account} lacks permission {permission}")]
    MissingPermission { account: String, permission: String },
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Journal(err.to_string())
    }
}
