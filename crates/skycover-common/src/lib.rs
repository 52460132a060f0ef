//! # Skycover Common
//!
//! Shared types, errors, and capability checks for the Skycover
//! parametric-insurance settlement engine.
//!
//! ## Core Types
//!
//! - [`PolicyId`] / [`AttestationId`]: digest-derived identifiers
//! - [`FlightId`] / [`FlightStatus`]: the insured real-world event
//! - [`math`]: checked integer basis-point arithmetic for all amounts
//!
//! ## Errors
//!
//! [`EngineError`] unifies the domain errors; [`ErrorClass`] drives how
//! a failure is handled (retry, wait, skip, or abort).

pub mod authz;
pub mod error;
pub mod math;
pub mod types;

pub use authz::{require, Caller, Permission, Role};
pub use error::{
    AttestError, AuthError, EngineError, ErrorClass, MathError, PolicyError, PoolError, Result,
};
pub use math::{Amount, TimestampMs, BPS_DENOM};
pub use types::{AttestationId, FlightId, FlightStatus, PolicyId};

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Current Unix-millisecond timestamp.
pub fn now_ms() -> TimestampMs {
    chrono::Utc::now().timestamp_millis()
}
