//! Shared engine types

pub mod flight;
pub mod ids;

pub use flight::{FlightId, FlightStatus};
pub use ids::{AttestationId, PolicyId};
