//! Flight identity and attested status

use crate::math::TimestampMs;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single scheduled flight departure
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlightId {
    /// IATA carrier code, e.g. "SK"
    pub carrier: String,
    /// Flight number without the carrier prefix
    pub number: String,
    /// Scheduled departure (Unix milliseconds)
    pub scheduled_departure_ms: TimestampMs,
}

impl fmt::Display for FlightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}@{}",
            self.carrier, self.number, self.scheduled_departure_ms
        )
    }
}

/// Flight status as reported by the attestation network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlightStatus {
    OnTime,
    Delayed,
    Cancelled,
}

impl FlightStatus {
    /// Wire status code used in attested facts.
    pub fn code(&self) -> u8 {
        match self {
            FlightStatus::OnTime => 0,
            FlightStatus::Delayed => 1,
            FlightStatus::Cancelled => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(FlightStatus::OnTime),
            1 => Some(FlightStatus::Delayed),
            2 => Some(FlightStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlightStatus::OnTime => write!(f, "on_time"),
            FlightStatus::Delayed => write!(f, "delayed"),
            FlightStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}
