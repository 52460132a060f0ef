//! Integer money math
//!
//! All pool amounts are `u128` in the smallest currency unit. Ratios use
//! basis points (denominator 10,000). Conversions multiply before
//! dividing to minimize rounding loss, and every subtraction is checked:
//! an underflow here is an invariant violation, never wrapped.

use crate::error::MathError;

/// Amount in smallest currency units
pub type Amount = u128;

/// Unix-millisecond timestamp
pub type TimestampMs = i64;

/// Basis point denominator
pub const BPS_DENOM: u128 = 10_000;

/// `value * numer / denom`, multiplying first.
pub fn mul_div(value: Amount, numer: u128, denom: u128) -> Result<Amount, MathError> {
    if denom == 0 {
        return Err(MathError::DivideByZero);
    }
    value
        .checked_mul(numer)
        .ok_or(MathError::Overflow)
        .map(|v| v / denom)
}

/// Basis-point fraction of an amount: `amount * bps / 10_000`.
pub fn bps_of(amount: Amount, bps: u16) -> Result<Amount, MathError> {
    mul_div(amount, bps as u128, BPS_DENOM)
}

/// Ratio of two amounts expressed in basis points, rounded down.
pub fn ratio_bps(numer: Amount, denom: Amount) -> Result<u128, MathError> {
    if denom == 0 {
        return Err(MathError::DivideByZero);
    }
    numer
        .checked_mul(BPS_DENOM)
        .ok_or(MathError::Overflow)
        .map(|v| v / denom)
}

pub fn checked_add(a: Amount, b: Amount) -> Result<Amount, MathError> {
    a.checked_add(b).ok_or(MathError::Overflow)
}

pub fn checked_sub(a: Amount, b: Amount) -> Result<Amount, MathError> {
    a.checked_sub(b).ok_or(MathError::Underflow)
}
