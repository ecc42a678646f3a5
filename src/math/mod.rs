//! Deterministic integer arithmetic.
//!
//! Nothing in this module touches floating point. Every operation that can
//! leave the `u64` domain goes through a checked helper and surfaces a
//! [`MathError`] instead of wrapping or saturating silently.

pub mod fixed_point;

pub use fixed_point::{
    health_ratio_bps, integer_sqrt, sqrt_scaled, voting_power, MAX_STAKE, SCALE,
};

/// Arithmetic domain failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MathError {
    /// A result or scaled intermediate does not fit the working width.
    #[error("math overflow")]
    MathOverflow,

    /// A subtraction on an unsigned value would go negative.
    #[error("math underflow")]
    MathUnderflow,

    /// A divisor was zero.
    #[error("division by zero")]
    DivisionByZero,
}

/// Basis points in one whole (100%).
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Checked addition.
///
/// # Errors
///
/// Returns [`MathError::MathOverflow`] when the sum exceeds `u64::MAX`.
#[inline]
pub fn checked_add(a: u64, b: u64) -> Result<u64, MathError> {
    a.checked_add(b).ok_or(MathError::MathOverflow)
}

/// Checked subtraction.
///
/// # Errors
///
/// Returns [`MathError::MathUnderflow`] when `b > a`.
#[inline]
pub fn checked_sub(a: u64, b: u64) -> Result<u64, MathError> {
    a.checked_sub(b).ok_or(MathError::MathUnderflow)
}

/// Checked multiplication.
///
/// # Errors
///
/// Returns [`MathError::MathOverflow`] when the product exceeds `u64::MAX`.
#[inline]
pub fn checked_mul(a: u64, b: u64) -> Result<u64, MathError> {
    a.checked_mul(b).ok_or(MathError::MathOverflow)
}

/// Compute `a * b / denominator`, rounding down.
///
/// # Errors
///
/// Returns [`MathError::DivisionByZero`] for a zero denominator and
/// [`MathError::MathOverflow`] when either the product or the quotient does
/// not fit in `u64`.
pub fn mul_div(a: u64, b: u64, denominator: u64) -> Result<u64, MathError> {
    let product = checked_mul(a, b)?;
    product
        .checked_div(denominator)
        .ok_or(MathError::DivisionByZero)
}

/// Take `bps` basis points of `amount`, rounding down.
///
/// # Errors
///
/// Returns [`MathError::MathOverflow`] when `amount * bps` overflows.
pub fn bps_of(amount: u64, bps: u16) -> Result<u64, MathError> {
    mul_div(amount, u64::from(bps), BPS_DENOMINATOR)
}
