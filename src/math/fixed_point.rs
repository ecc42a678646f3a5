//! Fixed-point square roots and quadratic voting power.
//!
//! Values carry six implied decimal places ([`SCALE`]). Roots use the
//! Babylonian iteration started from a power-of-two overestimate, so the
//! sequence decreases monotonically onto the floor root and the result is
//! identical on every platform.

use super::{checked_mul, mul_div, MathError, BPS_DENOMINATOR};

/// Fixed-point scale: one whole unit is `1_000_000` raw units.
pub const SCALE: u64 = 1_000_000;

/// Largest stake accepted by [`voting_power`] (`2^32 - 1`).
///
/// Keeps the root below `2^16`, so squaring it back never approaches the
/// `u64` width.
pub const MAX_STAKE: u64 = 4_294_967_295;

/// Upper bound on Newton steps. Convergence from the initial guess takes
/// at most six steps for any `u64`.
const MAX_SQRT_ITERATIONS: u32 = 64;

/// Floor of the square root of `value`.
///
/// Exact for perfect squares. Uses only integer division and addition.
pub fn integer_sqrt(value: u64) -> u64 {
    if value < 2 {
        return value;
    }

    // 2^ceil(bits/2) squared is strictly greater than `value`.
    let bits = u64::BITS.saturating_sub(value.leading_zeros());
    let mut x = 1u64.checked_shl(bits.div_ceil(2)).unwrap_or(u64::MAX);

    for _ in 0..MAX_SQRT_ITERATIONS {
        let Some(quotient) = value.checked_div(x) else {
            break;
        };
        // x <= 2^32 and quotient <= 2^32, so the sum never saturates.
        let next = x.saturating_add(quotient) / 2;
        if next >= x {
            break;
        }
        x = next;
    }

    x
}

/// Square root of a fixed-point value, returned at the same scale.
///
/// `sqrt_scaled(SCALE) == SCALE`; `sqrt_scaled(4 * SCALE) == 2 * SCALE`.
///
/// # Errors
///
/// Returns [`MathError::MathOverflow`] if `value * SCALE` exceeds `u64::MAX`.
pub fn sqrt_scaled(value: u64) -> Result<u64, MathError> {
    let widened = checked_mul(value, SCALE)?;
    Ok(integer_sqrt(widened))
}

/// Quadratic voting power: the floor square root of the stake.
///
/// Identical input always yields identical output; a zero stake has zero
/// power.
///
/// # Errors
///
/// Returns [`MathError::MathOverflow`] for stakes above [`MAX_STAKE`].
pub fn voting_power(stake_amount: u64) -> Result<u64, MathError> {
    if stake_amount > MAX_STAKE {
        return Err(MathError::MathOverflow);
    }
    Ok(integer_sqrt(stake_amount))
}

/// Vault health ratio (assets over liabilities) in basis points.
///
/// `15_000` means assets cover liabilities 1.5x. Saturates at `u16::MAX`,
/// which is also returned when there are no liabilities.
///
/// # Errors
///
/// Returns [`MathError::MathOverflow`] if `total_value * 10_000` overflows.
pub fn health_ratio_bps(total_value: u64, liabilities: u64) -> Result<u16, MathError> {
    if liabilities == 0 {
        return Ok(u16::MAX);
    }
    let ratio = mul_div(total_value, BPS_DENOMINATOR, liabilities)?;
    Ok(u16::try_from(ratio).unwrap_or(u16::MAX))
}
