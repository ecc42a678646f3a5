//! Checked arithmetic and vault health ratios.

use warden::math::{bps_of, checked_add, health_ratio_bps, mul_div, MathError};

#[test]
fn health_ratio_in_basis_points() {
    assert_eq!(health_ratio_bps(150, 100), Ok(15_000));
    assert_eq!(health_ratio_bps(99, 100), Ok(9_900));
    assert_eq!(health_ratio_bps(0, 100), Ok(0));
}

#[test]
fn health_ratio_saturates() {
    assert_eq!(health_ratio_bps(1_000, 1), Ok(u16::MAX));
    assert_eq!(health_ratio_bps(5, 0), Ok(u16::MAX));
    assert_eq!(
        health_ratio_bps(u64::MAX, 1),
        Err(MathError::MathOverflow)
    );
}

#[test]
fn composed_operations_propagate_overflow() {
    let total = checked_add(u64::MAX - 1, 1).expect("fits");
    assert_eq!(checked_add(total, 1), Err(MathError::MathOverflow));
    assert_eq!(bps_of(total, 2), Err(MathError::MathOverflow));
    assert_eq!(mul_div(total, 1, 1), Ok(u64::MAX));
}
