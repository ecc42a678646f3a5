//! Square roots and quadratic voting power.

use warden::math::{integer_sqrt, sqrt_scaled, voting_power, MathError, MAX_STAKE, SCALE};

/// Sample of roots from 0 up to the largest root whose square fits in u64.
fn sampled_roots() -> impl Iterator<Item = u64> {
    let low = 0..=2_000u64;
    let mid = (0..=64u64).map(|i| i.saturating_mul(67_108_863));
    let high = (u64::from(u32::MAX) - 2_000)..=u64::from(u32::MAX);
    low.chain(mid).chain(high)
}

#[test]
fn sqrt_of_square_roundtrips() {
    for n in sampled_roots() {
        let square = n.checked_mul(n).expect("square fits");
        assert_eq!(integer_sqrt(square), n, "sqrt({n}^2)");
    }
}

#[test]
fn sqrt_is_floor_just_below_squares() {
    for n in sampled_roots().filter(|&n| n > 0) {
        let square = n.checked_mul(n).expect("square fits");
        assert_eq!(integer_sqrt(square - 1), n - 1, "sqrt({n}^2 - 1)");
    }
}

#[test]
fn sqrt_is_monotonic() {
    let mut previous = 0;
    for value in (0..200_000u64).chain(u64::MAX - 100_000..=u64::MAX) {
        let root = integer_sqrt(value);
        assert!(root >= previous, "sqrt dropped at {value}");
        previous = root;
    }
}

#[test]
fn sqrt_fixed_points() {
    assert_eq!(integer_sqrt(0), 0);
    assert_eq!(integer_sqrt(1), 1);
    assert_eq!(integer_sqrt(u64::MAX), u64::from(u32::MAX));
}

#[test]
fn scaled_sqrt_keeps_scale() {
    assert_eq!(sqrt_scaled(SCALE), Ok(SCALE));
    assert_eq!(sqrt_scaled(4 * SCALE), Ok(2 * SCALE));
    assert_eq!(sqrt_scaled(2 * SCALE), Ok(1_414_213));
    assert_eq!(sqrt_scaled(u64::MAX), Err(MathError::MathOverflow));
}

#[test]
fn voting_power_matches_integer_sqrt() {
    assert_eq!(voting_power(10_000_000), Ok(integer_sqrt(10_000_000)));
    assert_eq!(voting_power(10_000_000), Ok(3_162));
    assert_eq!(voting_power(0), Ok(0));
    assert_eq!(voting_power(1), Ok(1));
}

#[test]
fn voting_power_ceiling() {
    assert_eq!(voting_power(MAX_STAKE), Ok(65_535));
    assert_eq!(voting_power(MAX_STAKE + 1), Err(MathError::MathOverflow));
    assert_eq!(voting_power(u64::MAX), Err(MathError::MathOverflow));
}

#[test]
fn voting_power_is_deterministic() {
    for stake in [0, 7, 1_000_000, 123_456_789, MAX_STAKE] {
        let first = voting_power(stake);
        for _ in 0..10 {
            assert_eq!(voting_power(stake), first);
        }
    }
}

#[test]
fn voting_power_only_fails_above_ceiling() {
    for root in [1u64, 2, 255, 4_096, 65_535] {
        let square = root * root;
        assert_eq!(voting_power(square), Ok(root));
        assert_eq!(voting_power(square - 1), Ok(root - 1));
    }
}
