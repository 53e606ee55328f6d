//! Voting-power curve shared by the origin ledger and every mirror.
//!
//! Both sides evaluate the same `(amount, end)` pair through [`voting_power`],
//! so their balances agree bit-for-bit at any common timestamp.

use alloy_primitives::U256;

use crate::types::LockedBalance;

/// Seconds per day.
pub const DAY: u64 = 86_400;

/// Epoch unit that unlock times are rounded down to.
pub const WEEK: u64 = 7 * DAY;

/// Longest lock the ledger accepts, and the normalization of the curve.
pub const MAX_LOCK: u64 = 209 * WEEK - 1;

/// Round a timestamp down to the start of its week.
pub fn week_floor(timestamp: u64) -> u64 {
    timestamp / WEEK * WEEK
}

/// Voting power of `lock` at time `t`.
///
/// Zero once `t >= end` or when nothing is locked; otherwise decays linearly
/// as `amount * (end - t) / MAX_LOCK`, truncated once at the end and
/// saturating at `u128::MAX`.
pub fn voting_power(lock: &LockedBalance, t: u64) -> u128 {
    if lock.amount == 0 || t >= lock.end {
        return 0;
    }
    let power = U256::from(lock.amount) * U256::from(lock.end - t) / U256::from(MAX_LOCK);
    u128::try_from(power).unwrap_or(u128::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNIT: u128 = 1_000_000_000_000_000_000;

    #[test]
    fn test_week_floor_alignment() {
        for ts in [0u64, 1, WEEK - 1, WEEK, WEEK + 1, 1_700_000_123, 1_716_000_000] {
            let end = week_floor(ts);
            assert_eq!(end % WEEK, 0);
            assert!(end <= ts);
            assert!(ts - end < WEEK);
        }
    }

    #[test]
    fn test_zero_at_and_after_end() {
        let lock = LockedBalance::new(1000 * UNIT, week_floor(1_700_000_000) + 10 * WEEK);
        assert_eq!(voting_power(&lock, lock.end), 0);
        assert_eq!(voting_power(&lock, lock.end + 1), 0);
        assert_eq!(voting_power(&lock, lock.end + 52 * WEEK), 0);
    }

    #[test]
    fn test_strictly_decreasing_before_end() {
        let start = 1_700_000_000u64;
        let lock = LockedBalance::new(1000 * UNIT, week_floor(start) + 104 * WEEK);

        let mut previous = voting_power(&lock, start);
        assert!(previous > 0);
        let mut t = start + 1;
        while t < lock.end {
            let current = voting_power(&lock, t);
            assert!(current < previous, "power must decrease at t={}", t);
            previous = current;
            t += 3 * DAY + 17;
        }
    }

    #[test]
    fn test_empty_lock_has_no_power() {
        assert_eq!(voting_power(&LockedBalance::EMPTY, 0), 0);
        assert_eq!(voting_power(&LockedBalance::new(0, 10 * WEEK), WEEK), 0);
    }

    #[test]
    fn test_max_lock_power_equals_amount() {
        let now = 1_700_000_000u64;
        let amount = 1000 * UNIT;
        let lock = LockedBalance::new(amount, now + MAX_LOCK);
        let power = voting_power(&lock, now);
        assert_eq!(power, amount);
    }

    #[test]
    fn test_small_lock_has_power() {
        let now = 1_700_000_000u64;
        let lock = LockedBalance::new(1_000, now + 2 * WEEK);
        // 1_000 * 2 weeks / MAX_LOCK
        assert_eq!(voting_power(&lock, now), 9);
        assert!(voting_power(&lock, lock.end - WEEK) > 0);

        let dust = LockedBalance::new(MAX_LOCK as u128 - 1, now + 4 * WEEK);
        assert!(voting_power(&dust, now) > 0);
    }

    #[test]
    fn test_power_proportional_to_amount() {
        let now = 1_700_000_000u64;
        let end = now + 10 * WEEK;
        let one = voting_power(&LockedBalance::new(MAX_LOCK as u128, end), now);
        let two = voting_power(&LockedBalance::new(2 * MAX_LOCK as u128 - 1, end), now);
        assert_eq!(one, (10 * WEEK) as u128);
        assert!(two > one);
        assert_eq!(two, 2 * one - 1);
    }

    #[test]
    fn test_huge_amount_saturates() {
        let lock = LockedBalance::new(u128::MAX, 2 * MAX_LOCK);
        assert_eq!(voting_power(&lock, 0), u128::MAX);
    }
}
