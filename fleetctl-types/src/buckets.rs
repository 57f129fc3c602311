//! Check-in bucket arithmetic (spec.md §3, §4.2).
//!
//! A day is divided into 8640 ten-second buckets. `seconds_since_midnight`
//! (the name spec.md itself uses for this helper, despite returning a
//! bucket index rather than a raw second count) and `days_between` are the
//! two primitives the statistics store and the survival estimator both
//! build on.

use chrono::{DateTime, Datelike, Timelike, Utc};

pub const SECONDS_IN_DAY: i64 = 86_400;
pub const SECONDS_PER_CHECK_IN: i64 = 10;
pub const BUCKETS_PER_DAY: i64 = SECONDS_IN_DAY / SECONDS_PER_CHECK_IN;

/// `floor((ts - midnight(ts)) / SECONDS_PER_CHECK_IN)`, i.e. the bucket
/// index in `0..8640` that `ts` falls into.
pub fn seconds_since_midnight(ts: DateTime<Utc>) -> i64 {
    let secs_since_midnight =
        i64::from(ts.hour()) * 3600 + i64::from(ts.minute()) * 60 + i64::from(ts.second());
    secs_since_midnight / SECONDS_PER_CHECK_IN
}

/// Weekday index in `0..=6` matching `chrono`'s Monday-first convention,
/// used as the `day_of_week` column in the check-in matrix.
pub fn day_of_week(ts: DateTime<Utc>) -> u8 {
    ts.weekday().num_days_from_monday() as u8
}

/// `[a, a+1, ..., b]` walked forward modulo 7, inclusive of both ends.
/// `a == b` yields `[a]` (spec.md §4.2, §8).
pub fn days_between(a: u8, b: u8) -> Vec<u8> {
    let mut days = vec![a % 7];
    if a % 7 == b % 7 {
        return days;
    }
    let mut current = a % 7;
    while current != b % 7 {
        current = (current + 1) % 7;
        days.push(current);
    }
    days
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    #[test]
    fn bucket_zero_at_midnight() {
        let ts = Utc.with_ymd_and_hms(2026, 7, 31, 0, 0, 0).unwrap();
        assert_eq!(seconds_since_midnight(ts), 0);
    }

    #[test]
    fn bucket_rounds_down_within_window() {
        let ts = Utc.with_ymd_and_hms(2026, 7, 31, 0, 0, 9).unwrap();
        assert_eq!(seconds_since_midnight(ts), 0);
        let ts = Utc.with_ymd_and_hms(2026, 7, 31, 0, 0, 10).unwrap();
        assert_eq!(seconds_since_midnight(ts), 1);
    }

    #[test]
    fn last_bucket_of_day() {
        let ts = Utc.with_ymd_and_hms(2026, 7, 31, 23, 59, 59).unwrap();
        assert_eq!(seconds_since_midnight(ts), BUCKETS_PER_DAY - 1);
    }

    #[test]
    fn days_between_same_day_is_singleton() {
        assert_eq!(days_between(3, 3), vec![3]);
    }

    #[test]
    fn days_between_wraps_forward() {
        assert_eq!(days_between(5, 1), vec![5, 6, 0, 1]);
    }

    proptest! {
        #[test]
        fn days_between_starts_and_ends_correctly(a in 0u8..7, b in 0u8..7) {
            let days = days_between(a, b);
            prop_assert_eq!(days[0], a);
            prop_assert_eq!(*days.last().unwrap(), b);
            let expected_len = (((b as i32 - a as i32).rem_euclid(7)) + 1) as usize;
            prop_assert_eq!(days.len(), expected_len);
            for w in days.windows(2) {
                prop_assert_eq!((w[0] + 1) % 7, w[1]);
            }
        }
    }
}
