//! C7 Survival Estimator (spec.md §4.6).
//!
//! A pure read path over [`fleetctl_stats::StatsStore`]: given a node's
//! check-in history, estimate the probability it survives the next
//! `time_range_minutes`. `node_statistics.py` in the original is an
//! unfinished stub (Case B is a bare `TODO`, Case A drops the
//! skip-first-bucket rule) — this follows the algorithm as written out in
//! full instead of the original's partial implementation.

pub mod error;

pub use error::{EstimatorError, EstimatorResult};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use fleetctl_stats::StatsStore;
use fleetctl_types::buckets::{day_of_week, seconds_since_midnight, BUCKETS_PER_DAY};
use fleetctl_types::days_between;

/// Probability a node is still alive `time_range_minutes` minutes from
/// now, age-of-history dependent (spec.md §4.6).
///
/// Owns a cloned [`StatsStore`] handle (cheap: it wraps a `PgPool`) rather
/// than borrowing one, so the reconciler loops and the query API can each
/// hold their own long-lived estimator without threading lifetimes through
/// `fleetctl-core`.
#[derive(Clone)]
pub struct SurvivalEstimator {
    stats: StatsStore,
}

/// One `(day_of_week, start_bucket, end_bucket)` slice of the forward
/// window, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WindowSlice {
    day: u8,
    start_bucket: i64,
    end_bucket: i64,
}

impl SurvivalEstimator {
    pub fn new(stats: StatsStore) -> Self {
        Self { stats }
    }

    #[tracing::instrument(skip(self))]
    pub async fn survival_chance(
        &self,
        node_name: &str,
        time_range_minutes: u32,
        now: DateTime<Utc>,
    ) -> EstimatorResult<f64> {
        if time_range_minutes == 0 || time_range_minutes >= fleetctl_types::MAX_SURVIVAL_RANGE_MINUTES {
            return Err(EstimatorError::InvalidRange(time_range_minutes));
        }

        let registration_time = self.stats.get_registration_time(node_name).await?;
        let age_days = (now - registration_time).num_days();

        if age_days < 1 {
            return Ok(0.5);
        }

        let window = buckets_for_window(now, time_range_minutes);

        if age_days >= 7 {
            self.case_a(node_name, &window, age_days).await
        } else {
            self.case_b(node_name, &window, registration_time, now).await
        }
    }

    /// Full-week history: one combined product over every window slice,
    /// skipping the first observed bucket of each day's slice.
    async fn case_a(
        &self,
        node_name: &str,
        window: &[WindowSlice],
        age_days: i64,
    ) -> EstimatorResult<f64> {
        let expected = age_days / 7;
        if expected == 0 {
            return Ok(0.5);
        }

        let mut product = 1.0f64;
        for slice in window {
            let rows = self
                .stats
                .get_check_ins(node_name, slice.day, slice.start_bucket, slice.end_bucket)
                .await?;
            for row in rows.iter().skip(1) {
                if row.count > expected {
                    return Err(EstimatorError::DataCorruption(
                        node_name.to_string(),
                        row.count,
                        expected,
                    ));
                }
                product *= row.count as f64 / expected as f64;
            }
        }
        Ok(product)
    }

    /// Partial history (1..7 days): walk the weekdays from registration to
    /// now, apply the same forward-window bucket slices to each, average
    /// the per-day products.
    async fn case_b(
        &self,
        node_name: &str,
        window: &[WindowSlice],
        registration_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> EstimatorResult<f64> {
        let work_days = days_between(day_of_week(registration_time), day_of_week(now));

        let mut day_products = Vec::with_capacity(work_days.len());
        for day in work_days {
            let mut day_rows = Vec::new();
            for slice in window {
                let rows = self
                    .stats
                    .get_check_ins(node_name, day, slice.start_bucket, slice.end_bucket)
                    .await?;
                day_rows.extend(rows);
            }
            let mut p_day = 1.0f64;
            for row in day_rows.iter().skip(1) {
                p_day *= row.count as f64;
            }
            day_products.push(p_day);
        }

        if day_products.is_empty() {
            return Ok(0.5);
        }
        Ok(day_products.iter().sum::<f64>() / day_products.len() as f64)
    }
}

/// Splits `[now, now + minutes]` into one slice (same calendar day) or two
/// (rollover past midnight), each tagged with its own `day_of_week`.
fn buckets_for_window(now: DateTime<Utc>, minutes: u32) -> Vec<WindowSlice> {
    let end = now + ChronoDuration::minutes(minutes as i64);
    if now.date_naive() == end.date_naive() {
        vec![WindowSlice {
            day: day_of_week(now),
            start_bucket: seconds_since_midnight(now),
            end_bucket: seconds_since_midnight(end),
        }]
    } else {
        vec![
            WindowSlice {
                day: day_of_week(now),
                start_bucket: seconds_since_midnight(now),
                end_bucket: BUCKETS_PER_DAY - 1,
            },
            WindowSlice {
                day: day_of_week(end),
                start_bucket: 0,
                end_bucket: seconds_since_midnight(end),
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn same_day_window_is_single_slice() {
        let now = Utc.with_ymd_and_hms(2026, 7, 31, 10, 0, 0).unwrap();
        let slices = buckets_for_window(now, 30);
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].day, day_of_week(now));
    }

    #[test]
    fn rollover_window_splits_at_midnight() {
        let now = Utc.with_ymd_and_hms(2026, 7, 31, 23, 50, 0).unwrap();
        let slices = buckets_for_window(now, 30);
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].end_bucket, BUCKETS_PER_DAY - 1);
        assert_eq!(slices[1].start_bucket, 0);
    }
}
