//! Pattern aggregation: pure statistics over a window of readings
//!
//! Everything here is a pure function of the readings handed in; the store
//! write happens separately in the facade. Rounding is half-up everywhere,
//! 2 decimals for amounts and 4 for the trend change percentage.

use chrono::{DateTime, Duration, Months, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::{Frequency, PatternStats, Reading, Trend};

/// Round an amount to 2 decimals, half-up
pub(crate) fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Round a percentage to 4 decimals, half-up
pub(crate) fn round4(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero)
}

/// Start of the analysis window for a frequency class, ending at `now`.
/// Both ends of the window are exclusive.
pub fn window_start(frequency: Frequency, now: DateTime<Utc>) -> DateTime<Utc> {
    match frequency {
        Frequency::Daily => now - Duration::days(7),
        Frequency::Weekly => now - Duration::weeks(4),
        Frequency::Monthly => now - Months::new(3),
        Frequency::Seasonal => now - Months::new(12),
    }
}

/// Compute pattern statistics for a window of readings.
///
/// Returns `None` on an empty window; the caller skips the upsert so a stale
/// pattern is never overwritten with zeros. Readings must be chronologically
/// sorted (the window query guarantees this).
pub fn compute_stats(readings: &[Reading]) -> Option<PatternStats> {
    if readings.is_empty() {
        return None;
    }

    let amounts: Vec<Decimal> = readings.iter().map(|r| r.amount).collect();

    Some(PatternStats {
        average_usage: round2(mean(&amounts)),
        peak_usage: peak_usage(&amounts),
        off_peak_usage: off_peak_usage(&amounts),
        trend: trend(&amounts),
    })
}

fn mean(amounts: &[Decimal]) -> Decimal {
    let sum: Decimal = amounts.iter().sum();
    sum / Decimal::from(amounts.len())
}

/// Number of readings in the top/bottom 20% slice: ceil(0.2 * n), at least 1
fn slice_size(n: usize) -> usize {
    (n + 4) / 5
}

/// Mean of the highest-consumption 20% of readings, rounded
fn peak_usage(amounts: &[Decimal]) -> Decimal {
    let mut sorted = amounts.to_vec();
    sorted.sort_by(|a, b| b.cmp(a));
    round2(mean(&sorted[..slice_size(amounts.len())]))
}

/// Mean of the lowest-consumption 20% of readings, rounded
fn off_peak_usage(amounts: &[Decimal]) -> Decimal {
    let mut sorted = amounts.to_vec();
    sorted.sort();
    round2(mean(&sorted[..slice_size(amounts.len())]))
}

/// Direction of change between the two chronological halves of the window.
///
/// The halves are split at n/2, so the first half is the smaller one when n
/// is odd. Change over +10% is increasing, under -10% decreasing; the
/// comparison is strict, so exactly +10.00% stays stable. A zero first-half
/// average cannot produce a ratio; any usage appearing on a zero base is
/// classified as increasing.
fn trend(amounts: &[Decimal]) -> Trend {
    let n = amounts.len();
    if n < 2 {
        return Trend::Stable;
    }

    let mid = n / 2;
    let first_avg = round2(mean(&amounts[..mid]));
    let second_avg = round2(mean(&amounts[mid..]));

    if first_avg.is_zero() {
        return if second_avg > Decimal::ZERO {
            Trend::Increasing
        } else {
            Trend::Stable
        };
    }

    let change_pct = round4((second_avg - first_avg) / first_avg * Decimal::from(100));
    let threshold = Decimal::from(10);

    if change_pct > threshold {
        Trend::Increasing
    } else if change_pct < -threshold {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}
