//! Savings tracking for applied recommendations
//!
//! A tracking row compares one calendar month of charges against a baseline
//! frozen when tracking starts (the month before). The progress computation
//! is a pure function of the baseline and the month's readings; persistence
//! is an explicit store write by the caller.

use chrono::{Datelike, Months, NaiveDate, Utc};
use rust_decimal::Decimal;

use super::alerts::month_bounds;
use super::pattern::round2;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{Reading, SavingsProgress, SavingsTracking};

/// Compute tracking progress from the tracking month's readings.
///
/// Savings may go negative when the month costs more than the baseline.
pub fn compute_progress(baseline_cost: Decimal, readings: &[Reading]) -> SavingsProgress {
    let actual_usage: Decimal = readings.iter().map(|r| r.amount).sum();
    let actual_cost: Decimal = readings.iter().filter_map(|r| r.charge).sum();

    SavingsProgress {
        actual_usage: round2(actual_usage),
        actual_cost: round2(actual_cost),
        savings_achieved: round2(baseline_cost - actual_cost),
    }
}

/// Manages tracking rows against the store. Stateless between calls.
pub struct SavingsTracker<'a> {
    db: &'a Database,
}

impl<'a> SavingsTracker<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Start tracking a recommendation for the current month.
    ///
    /// The baseline is the charge total of the previous calendar month for
    /// the recommendation's utility. Fails with NotFound when the
    /// recommendation does not belong to the user.
    pub fn start_tracking(&self, user_id: i64, recommendation_id: i64) -> Result<SavingsTracking> {
        let recommendation = self.db.find_recommendation(user_id, recommendation_id)?;

        let today = Utc::now().date_naive();
        let tracking_month = today.with_day(1).unwrap_or(today);
        let baseline_month = tracking_month
            .checked_sub_months(Months::new(1))
            .ok_or_else(|| Error::InvalidData("Tracking month out of range".to_string()))?;

        let (start, end) = month_bounds(baseline_month);
        let readings = self
            .db
            .find_readings_between(user_id, recommendation.utility, start, end)?;
        let baseline_cost = round2(readings.iter().filter_map(|r| r.charge).sum());

        self.db.insert_tracking(
            user_id,
            recommendation_id,
            recommendation.utility,
            tracking_month,
            baseline_cost,
        )
    }

    /// Recompute a tracking row's actuals from the month's readings and
    /// persist the result.
    pub fn refresh_tracking(&self, user_id: i64, tracking_id: i64) -> Result<SavingsTracking> {
        let tracking = self.db.get_tracking(user_id, tracking_id)?;

        let (start, end) = month_bounds(tracking.tracking_month);
        let readings = self
            .db
            .find_readings_between(user_id, tracking.utility, start, end)?;
        let progress = compute_progress(tracking.baseline_cost, &readings);

        self.db
            .update_tracking_progress(user_id, tracking_id, &progress)
    }

    /// Total achieved savings across all tracking rows. Months that cost
    /// more than their baseline don't reduce the total.
    pub fn total_savings(&self, user_id: i64) -> Result<Decimal> {
        let trackings = self.db.list_trackings(user_id)?;
        Ok(trackings
            .iter()
            .map(|t| t.savings_achieved)
            .filter(|s| *s > Decimal::ZERO)
            .sum())
    }

    /// Tracking rows whose month falls in [from, to], both inclusive
    pub fn trackings_for_period(
        &self,
        user_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<SavingsTracking>> {
        self.db.list_trackings_between(user_id, from, to)
    }
}
