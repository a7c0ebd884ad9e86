//! Alert evaluation rules
//!
//! Five independent rules: budget exceeded, high month-over-month usage and
//! unusual daily spikes fire on ingestion; the two positive-feedback rules
//! fire on month close. Each rule does its own dedup check scoped to
//! (user, utility, kind) before inserting, so all of them may fire for the
//! same event.

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use tracing::debug;

use super::pattern::round2;
use crate::db::Database;
use crate::error::Result;
use crate::models::{AlertKind, Reading, UtilityType};

/// Evaluates alert rules against the store. Stateless between calls.
pub struct AlertEvaluator<'a> {
    db: &'a Database,
}

/// UTC bounds [start, end) of the calendar month containing `date`
pub(crate) fn month_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let first = date.with_day(1).unwrap_or(date);
    let start = Utc.from_utc_datetime(&first.and_hms_opt(0, 0, 0).unwrap());
    (start, start + Months::new(1))
}

fn sum_amounts(readings: &[Reading]) -> Decimal {
    readings.iter().map(|r| r.amount).sum()
}

fn sum_charges(readings: &[Reading]) -> Decimal {
    readings.iter().filter_map(|r| r.charge).sum()
}

impl<'a> AlertEvaluator<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Ingestion-triggered rules (budget, high usage, unusual pattern).
    /// Returns the ids of alerts actually inserted.
    pub fn on_reading_ingested(
        &self,
        user_id: i64,
        utility: UtilityType,
        measured_at: DateTime<Utc>,
    ) -> Result<Vec<i64>> {
        let mut inserted = Vec::new();

        if let Some(id) = self.check_budget(user_id, utility, measured_at)? {
            inserted.push(id);
        }
        if let Some(id) = self.check_high_usage(user_id, utility, measured_at)? {
            inserted.push(id);
        }
        if let Some(id) = self.check_unusual_pattern(user_id, utility, measured_at)? {
            inserted.push(id);
        }

        Ok(inserted)
    }

    /// Month-close rules (the two positive-feedback checks) for one utility
    /// in the given billing month.
    pub fn on_month_close(
        &self,
        user_id: i64,
        utility: UtilityType,
        billing_month: NaiveDate,
    ) -> Result<Vec<i64>> {
        let mut inserted = Vec::new();

        if let Some(id) = self.check_under_budget(user_id, utility, billing_month)? {
            inserted.push(id);
        }
        if let Some(id) = self.check_charge_reduction(user_id, utility, billing_month)? {
            inserted.push(id);
        }

        Ok(inserted)
    }

    /// True when an alert of this kind was already created inside its dedup
    /// window. Read-then-write; concurrent ingestion for the same key can
    /// still race, which the store tolerates.
    fn is_duplicate(&self, user_id: i64, utility: UtilityType, kind: AlertKind) -> Result<bool> {
        let window = match kind.dedup_window() {
            Some(w) => w,
            None => return Ok(false),
        };
        let recent = self
            .db
            .find_recent_alerts(user_id, utility, kind, Utc::now() - window)?;
        Ok(!recent.is_empty())
    }

    fn insert_unless_duplicate(
        &self,
        user_id: i64,
        utility: UtilityType,
        kind: AlertKind,
        message: String,
    ) -> Result<Option<i64>> {
        if self.is_duplicate(user_id, utility, kind)? {
            debug!(
                user_id,
                utility = utility.as_str(),
                kind = kind.as_str(),
                "Alert suppressed by dedup window"
            );
            return Ok(None);
        }
        let id = self.db.insert_alert(user_id, utility, kind, &message)?;
        Ok(Some(id))
    }

    /// Month-to-date charge against the monthly budget threshold
    fn check_budget(
        &self,
        user_id: i64,
        utility: UtilityType,
        measured_at: DateTime<Utc>,
    ) -> Result<Option<i64>> {
        let budget = match self.db.find_budget(user_id)? {
            Some(b) => b,
            None => return Ok(None),
        };
        let monthly_budget = match budget.monthly_budget {
            Some(b) if b > Decimal::ZERO => b,
            _ => return Ok(None),
        };
        let threshold = match budget.alert_threshold {
            Some(t) => t,
            None => return Ok(None),
        };

        let (start, end) = month_bounds(measured_at.date_naive());
        let readings = self.db.find_readings_between(user_id, utility, start, end)?;
        let total_charge = sum_charges(&readings);

        let usage_pct = round2(total_charge / monthly_budget * Decimal::from(100));
        if usage_pct < threshold {
            return Ok(None);
        }

        let message = format!(
            "{} spending has reached {}% of your monthly budget ({} of {}).",
            utility.display_name(),
            usage_pct,
            round2(total_charge),
            round2(monthly_budget),
        );
        self.insert_unless_duplicate(user_id, utility, AlertKind::BudgetExceeded, message)
    }

    /// Month-over-month usage increase of 30% or more
    fn check_high_usage(
        &self,
        user_id: i64,
        utility: UtilityType,
        measured_at: DateTime<Utc>,
    ) -> Result<Option<i64>> {
        let (start, end) = month_bounds(measured_at.date_naive());
        let (prev_start, prev_end) = (start - Months::new(1), start);

        let current = sum_amounts(&self.db.find_readings_between(user_id, utility, start, end)?);
        let last_month = sum_amounts(
            &self
                .db
                .find_readings_between(user_id, utility, prev_start, prev_end)?,
        );

        // No baseline month, no ratio
        if last_month <= Decimal::ZERO {
            return Ok(None);
        }

        let increase_pct = round2((current - last_month) / last_month * Decimal::from(100));
        if increase_pct < Decimal::from(30) {
            return Ok(None);
        }

        let message = format!(
            "{} usage is up {}% compared to last month.",
            utility.display_name(),
            increase_pct,
        );
        self.insert_unless_duplicate(user_id, utility, AlertKind::HighUsage, message)
    }

    /// Today's usage at least 50% above the trailing 7-day daily average.
    /// The average divides by 7 regardless of how many days had readings, so
    /// zero-usage days pull it down.
    fn check_unusual_pattern(
        &self,
        user_id: i64,
        utility: UtilityType,
        measured_at: DateTime<Utc>,
    ) -> Result<Option<i64>> {
        let day_ago = measured_at - Duration::days(1);
        let week_before = day_ago - Duration::days(7);

        let today_usage = sum_amounts(
            &self
                .db
                .find_readings_between(user_id, utility, day_ago, measured_at)?,
        );
        let recent_total = sum_amounts(
            &self
                .db
                .find_readings_between(user_id, utility, week_before, day_ago)?,
        );
        let recent_avg = recent_total / Decimal::from(7);

        if recent_avg <= Decimal::ZERO {
            return Ok(None);
        }

        let spike_pct = round2((today_usage - recent_avg) / recent_avg * Decimal::from(100));
        if spike_pct < Decimal::from(50) {
            return Ok(None);
        }

        let message = format!(
            "Today's {} usage is {}% above your recent daily average.",
            utility.display_name().to_lowercase(),
            spike_pct,
        );
        self.insert_unless_duplicate(user_id, utility, AlertKind::UnusualPattern, message)
    }

    /// Month closed at or under 90% of the monthly budget
    fn check_under_budget(
        &self,
        user_id: i64,
        utility: UtilityType,
        billing_month: NaiveDate,
    ) -> Result<Option<i64>> {
        let budget = match self.db.find_budget(user_id)? {
            Some(b) => b,
            None => return Ok(None),
        };
        let monthly_budget = match budget.monthly_budget {
            Some(b) if b > Decimal::ZERO => b,
            _ => return Ok(None),
        };

        let (start, end) = month_bounds(billing_month);
        let readings = self.db.find_readings_between(user_id, utility, start, end)?;
        if readings.is_empty() {
            return Ok(None);
        }
        let total_charge = sum_charges(&readings);

        if total_charge > monthly_budget * Decimal::new(9, 1) {
            return Ok(None);
        }

        let saved = round2(monthly_budget - total_charge);
        let message = format!(
            "Nice work! You stayed under your {} budget last month and saved {}.",
            utility.display_name().to_lowercase(),
            saved,
        );
        self.insert_unless_duplicate(user_id, utility, AlertKind::PositiveFeedback, message)
    }

    /// Month-over-month charge reduction of 10% or more
    fn check_charge_reduction(
        &self,
        user_id: i64,
        utility: UtilityType,
        billing_month: NaiveDate,
    ) -> Result<Option<i64>> {
        let (start, end) = month_bounds(billing_month);
        let (prev_start, prev_end) = (start - Months::new(1), start);

        let current = sum_charges(&self.db.find_readings_between(user_id, utility, start, end)?);
        let prior = sum_charges(
            &self
                .db
                .find_readings_between(user_id, utility, prev_start, prev_end)?,
        );

        if prior <= Decimal::ZERO {
            return Ok(None);
        }

        let reduction_pct = round2((prior - current) / prior * Decimal::from(100));
        if reduction_pct < Decimal::from(10) {
            return Ok(None);
        }

        let message = format!(
            "Your {} charges dropped {}% compared to the previous month. Keep it up!",
            utility.display_name().to_lowercase(),
            reduction_pct,
        );
        self.insert_unless_duplicate(user_id, utility, AlertKind::PositiveFeedback, message)
    }
}
