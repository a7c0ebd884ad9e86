//! Savings tracking rows tied to recommendations

use chrono::NaiveDate;
use rusqlite::{params, Row};
use rust_decimal::Decimal;

use super::{parse_datetime, parse_decimal, Database};
use crate::error::{Error, Result};
use crate::models::{SavingsProgress, SavingsTracking, UtilityType};

const TRACKING_COLUMNS: &str = "id, user_id, recommendation_id, utility, tracking_month, \
     baseline_cost, actual_usage, actual_cost, savings_achieved, created_at";

fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_default()
}

fn map_tracking(row: &Row<'_>) -> rusqlite::Result<SavingsTracking> {
    let utility: String = row.get(3)?;
    let tracking_month: String = row.get(4)?;
    let baseline_cost: String = row.get(5)?;
    let actual_usage: String = row.get(6)?;
    let actual_cost: String = row.get(7)?;
    let savings_achieved: String = row.get(8)?;
    let created_at: String = row.get(9)?;

    Ok(SavingsTracking {
        id: row.get(0)?,
        user_id: row.get(1)?,
        recommendation_id: row.get(2)?,
        utility: utility.parse().unwrap_or(UtilityType::Electricity),
        tracking_month: parse_date(&tracking_month),
        baseline_cost: parse_decimal(&baseline_cost),
        actual_usage: parse_decimal(&actual_usage),
        actual_cost: parse_decimal(&actual_cost),
        savings_achieved: parse_decimal(&savings_achieved),
        created_at: parse_datetime(&created_at),
    })
}

impl Database {
    /// Insert a new tracking row with zeroed actuals and return it
    pub fn insert_tracking(
        &self,
        user_id: i64,
        recommendation_id: i64,
        utility: UtilityType,
        tracking_month: NaiveDate,
        baseline_cost: Decimal,
    ) -> Result<SavingsTracking> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO savings_tracking
                (user_id, recommendation_id, utility, tracking_month,
                 baseline_cost, actual_usage, actual_cost, savings_achieved)
             VALUES (?, ?, ?, ?, ?, '0', '0', '0')",
            params![
                user_id,
                recommendation_id,
                utility.as_str(),
                tracking_month.format("%Y-%m-%d").to_string(),
                baseline_cost.to_string(),
            ],
        )?;

        let id = conn.last_insert_rowid();
        conn.query_row(
            &format!("SELECT {} FROM savings_tracking WHERE id = ?", TRACKING_COLUMNS),
            params![id],
            map_tracking,
        )
        .map_err(Into::into)
    }

    /// Get a tracking row, scoped to the owning user
    pub fn get_tracking(&self, user_id: i64, tracking_id: i64) -> Result<SavingsTracking> {
        let conn = self.conn()?;
        conn.query_row(
            &format!(
                "SELECT {} FROM savings_tracking WHERE id = ? AND user_id = ?",
                TRACKING_COLUMNS
            ),
            params![tracking_id, user_id],
            map_tracking,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound(format!(
                "Savings tracking {} not found for user {}",
                tracking_id, user_id
            )),
            other => other.into(),
        })
    }

    /// All tracking rows for a user, newest month first
    pub fn list_trackings(&self, user_id: i64) -> Result<Vec<SavingsTracking>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM savings_tracking
             WHERE user_id = ? ORDER BY tracking_month DESC, id DESC",
            TRACKING_COLUMNS
        ))?;

        let trackings = stmt
            .query_map(params![user_id], map_tracking)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(trackings)
    }

    /// Tracking rows whose month falls in [from, to], both inclusive,
    /// chronologically sorted
    pub fn list_trackings_between(
        &self,
        user_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<SavingsTracking>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM savings_tracking
             WHERE user_id = ? AND tracking_month >= ? AND tracking_month <= ?
             ORDER BY tracking_month, id",
            TRACKING_COLUMNS
        ))?;

        let trackings = stmt
            .query_map(
                params![
                    user_id,
                    from.format("%Y-%m-%d").to_string(),
                    to.format("%Y-%m-%d").to_string(),
                ],
                map_tracking,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(trackings)
    }

    /// Write computed progress onto a tracking row, scoped to the owning user
    pub fn update_tracking_progress(
        &self,
        user_id: i64,
        tracking_id: i64,
        progress: &SavingsProgress,
    ) -> Result<SavingsTracking> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE savings_tracking
             SET actual_usage = ?, actual_cost = ?, savings_achieved = ?
             WHERE id = ? AND user_id = ?",
            params![
                progress.actual_usage.to_string(),
                progress.actual_cost.to_string(),
                progress.savings_achieved.to_string(),
                tracking_id,
                user_id,
            ],
        )?;

        if updated == 0 {
            return Err(Error::NotFound(format!(
                "Savings tracking {} not found for user {}",
                tracking_id, user_id
            )));
        }

        self.get_tracking(user_id, tracking_id)
    }
}
