//! Per-user budget settings

use chrono::Utc;
use rusqlite::{params, Row};
use rust_decimal::Decimal;

use super::{format_datetime, parse_datetime, parse_decimal, Database};
use crate::error::Result;
use crate::models::BudgetSetting;

fn map_budget(row: &Row<'_>) -> rusqlite::Result<BudgetSetting> {
    let monthly_budget: Option<String> = row.get(1)?;
    let alert_threshold: Option<String> = row.get(2)?;
    let updated_at: String = row.get(3)?;

    Ok(BudgetSetting {
        user_id: row.get(0)?,
        monthly_budget: monthly_budget.map(|b| parse_decimal(&b)),
        alert_threshold: alert_threshold.map(|t| parse_decimal(&t)),
        updated_at: parse_datetime(&updated_at),
    })
}

impl Database {
    /// Create or replace a user's budget settings
    pub fn upsert_budget(
        &self,
        user_id: i64,
        monthly_budget: Option<Decimal>,
        alert_threshold: Option<Decimal>,
    ) -> Result<BudgetSetting> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO budget_settings (user_id, monthly_budget, alert_threshold, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET
                monthly_budget = excluded.monthly_budget,
                alert_threshold = excluded.alert_threshold,
                updated_at = excluded.updated_at",
            params![
                user_id,
                monthly_budget.map(|b| b.to_string()),
                alert_threshold.map(|t| t.to_string()),
                format_datetime(Utc::now()),
            ],
        )?;

        let budget = conn.query_row(
            "SELECT user_id, monthly_budget, alert_threshold, updated_at
             FROM budget_settings WHERE user_id = ?",
            params![user_id],
            map_budget,
        )?;

        Ok(budget)
    }

    /// A user's budget settings, if configured
    pub fn find_budget(&self, user_id: i64) -> Result<Option<BudgetSetting>> {
        let conn = self.conn()?;
        let result = conn.query_row(
            "SELECT user_id, monthly_budget, alert_threshold, updated_at
             FROM budget_settings WHERE user_id = ?",
            params![user_id],
            map_budget,
        );

        match result {
            Ok(budget) => Ok(Some(budget)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
