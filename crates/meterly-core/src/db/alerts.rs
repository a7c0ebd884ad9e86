//! Alert insertion, dedup lookup, and read-state operations

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use super::{format_datetime, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Alert, AlertKind, UtilityType};

const ALERT_COLUMNS: &str = "id, user_id, utility, kind, message, is_read, created_at";

fn map_alert(row: &Row<'_>) -> rusqlite::Result<Alert> {
    let utility: String = row.get(2)?;
    let kind: String = row.get(3)?;
    let created_at: String = row.get(6)?;

    Ok(Alert {
        id: row.get(0)?,
        user_id: row.get(1)?,
        utility: utility.parse().unwrap_or(UtilityType::Electricity),
        kind: kind.parse().unwrap_or(AlertKind::HighUsage),
        message: row.get(4)?,
        read: row.get(5)?,
        created_at: parse_datetime(&created_at),
    })
}

impl Database {
    /// Insert an alert (unread) and return its id.
    ///
    /// Dedup is the evaluator's responsibility via `find_recent_alerts`;
    /// the store itself accepts every insert.
    pub fn insert_alert(
        &self,
        user_id: i64,
        utility: UtilityType,
        kind: AlertKind,
        message: &str,
    ) -> Result<i64> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO alerts (user_id, utility, kind, message) VALUES (?, ?, ?, ?)",
            params![user_id, utility.as_str(), kind.as_str(), message],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Alerts of a given (utility, kind) for a user created at or after `since`.
    /// Read and unread alike; dedup looks at both.
    pub fn find_recent_alerts(
        &self,
        user_id: i64,
        utility: UtilityType,
        kind: AlertKind,
        since: DateTime<Utc>,
    ) -> Result<Vec<Alert>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM alerts
             WHERE user_id = ? AND utility = ? AND kind = ? AND created_at >= ?
             ORDER BY created_at DESC",
            ALERT_COLUMNS
        ))?;

        let alerts = stmt
            .query_map(
                params![
                    user_id,
                    utility.as_str(),
                    kind.as_str(),
                    format_datetime(since)
                ],
                map_alert,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(alerts)
    }

    /// All alerts for a user, most recent first
    pub fn list_alerts(&self, user_id: i64) -> Result<Vec<Alert>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM alerts WHERE user_id = ? ORDER BY created_at DESC",
            ALERT_COLUMNS
        ))?;

        let alerts = stmt
            .query_map(params![user_id], map_alert)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(alerts)
    }

    /// Unread alerts for a user, most recent first
    pub fn list_unread_alerts(&self, user_id: i64) -> Result<Vec<Alert>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM alerts
             WHERE user_id = ? AND is_read = FALSE ORDER BY created_at DESC",
            ALERT_COLUMNS
        ))?;

        let alerts = stmt
            .query_map(params![user_id], map_alert)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(alerts)
    }

    /// Alerts for (user, utility), most recent first
    pub fn list_alerts_by_utility(
        &self,
        user_id: i64,
        utility: UtilityType,
    ) -> Result<Vec<Alert>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM alerts
             WHERE user_id = ? AND utility = ? ORDER BY created_at DESC",
            ALERT_COLUMNS
        ))?;

        let alerts = stmt
            .query_map(params![user_id, utility.as_str()], map_alert)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(alerts)
    }

    /// Alerts of a given kind for a user, most recent first
    pub fn list_alerts_by_kind(&self, user_id: i64, kind: AlertKind) -> Result<Vec<Alert>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM alerts
             WHERE user_id = ? AND kind = ? ORDER BY created_at DESC",
            ALERT_COLUMNS
        ))?;

        let alerts = stmt
            .query_map(params![user_id, kind.as_str()], map_alert)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(alerts)
    }

    /// Mark one alert as read
    pub fn mark_alert_read(&self, alert_id: i64) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE alerts SET is_read = TRUE WHERE id = ?",
            params![alert_id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Alert {} not found", alert_id)));
        }
        Ok(())
    }

    /// Mark all of a user's alerts as read, returning how many changed
    pub fn mark_all_alerts_read(&self, user_id: i64) -> Result<usize> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE alerts SET is_read = TRUE WHERE user_id = ? AND is_read = FALSE",
            params![user_id],
        )?;
        Ok(updated)
    }
}
