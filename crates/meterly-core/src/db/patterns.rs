//! Usage pattern upsert and lookup

use chrono::Utc;
use rusqlite::{params, Row};

use super::{format_datetime, parse_datetime, parse_decimal, Database};
use crate::error::Result;
use crate::models::{Frequency, PatternStats, Trend, UsagePattern, UtilityType};

const PATTERN_COLUMNS: &str =
    "id, user_id, utility, frequency, average_usage, peak_usage, off_peak_usage, trend, updated_at";

fn map_pattern(row: &Row<'_>) -> rusqlite::Result<UsagePattern> {
    let utility: String = row.get(2)?;
    let frequency: String = row.get(3)?;
    let average: String = row.get(4)?;
    let peak: String = row.get(5)?;
    let off_peak: String = row.get(6)?;
    let trend: String = row.get(7)?;
    let updated_at: String = row.get(8)?;

    Ok(UsagePattern {
        id: row.get(0)?,
        user_id: row.get(1)?,
        utility: utility.parse().unwrap_or(UtilityType::Electricity),
        frequency: frequency.parse().unwrap_or(Frequency::Monthly),
        average_usage: parse_decimal(&average),
        peak_usage: parse_decimal(&peak),
        off_peak_usage: parse_decimal(&off_peak),
        trend: trend.parse().unwrap_or(Trend::Stable),
        updated_at: parse_datetime(&updated_at),
    })
}

impl Database {
    /// Insert or overwrite the pattern row for (user, utility, frequency).
    ///
    /// The UNIQUE constraint on the key makes this a single-statement upsert;
    /// last writer wins, which is fine since the computation is idempotent
    /// for a given window.
    pub fn upsert_pattern(
        &self,
        user_id: i64,
        utility: UtilityType,
        frequency: Frequency,
        stats: &PatternStats,
    ) -> Result<UsagePattern> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO usage_patterns
                (user_id, utility, frequency, average_usage, peak_usage, off_peak_usage, trend, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(user_id, utility, frequency) DO UPDATE SET
                average_usage = excluded.average_usage,
                peak_usage = excluded.peak_usage,
                off_peak_usage = excluded.off_peak_usage,
                trend = excluded.trend,
                updated_at = excluded.updated_at",
            params![
                user_id,
                utility.as_str(),
                frequency.as_str(),
                stats.average_usage.to_string(),
                stats.peak_usage.to_string(),
                stats.off_peak_usage.to_string(),
                stats.trend.as_str(),
                format_datetime(Utc::now()),
            ],
        )?;

        let pattern = conn.query_row(
            &format!(
                "SELECT {} FROM usage_patterns
                 WHERE user_id = ? AND utility = ? AND frequency = ?",
                PATTERN_COLUMNS
            ),
            params![user_id, utility.as_str(), frequency.as_str()],
            map_pattern,
        )?;

        Ok(pattern)
    }

    /// The pattern for (user, utility, frequency), if one has been computed
    pub fn find_pattern(
        &self,
        user_id: i64,
        utility: UtilityType,
        frequency: Frequency,
    ) -> Result<Option<UsagePattern>> {
        let conn = self.conn()?;
        let result = conn.query_row(
            &format!(
                "SELECT {} FROM usage_patterns
                 WHERE user_id = ? AND utility = ? AND frequency = ?",
                PATTERN_COLUMNS
            ),
            params![user_id, utility.as_str(), frequency.as_str()],
            map_pattern,
        );

        match result {
            Ok(pattern) => Ok(Some(pattern)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// All patterns for a user
    pub fn list_patterns(&self, user_id: i64) -> Result<Vec<UsagePattern>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM usage_patterns
             WHERE user_id = ? ORDER BY utility, frequency",
            PATTERN_COLUMNS
        ))?;

        let patterns = stmt
            .query_map(params![user_id], map_pattern)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(patterns)
    }

    /// All patterns for (user, utility)
    pub fn list_patterns_by_type(
        &self,
        user_id: i64,
        utility: UtilityType,
    ) -> Result<Vec<UsagePattern>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM usage_patterns
             WHERE user_id = ? AND utility = ? ORDER BY frequency",
            PATTERN_COLUMNS
        ))?;

        let patterns = stmt
            .query_map(params![user_id, utility.as_str()], map_pattern)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(patterns)
    }
}
