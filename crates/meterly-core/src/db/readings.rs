//! Meter reading CRUD and window queries

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use super::{format_datetime, parse_datetime, parse_decimal, Database};
use crate::error::{Error, Result};
use crate::models::{NewReading, Reading, UtilityType};

const READING_COLUMNS: &str = "id, user_id, utility, amount, unit, charge, measured_at, created_at";

fn map_reading(row: &Row<'_>) -> rusqlite::Result<Reading> {
    let utility: String = row.get(2)?;
    let amount: String = row.get(3)?;
    let charge: Option<String> = row.get(5)?;
    let measured_at: String = row.get(6)?;
    let created_at: String = row.get(7)?;

    Ok(Reading {
        id: row.get(0)?,
        user_id: row.get(1)?,
        utility: utility.parse().unwrap_or(UtilityType::Electricity),
        amount: parse_decimal(&amount),
        unit: row.get(4)?,
        charge: charge.map(|c| parse_decimal(&c)),
        measured_at: parse_datetime(&measured_at),
        created_at: parse_datetime(&created_at),
    })
}

impl Database {
    /// Insert a new reading and return the stored row
    pub fn insert_reading(&self, user_id: i64, reading: &NewReading) -> Result<Reading> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO readings (user_id, utility, amount, unit, charge, measured_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                user_id,
                reading.utility.as_str(),
                reading.amount.to_string(),
                reading.unit,
                reading.charge.map(|c| c.to_string()),
                format_datetime(reading.measured_at),
            ],
        )?;

        self.get_reading(conn.last_insert_rowid())
    }

    /// Get a single reading by id
    pub fn get_reading(&self, id: i64) -> Result<Reading> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {} FROM readings WHERE id = ?", READING_COLUMNS),
            params![id],
            map_reading,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                Error::NotFound(format!("Reading {} not found", id))
            }
            other => other.into(),
        })
    }

    /// Replace all fields of an existing reading, keeping its identity.
    /// Fails with NotFound when the reading does not belong to the user.
    pub fn update_reading(
        &self,
        user_id: i64,
        reading_id: i64,
        reading: &NewReading,
    ) -> Result<Reading> {
        let conn = self.conn()?;

        let updated = conn.execute(
            "UPDATE readings
             SET utility = ?, amount = ?, unit = ?, charge = ?, measured_at = ?
             WHERE id = ? AND user_id = ?",
            params![
                reading.utility.as_str(),
                reading.amount.to_string(),
                reading.unit,
                reading.charge.map(|c| c.to_string()),
                format_datetime(reading.measured_at),
                reading_id,
                user_id,
            ],
        )?;

        if updated == 0 {
            return Err(Error::NotFound(format!(
                "Reading {} not found for user {}",
                reading_id, user_id
            )));
        }

        self.get_reading(reading_id)
    }

    /// Readings for (user, utility) strictly inside (after, before),
    /// chronologically sorted. Both bounds are exclusive; this is the
    /// analysis-window query.
    pub fn find_readings(
        &self,
        user_id: i64,
        utility: UtilityType,
        after: DateTime<Utc>,
        before: DateTime<Utc>,
    ) -> Result<Vec<Reading>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM readings
             WHERE user_id = ? AND utility = ? AND measured_at > ? AND measured_at < ?
             ORDER BY measured_at",
            READING_COLUMNS
        ))?;

        let readings = stmt
            .query_map(
                params![
                    user_id,
                    utility.as_str(),
                    format_datetime(after),
                    format_datetime(before)
                ],
                map_reading,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(readings)
    }

    /// Readings for (user, utility) in the half-open range [start, end),
    /// chronologically sorted. Used for calendar-month and daily sums.
    pub fn find_readings_between(
        &self,
        user_id: i64,
        utility: UtilityType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Reading>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM readings
             WHERE user_id = ? AND utility = ? AND measured_at >= ? AND measured_at < ?
             ORDER BY measured_at",
            READING_COLUMNS
        ))?;

        let readings = stmt
            .query_map(
                params![
                    user_id,
                    utility.as_str(),
                    format_datetime(start),
                    format_datetime(end)
                ],
                map_reading,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(readings)
    }

    /// Readings for a user across all utilities in [start, end)
    pub fn find_readings_by_user(
        &self,
        user_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Reading>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM readings
             WHERE user_id = ? AND measured_at >= ? AND measured_at < ?
             ORDER BY measured_at",
            READING_COLUMNS
        ))?;

        let readings = stmt
            .query_map(
                params![user_id, format_datetime(start), format_datetime(end)],
                map_reading,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(readings)
    }

    /// All readings for a user, most recent first
    pub fn list_readings(&self, user_id: i64) -> Result<Vec<Reading>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM readings WHERE user_id = ? ORDER BY measured_at DESC",
            READING_COLUMNS
        ))?;

        let readings = stmt
            .query_map(params![user_id], map_reading)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(readings)
    }

    /// All readings for (user, utility), most recent first
    pub fn list_readings_by_type(
        &self,
        user_id: i64,
        utility: UtilityType,
    ) -> Result<Vec<Reading>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM readings
             WHERE user_id = ? AND utility = ? ORDER BY measured_at DESC",
            READING_COLUMNS
        ))?;

        let readings = stmt
            .query_map(params![user_id, utility.as_str()], map_reading)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(readings)
    }

    /// Most recent reading for (user, utility), if any
    pub fn latest_reading(
        &self,
        user_id: i64,
        utility: UtilityType,
    ) -> Result<Option<Reading>> {
        let conn = self.conn()?;
        let result = conn.query_row(
            &format!(
                "SELECT {} FROM readings
                 WHERE user_id = ? AND utility = ?
                 ORDER BY measured_at DESC LIMIT 1",
                READING_COLUMNS
            ),
            params![user_id, utility.as_str()],
            map_reading,
        );

        match result {
            Ok(reading) => Ok(Some(reading)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
