//! Recommendation batch replace and apply-state

use rusqlite::{params, Row};

use super::{parse_datetime, parse_decimal, Database};
use crate::error::{Error, Result};
use crate::models::{
    Difficulty, NewRecommendation, Recommendation, RecommendationKind, UtilityType,
};

const RECOMMENDATION_COLUMNS: &str =
    "id, user_id, utility, kind, text, expected_savings, difficulty, applied, created_at";

fn map_recommendation(row: &Row<'_>) -> rusqlite::Result<Recommendation> {
    let utility: String = row.get(2)?;
    let kind: String = row.get(3)?;
    let savings: String = row.get(5)?;
    let difficulty: String = row.get(6)?;
    let created_at: String = row.get(8)?;

    Ok(Recommendation {
        id: row.get(0)?,
        user_id: row.get(1)?,
        utility: utility.parse().unwrap_or(UtilityType::Electricity),
        kind: kind.parse().unwrap_or(RecommendationKind::UsageReduction),
        text: row.get(4)?,
        expected_savings: parse_decimal(&savings),
        difficulty: difficulty.parse().unwrap_or(Difficulty::Medium),
        applied: row.get(7)?,
        created_at: parse_datetime(&created_at),
    })
}

impl Database {
    /// Delete a user's unapplied recommendations, returning how many went.
    /// Applied ones are kept as a history of what the user acted on.
    pub fn delete_unapplied_recommendations(&self, user_id: i64) -> Result<usize> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM recommendations WHERE user_id = ? AND applied = FALSE",
            params![user_id],
        )?;
        Ok(deleted)
    }

    /// Insert a batch of recommendations for a user, in order, inside one
    /// transaction. Returns the stored rows.
    pub fn insert_recommendations(
        &self,
        user_id: i64,
        recommendations: &[NewRecommendation],
    ) -> Result<Vec<Recommendation>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let mut ids = Vec::with_capacity(recommendations.len());
        for rec in recommendations {
            tx.execute(
                "INSERT INTO recommendations
                    (user_id, utility, kind, text, expected_savings, difficulty)
                 VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    user_id,
                    rec.utility.as_str(),
                    rec.kind.as_str(),
                    rec.text,
                    rec.expected_savings.to_string(),
                    rec.difficulty.as_str(),
                ],
            )?;
            ids.push(tx.last_insert_rowid());
        }
        tx.commit()?;

        let conn = self.conn()?;
        let mut stored = Vec::with_capacity(ids.len());
        for id in ids {
            let rec = conn.query_row(
                &format!(
                    "SELECT {} FROM recommendations WHERE id = ?",
                    RECOMMENDATION_COLUMNS
                ),
                params![id],
                map_recommendation,
            )?;
            stored.push(rec);
        }

        Ok(stored)
    }

    /// All recommendations for a user, newest first
    pub fn list_recommendations(&self, user_id: i64) -> Result<Vec<Recommendation>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM recommendations
             WHERE user_id = ? ORDER BY created_at DESC, id DESC",
            RECOMMENDATION_COLUMNS
        ))?;

        let recs = stmt
            .query_map(params![user_id], map_recommendation)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(recs)
    }

    /// Unapplied recommendations for a user, in insertion order
    pub fn list_unapplied_recommendations(&self, user_id: i64) -> Result<Vec<Recommendation>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM recommendations
             WHERE user_id = ? AND applied = FALSE ORDER BY id",
            RECOMMENDATION_COLUMNS
        ))?;

        let recs = stmt
            .query_map(params![user_id], map_recommendation)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(recs)
    }

    /// Get a recommendation, scoped to the owning user
    pub fn find_recommendation(
        &self,
        user_id: i64,
        recommendation_id: i64,
    ) -> Result<Recommendation> {
        let conn = self.conn()?;
        conn.query_row(
            &format!(
                "SELECT {} FROM recommendations WHERE id = ? AND user_id = ?",
                RECOMMENDATION_COLUMNS
            ),
            params![recommendation_id, user_id],
            map_recommendation,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound(format!(
                "Recommendation {} not found for user {}",
                recommendation_id, user_id
            )),
            other => other.into(),
        })
    }

    /// Mark a recommendation as applied, scoped to the owning user
    pub fn mark_recommendation_applied(
        &self,
        user_id: i64,
        recommendation_id: i64,
    ) -> Result<Recommendation> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE recommendations SET applied = TRUE WHERE id = ? AND user_id = ?",
            params![recommendation_id, user_id],
        )?;

        if updated == 0 {
            return Err(Error::NotFound(format!(
                "Recommendation {} not found for user {}",
                recommendation_id, user_id
            )));
        }

        let rec = conn.query_row(
            &format!(
                "SELECT {} FROM recommendations WHERE id = ?",
                RECOMMENDATION_COLUMNS
            ),
            params![recommendation_id],
            map_recommendation,
        )?;

        Ok(rec)
    }
}
