//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `readings` - Meter reading CRUD and window queries
//! - `patterns` - Usage pattern upsert and lookup
//! - `alerts` - Alert insertion, dedup lookup, read-state
//! - `recommendations` - Recommendation batch replace and apply-state
//! - `budgets` - Per-user budget settings
//! - `savings` - Savings tracking rows tied to recommendations

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rust_decimal::Decimal;
use tracing::info;

use crate::error::Result;

mod alerts;
mod budgets;
mod patterns;
mod readings;
mod recommendations;
mod savings;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Format a DateTime<Utc> the way SQLite's CURRENT_TIMESTAMP does,
/// so stored values stay lexically comparable
pub(crate) fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Parse a decimal stored as TEXT. Amounts are written by this crate, so a
/// parse failure means hand-edited data; fall back to zero rather than abort.
pub(crate) fn parse_decimal(s: &str) -> Decimal {
    s.parse().unwrap_or(Decimal::ZERO)
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
}

impl Database {
    /// Create a new database connection pool at the given path
    pub fn new(path: &str) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a throwaway database (for testing)
    ///
    /// Note: Uses a temporary file rather than `:memory:` because each
    /// pooled connection to `:memory:` would get its own empty database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = format!("/tmp/meterly_test_{}_{}.db", std::process::id(), id);

        // Remove any existing file
        let _ = std::fs::remove_file(&path);

        Self::new(&path)
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// All user ids that have ever submitted a reading.
    ///
    /// Used by the month-close scheduler; user management itself lives
    /// outside this service.
    pub fn list_user_ids(&self) -> Result<Vec<i64>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT DISTINCT user_id FROM readings ORDER BY user_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Enable foreign keys
            PRAGMA foreign_keys = ON;

            -- WAL mode: better concurrency, readers don't block writers
            PRAGMA journal_mode = WAL;

            -- Cache size: ~8MB (2000 pages * 4KB default page size)
            PRAGMA cache_size = 2000;

            -- Synchronous NORMAL: good balance of safety and performance
            PRAGMA synchronous = NORMAL;

            -- Meter readings (append-only; updates replace fields, keep identity)
            -- Decimal amounts are stored as TEXT to avoid float drift.
            CREATE TABLE IF NOT EXISTS readings (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                utility TEXT NOT NULL,             -- electricity, water, gas
                amount TEXT NOT NULL,              -- decimal, in `unit`
                unit TEXT NOT NULL,                -- kWh, m³
                charge TEXT,                       -- decimal, nullable
                measured_at DATETIME NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_readings_user_utility_measured
                ON readings(user_id, utility, measured_at);
            CREATE INDEX IF NOT EXISTS idx_readings_user_measured
                ON readings(user_id, measured_at);

            -- Usage patterns: at most one row per (user, utility, frequency)
            CREATE TABLE IF NOT EXISTS usage_patterns (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                utility TEXT NOT NULL,
                frequency TEXT NOT NULL,           -- daily, weekly, monthly, seasonal
                average_usage TEXT NOT NULL,
                peak_usage TEXT NOT NULL,
                off_peak_usage TEXT NOT NULL,
                trend TEXT NOT NULL,               -- increasing, decreasing, stable
                updated_at DATETIME NOT NULL,
                UNIQUE(user_id, utility, frequency)
            );

            CREATE INDEX IF NOT EXISTS idx_patterns_user ON usage_patterns(user_id);

            -- Alerts (threshold and feedback findings)
            CREATE TABLE IF NOT EXISTS alerts (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                utility TEXT NOT NULL,
                kind TEXT NOT NULL,                -- high_usage, budget_exceeded, ...
                message TEXT NOT NULL,
                is_read BOOLEAN DEFAULT FALSE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_alerts_dedup
                ON alerts(user_id, utility, kind, created_at);
            CREATE INDEX IF NOT EXISTS idx_alerts_user_read ON alerts(user_id, is_read);

            -- Savings recommendations
            CREATE TABLE IF NOT EXISTS recommendations (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                utility TEXT NOT NULL,
                kind TEXT NOT NULL,                -- usage_reduction, time_shift, ...
                text TEXT NOT NULL,
                expected_savings TEXT NOT NULL,
                difficulty TEXT NOT NULL,          -- easy, medium, hard
                applied BOOLEAN DEFAULT FALSE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_recommendations_user_applied
                ON recommendations(user_id, applied);

            -- Savings tracking (one row per started recommendation)
            CREATE TABLE IF NOT EXISTS savings_tracking (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                recommendation_id INTEGER NOT NULL,
                utility TEXT NOT NULL,
                tracking_month DATE NOT NULL,      -- first day of the month
                baseline_cost TEXT NOT NULL,       -- frozen at start
                actual_usage TEXT NOT NULL,
                actual_cost TEXT NOT NULL,
                savings_achieved TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_savings_user_month
                ON savings_tracking(user_id, tracking_month);

            -- Budget settings (1:1 per user, read-only to the analytics rules)
            CREATE TABLE IF NOT EXISTS budget_settings (
                user_id INTEGER PRIMARY KEY,
                monthly_budget TEXT,
                alert_threshold TEXT,
                updated_at DATETIME NOT NULL
            );
            "#,
        )?;

        info!("Database schema initialized");
        Ok(())
    }
}
