//! Background task scheduler for automatic month-close processing
//!
//! Provides optional scheduled month-close functionality that can be enabled
//! via environment variables:
//!
//! - `METERLY_MONTH_CLOSE_SCHEDULE`: Check interval in hours (e.g., "12" for
//!   twice daily, "24" for daily)
//!
//! The scheduler wakes at the configured interval and, on the first day of a
//! month, runs the month-close rules for the month that just ended and
//! refreshes every user's recommendations.

use std::time::Duration;

use chrono::{Datelike, Months, NaiveDate, Utc};
use tokio::time::interval;
use tracing::{error, info, warn};

use meterly_core::AnalyticsEngine;

/// Configuration for scheduled month-close runs
#[derive(Debug, Clone)]
pub struct MonthCloseConfig {
    /// Interval between checks in hours
    pub interval_hours: u64,
}

impl MonthCloseConfig {
    /// Parse configuration from environment variables
    ///
    /// Returns None if scheduling is not configured (METERLY_MONTH_CLOSE_SCHEDULE not set)
    pub fn from_env() -> Option<Self> {
        let value = std::env::var("METERLY_MONTH_CLOSE_SCHEDULE").ok();
        Self::from_value(value.as_deref())
    }

    fn from_value(value: Option<&str>) -> Option<Self> {
        let interval_hours: u64 = value?.parse().ok()?;

        if interval_hours == 0 {
            warn!("METERLY_MONTH_CLOSE_SCHEDULE is 0, automatic month close disabled");
            return None;
        }

        Some(Self { interval_hours })
    }
}

/// Start the month-close scheduler as a background task
///
/// This function spawns a tokio task that runs indefinitely, checking at the
/// configured interval whether a month has ended that still needs processing.
pub fn start_month_close_scheduler(engine: AnalyticsEngine, config: MonthCloseConfig) {
    info!(
        "Starting month-close scheduler: checking every {} hours",
        config.interval_hours
    );

    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(config.interval_hours * 3600));
        let mut last_processed: Option<NaiveDate> = None;

        // Skip the first immediate tick - we don't want to process on startup
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let today = Utc::now().date_naive();
            if today.day() != 1 {
                continue;
            }

            let Some(billing_month) = today.checked_sub_months(Months::new(1)) else {
                continue;
            };
            if last_processed == Some(billing_month) {
                continue;
            }

            info!(month = %billing_month.format("%Y-%m"), "Running scheduled month close...");
            run_month_close(&engine, billing_month).await;
            last_processed = Some(billing_month);
        }
    });
}

/// Run the month-close rules and a recommendation refresh for every user.
///
/// Failures are per-user; one user's error never blocks the rest.
pub async fn run_month_close(engine: &AnalyticsEngine, billing_month: NaiveDate) {
    let user_ids = match engine.db().list_user_ids() {
        Ok(ids) => ids,
        Err(e) => {
            error!("Month close aborted, could not list users: {}", e);
            return;
        }
    };

    for user_id in user_ids {
        match engine.close_month(user_id, billing_month) {
            Ok(alert_ids) => {
                info!(
                    user_id,
                    alerts = alert_ids.len(),
                    "Month close completed"
                );
            }
            Err(e) => {
                error!(user_id, "Month close failed: {}", e);
                continue;
            }
        }

        if let Err(e) = engine.regenerate_recommendations(user_id).await {
            error!(user_id, "Recommendation refresh failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meterly_core::{Database, NewReading, UtilityType};
    use rust_decimal_macros::dec;

    #[test]
    fn test_config_unset_or_invalid_disables_scheduling() {
        assert!(MonthCloseConfig::from_value(None).is_none());
        assert!(MonthCloseConfig::from_value(Some("not a number")).is_none());
    }

    #[test]
    fn test_config_zero_disables_scheduling() {
        assert!(MonthCloseConfig::from_value(Some("0")).is_none());
    }

    #[test]
    fn test_config_interval_parsed() {
        let config = MonthCloseConfig::from_value(Some("12")).unwrap();
        assert_eq!(config.interval_hours, 12);
    }

    #[tokio::test]
    async fn test_run_month_close_processes_all_users() {
        let db = Database::in_memory().unwrap();
        let billing_month = Utc::now()
            .date_naive()
            .checked_sub_months(Months::new(1))
            .unwrap()
            .with_day(1)
            .unwrap();
        let measured_at = billing_month
            .and_hms_opt(12, 0, 0)
            .unwrap()
            .and_utc();

        for user_id in [1, 2] {
            db.upsert_budget(user_id, Some(dec!(1000.00)), Some(dec!(80)))
                .unwrap();
            db.insert_reading(
                user_id,
                &NewReading {
                    utility: UtilityType::Electricity,
                    amount: dec!(100.0),
                    unit: "kWh".to_string(),
                    charge: Some(dec!(500.00)),
                    measured_at,
                },
            )
            .unwrap();
        }

        let engine = AnalyticsEngine::new(db, None);
        run_month_close(&engine, billing_month).await;

        // 500 <= 0.9 * 1000, so the under-budget alert fires for both users
        for user_id in [1, 2] {
            let alerts = engine.db().list_alerts(user_id).unwrap();
            assert_eq!(alerts.len(), 1);
        }
    }
}
