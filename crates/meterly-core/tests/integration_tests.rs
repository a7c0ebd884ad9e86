//! End-to-end tests exercising the public library surface

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use meterly_core::{
    AlertKind, AnalyticsEngine, Database, Frequency, NewReading, RecommendationKind, Trend,
    UtilityType,
};

fn reading(
    utility: UtilityType,
    amount: Decimal,
    charge: Option<Decimal>,
    days_ago: i64,
) -> NewReading {
    NewReading {
        utility,
        amount,
        unit: utility.unit().to_string(),
        charge,
        measured_at: Utc::now() - Duration::days(days_ago),
    }
}

#[tokio::test]
async fn test_full_lifecycle() {
    let db = Database::in_memory().unwrap();
    let engine = AnalyticsEngine::new(db.clone(), None);

    // Two months of increasing electricity usage
    for days_ago in (1..=60).rev() {
        let amount = dec!(10) + Decimal::from(60 - days_ago) / dec!(4);
        engine
            .ingest_reading(1, &reading(UtilityType::Electricity, amount, Some(amount * dec!(3)), days_ago))
            .unwrap();
    }

    // Patterns exist for every window after analysis
    let patterns = engine.analyze_all_utilities(1).unwrap();
    assert_eq!(patterns.len(), 4);

    let monthly = db
        .find_pattern(1, UtilityType::Electricity, Frequency::Monthly)
        .unwrap()
        .unwrap();
    assert_eq!(monthly.trend, Trend::Increasing);
    assert!(monthly.off_peak_usage <= monthly.average_usage);
    assert!(monthly.average_usage <= monthly.peak_usage);

    // Recommendations from the rule engine (no advisor configured)
    let recs = engine.regenerate_recommendations(1).await.unwrap();
    assert!(recs
        .iter()
        .any(|r| r.kind == RecommendationKind::UsageReduction));
    assert!(recs
        .iter()
        .any(|r| r.kind == RecommendationKind::TariffOptimization));

    // Apply one, regenerate, applied survives
    db.mark_recommendation_applied(1, recs[0].id).unwrap();
    engine.regenerate_recommendations(1).await.unwrap();
    let survivors: Vec<_> = db
        .list_recommendations(1)
        .unwrap()
        .into_iter()
        .filter(|r| r.applied)
        .collect();
    assert_eq!(survivors.len(), 1);
    assert_eq!(survivors[0].id, recs[0].id);
}

#[test]
fn test_budget_alert_scenario() {
    let db = Database::in_memory().unwrap();
    db.upsert_budget(1, Some(dec!(100000)), Some(dec!(80))).unwrap();
    let engine = AnalyticsEngine::new(db.clone(), None);

    engine
        .ingest_reading(1, &reading(UtilityType::Electricity, dec!(300), Some(dec!(85000)), 0))
        .unwrap();

    let alerts = db.list_alerts_by_kind(1, AlertKind::BudgetExceeded).unwrap();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].message.contains("85.00%"));
    assert!(!alerts[0].read);
}

#[test]
fn test_budget_alert_dedup_within_window() {
    let db = Database::in_memory().unwrap();
    db.upsert_budget(1, Some(dec!(100000)), Some(dec!(80))).unwrap();
    let engine = AnalyticsEngine::new(db.clone(), None);

    // Two qualifying ingestions an hour apart: one alert
    engine
        .ingest_reading(1, &reading(UtilityType::Electricity, dec!(300), Some(dec!(85000)), 0))
        .unwrap();
    let mut second = reading(UtilityType::Electricity, dec!(10), Some(dec!(1000)), 0);
    second.measured_at = Utc::now() - Duration::hours(1);
    engine.ingest_reading(1, &second).unwrap();
    assert_eq!(
        db.list_alerts_by_kind(1, AlertKind::BudgetExceeded).unwrap().len(),
        1
    );

    // Simulate the first alert aging past 24h: the next ingestion alerts again
    {
        let conn = db.conn().unwrap();
        conn.execute(
            "UPDATE alerts SET created_at = datetime('now', '-25 hours')",
            [],
        )
        .unwrap();
    }
    engine
        .ingest_reading(1, &reading(UtilityType::Electricity, dec!(10), Some(dec!(1000)), 0))
        .unwrap();
    assert_eq!(
        db.list_alerts_by_kind(1, AlertKind::BudgetExceeded).unwrap().len(),
        2
    );
}

#[test]
fn test_high_usage_guarded_without_prior_month() {
    let db = Database::in_memory().unwrap();
    let engine = AnalyticsEngine::new(db.clone(), None);

    // All history is in the current month, so there is no baseline
    engine
        .ingest_reading(1, &reading(UtilityType::Gas, dec!(100000), None, 0))
        .unwrap();

    assert!(db.list_alerts_by_kind(1, AlertKind::HighUsage).unwrap().is_empty());
}

#[test]
fn test_alert_read_flow() {
    let db = Database::in_memory().unwrap();
    db.upsert_budget(1, Some(dec!(1000)), Some(dec!(50))).unwrap();
    let engine = AnalyticsEngine::new(db.clone(), None);

    engine
        .ingest_reading(1, &reading(UtilityType::Water, dec!(10), Some(dec!(600)), 0))
        .unwrap();

    let unread = db.list_unread_alerts(1).unwrap();
    assert_eq!(unread.len(), 1);

    db.mark_alert_read(unread[0].id).unwrap();
    assert!(db.list_unread_alerts(1).unwrap().is_empty());
    assert_eq!(db.list_alerts(1).unwrap().len(), 1);
}

#[test]
fn test_analysis_isolated_per_user() {
    let db = Database::in_memory().unwrap();
    let engine = AnalyticsEngine::new(db.clone(), None);

    engine
        .ingest_reading(1, &reading(UtilityType::Electricity, dec!(10), None, 1))
        .unwrap();
    engine
        .ingest_reading(2, &reading(UtilityType::Electricity, dec!(99), None, 1))
        .unwrap();

    let p1 = engine
        .analyze_utility(1, UtilityType::Electricity, Frequency::Daily)
        .unwrap()
        .unwrap();
    let p2 = engine
        .analyze_utility(2, UtilityType::Electricity, Frequency::Daily)
        .unwrap()
        .unwrap();

    assert_eq!(p1.average_usage, dec!(10.00));
    assert_eq!(p2.average_usage, dec!(99.00));
}
