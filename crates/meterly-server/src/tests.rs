//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{Datelike, Months, Utc};
use http_body_util::BodyExt;
use meterly_core::{
    AnalyticsEngine, Database, Difficulty, NewReading, NewRecommendation, RecommendationKind,
    UtilityType,
};
use rust_decimal_macros::dec;
use tower::ServiceExt;

fn setup_test_app() -> Router {
    let db = Database::in_memory().unwrap();
    create_router_with_engine(AnalyticsEngine::new(db, None), ServerConfig::default())
}

fn setup_test_app_with_db() -> (Router, Database) {
    let db = Database::in_memory().unwrap();
    let app = create_router_with_engine(
        AnalyticsEngine::new(db.clone(), None),
        ServerConfig::default(),
    );
    (app, db)
}

async fn get_body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn empty_post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

// ========== Health ==========

#[tokio::test]
async fn test_health() {
    let app = setup_test_app();

    let response = app.oneshot(get_request("/api/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["status"], "ok");
}

// ========== Readings ==========

#[tokio::test]
async fn test_ingest_reading() {
    let app = setup_test_app();

    let body = serde_json::json!({
        "utility": "electricity",
        "amount": 42.5,
        "charge": 120.00
    });

    let response = app
        .oneshot(json_request("POST", "/api/users/1/readings", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);

    let json = get_body_json(response).await;
    assert_eq!(json["utility"], "electricity");
    assert_eq!(json["unit"], "kWh");
    assert_eq!(json["user_id"], 1);
}

#[tokio::test]
async fn test_ingest_reading_rejects_negative_amount() {
    let app = setup_test_app();

    let body = serde_json::json!({
        "utility": "water",
        "amount": -3.0
    });

    let response = app
        .oneshot(json_request("POST", "/api/users/1/readings", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_readings_filtered_by_utility() {
    let (app, _db) = setup_test_app_with_db();

    for (utility, amount) in [("electricity", 10.0), ("water", 3.0), ("electricity", 12.0)] {
        let body = serde_json::json!({ "utility": utility, "amount": amount });
        let response = app
            .clone()
            .oneshot(json_request("POST", "/api/users/1/readings", &body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .clone()
        .oneshot(get_request("/api/users/1/readings?utility=electricity"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 2);

    let response = app
        .oneshot(get_request("/api/users/1/readings"))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_list_readings_date_range() {
    let app = setup_test_app();

    let body = serde_json::json!({
        "utility": "gas",
        "amount": 4.0,
        "measured_at": "2026-03-10T08:00:00Z"
    });
    app.clone()
        .oneshot(json_request("POST", "/api/users/1/readings", &body))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(get_request(
            "/api/users/1/readings?from=2026-03-01T00:00:00Z&to=2026-04-01T00:00:00Z",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);

    // A lone bound is rejected
    let response = app
        .oneshot(get_request("/api/users/1/readings?from=2026-03-01T00:00:00Z"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_latest_reading_not_found() {
    let app = setup_test_app();

    let response = app
        .oneshot(get_request("/api/users/1/readings/latest?utility=gas"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_reading_wrong_user() {
    let app = setup_test_app();

    let body = serde_json::json!({ "utility": "electricity", "amount": 5.0 });
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/users/1/readings", &body))
        .await
        .unwrap();
    let created = get_body_json(response).await;
    let id = created["id"].as_i64().unwrap();

    let update = serde_json::json!({ "utility": "electricity", "amount": 6.0 });
    let response = app
        .oneshot(json_request(
            "PUT",
            &format!("/api/users/2/readings/{}", id),
            &update,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ========== Budget ==========

#[tokio::test]
async fn test_budget_upsert_and_get() {
    let app = setup_test_app();

    let response = app
        .clone()
        .oneshot(get_request("/api/users/1/budget"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = serde_json::json!({ "monthly_budget": "1500.00", "alert_threshold": "80" });
    let response = app
        .clone()
        .oneshot(json_request("PUT", "/api/users/1/budget", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get_request("/api/users/1/budget"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["monthly_budget"], "1500.00");
    assert_eq!(json["alert_threshold"], "80");
}

#[tokio::test]
async fn test_budget_rejects_invalid_threshold() {
    let app = setup_test_app();

    let body = serde_json::json!({ "monthly_budget": 1000, "alert_threshold": 150 });
    let response = app
        .oneshot(json_request("PUT", "/api/users/1/budget", &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Alerts ==========

#[tokio::test]
async fn test_reading_triggers_budget_alert() {
    let app = setup_test_app();

    let budget = serde_json::json!({ "monthly_budget": 1000.00, "alert_threshold": 80 });
    let response = app
        .clone()
        .oneshot(json_request("PUT", "/api/users/1/budget", &budget))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // 850 of 1000 is 85%, over the 80% threshold
    let reading = serde_json::json!({
        "utility": "electricity",
        "amount": 200.0,
        "charge": 850.00
    });
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/users/1/readings", &reading))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .oneshot(get_request("/api/users/1/alerts?unread_only=true"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let alerts = json.as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["kind"], "budget_exceeded");
}

#[tokio::test]
async fn test_alert_read_flow() {
    let app = setup_test_app();

    let budget = serde_json::json!({ "monthly_budget": 100.00, "alert_threshold": 50 });
    app.clone()
        .oneshot(json_request("PUT", "/api/users/1/budget", &budget))
        .await
        .unwrap();
    let reading = serde_json::json!({ "utility": "gas", "amount": 5.0, "charge": 90.00 });
    app.clone()
        .oneshot(json_request("POST", "/api/users/1/readings", &reading))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(get_request("/api/users/1/alerts"))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    let alert_id = json.as_array().unwrap()[0]["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(empty_post(&format!("/api/users/1/alerts/{}/read", alert_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get_request("/api/users/1/alerts?unread_only=true"))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert!(json.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_mark_all_alerts_read() {
    let app = setup_test_app();

    let budget = serde_json::json!({ "monthly_budget": 100.00, "alert_threshold": 50 });
    app.clone()
        .oneshot(json_request("PUT", "/api/users/1/budget", &budget))
        .await
        .unwrap();
    // Two utilities, so two dedup keys and two alerts
    for utility in ["electricity", "water"] {
        let reading = serde_json::json!({ "utility": utility, "amount": 5.0, "charge": 60.00 });
        app.clone()
            .oneshot(json_request("POST", "/api/users/1/readings", &reading))
            .await
            .unwrap();
    }

    let response = app
        .clone()
        .oneshot(empty_post("/api/users/1/alerts/read-all"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["updated"], 2);
}

// ========== Patterns ==========

#[tokio::test]
async fn test_analyze_patterns_requires_both_params() {
    let app = setup_test_app();

    let response = app
        .oneshot(empty_post(
            "/api/users/1/patterns/analyze?utility=electricity",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_analyze_patterns_no_data() {
    let app = setup_test_app();

    let response = app
        .oneshot(empty_post(
            "/api/users/1/patterns/analyze?utility=electricity&frequency=daily",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_analyze_and_list_patterns() {
    let app = setup_test_app();

    for amount in [10.0, 12.0, 11.0] {
        let reading = serde_json::json!({ "utility": "water", "amount": amount });
        app.clone()
            .oneshot(json_request("POST", "/api/users/1/readings", &reading))
            .await
            .unwrap();
    }

    let response = app
        .clone()
        .oneshot(empty_post(
            "/api/users/1/patterns/analyze?utility=water&frequency=daily",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    let average: f64 = json[0]["average_usage"].as_str().unwrap().parse().unwrap();
    assert!((average - 11.0).abs() < 1e-9);

    let response = app
        .oneshot(get_request("/api/users/1/patterns?utility=water"))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
}

// ========== Recommendations ==========

#[tokio::test]
async fn test_regenerate_and_apply_recommendation() {
    let db = Database::in_memory().unwrap();
    let engine = AnalyticsEngine::new(db, Some(meterly_core::AdvisorClient::mock()));
    let app = create_router_with_engine(engine, ServerConfig::default());

    for amount in [300.0, 320.0] {
        let reading = serde_json::json!({ "utility": "electricity", "amount": amount });
        app.clone()
            .oneshot(json_request("POST", "/api/users/1/readings", &reading))
            .await
            .unwrap();
    }
    // Regeneration keys off the monthly pattern
    app.clone()
        .oneshot(empty_post(
            "/api/users/1/patterns/analyze?utility=electricity&frequency=monthly",
        ))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(empty_post("/api/users/1/recommendations/regenerate"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let recs = json.as_array().unwrap();
    assert_eq!(recs.len(), 2); // mock advisor returns two canned items
    let rec_id = recs[0]["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(empty_post(&format!(
            "/api/users/1/recommendations/{}/apply",
            rec_id
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["applied"], true);

    let response = app
        .oneshot(get_request(
            "/api/users/1/recommendations?unapplied_only=true",
        ))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_apply_recommendation_wrong_user() {
    let app = setup_test_app();

    let response = app
        .oneshot(empty_post("/api/users/1/recommendations/99/apply"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ========== Savings ==========

fn insert_charged_reading(db: &Database, month: chrono::NaiveDate, charge: rust_decimal::Decimal) {
    db.insert_reading(
        1,
        &NewReading {
            utility: UtilityType::Electricity,
            amount: dec!(400),
            unit: "kWh".to_string(),
            charge: Some(charge),
            measured_at: month
                .with_day(15)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap()
                .and_utc(),
        },
    )
    .unwrap();
}

#[tokio::test]
async fn test_savings_tracking_flow() {
    let (app, db) = setup_test_app_with_db();

    let recs = db
        .insert_recommendations(
            1,
            &[NewRecommendation {
                utility: UtilityType::Electricity,
                kind: RecommendationKind::UsageReduction,
                text: "Reduce usage".to_string(),
                expected_savings: dec!(20.00),
                difficulty: Difficulty::Medium,
            }],
        )
        .unwrap();
    let rec_id = recs[0].id;

    let this_month = Utc::now().date_naive().with_day(1).unwrap();
    let prior_month = this_month.checked_sub_months(Months::new(1)).unwrap();
    insert_charged_reading(&db, prior_month, dec!(130.00));

    let body = serde_json::json!({ "recommendation_id": rec_id });
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/users/1/savings", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = get_body_json(response).await;
    assert_eq!(json["baseline_cost"], "130.00");
    assert_eq!(json["savings_achieved"], "0");
    let tracking_id = json["id"].as_i64().unwrap();

    // This month costs less than the baseline
    insert_charged_reading(&db, this_month, dec!(90.00));

    let response = app
        .clone()
        .oneshot(empty_post(&format!(
            "/api/users/1/savings/{}/refresh",
            tracking_id
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["actual_cost"], "90.00");
    assert_eq!(json["savings_achieved"], "40.00");

    let response = app
        .clone()
        .oneshot(get_request("/api/users/1/savings"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);

    let response = app
        .oneshot(get_request("/api/users/1/savings/total"))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["total_savings"], "40.00");
}

#[tokio::test]
async fn test_start_savings_tracking_unknown_recommendation() {
    let app = setup_test_app();

    let body = serde_json::json!({ "recommendation_id": 99 });
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/users/1/savings", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(empty_post("/api/users/1/savings/99/refresh"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_savings_rejects_lone_bound() {
    let app = setup_test_app();

    let response = app
        .oneshot(get_request("/api/users/1/savings?from=2026-01-01"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
