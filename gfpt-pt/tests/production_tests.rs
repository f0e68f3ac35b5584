//! Integration tests for daily entry and hourly updates
//!
//! Tests cover:
//! - One live record per operator per day, one per machine for operators
//! - Validation and not-found cases of daily entry
//! - Hourly merge semantics and defect catalog checks
//! - Operator score ratchet and its history log

mod common;

use axum::http::StatusCode;
use common::{entry, error_code, setup_app, DAY};
use serde_json::json;

// =============================================================================
// Daily entry
// =============================================================================

#[tokio::test]
async fn test_create_entry() {
    let app = setup_app().await;
    app.seed_operator("OP-001", "operator").await;

    let (status, body) = app
        .post("/daily-production", entry("OP-001", "L1", Some("M-100"), "operator"))
        .await;

    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["success"], true);
    let record = &body["data"];
    assert_eq!(record["date"], DAY);
    assert_eq!(record["operator"]["externalId"], "OP-001");
    assert_eq!(record["workAs"], "operator");
    assert_eq!(record["rowNo"], 1);
    assert_eq!(record["previousLineWorkingTime"], 0);
    assert_eq!(record["hourlyProduction"], json!([]));
    assert_eq!(record["state"]["status"], "live");

    let id = record["id"].as_str().unwrap();
    let (status, body) = app.get(&format!("/daily-production/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["machineId"], "M-100");
}

#[tokio::test]
async fn test_second_entry_for_operator_rejected() {
    let app = setup_app().await;
    app.seed_operator("OP-001", "operator").await;
    app.create_entry(entry("OP-001", "L1", Some("M-100"), "operator")).await;

    let (status, body) = app
        .post("/daily-production", entry("OP-001", "L2", Some("M-200"), "operator"))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "CONFLICT");
    assert!(body["error"]["message"].as_str().unwrap().contains("Operator 'OP-001'"));

    let (_, body) = app.get(&format!("/daily-production?date={}", DAY)).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_machine_claimed_once_per_day() {
    let app = setup_app().await;
    app.seed_operator("OP-001", "operator").await;
    app.seed_operator("OP-002", "operator").await;
    app.seed_operator("OP-003", "helper").await;
    app.create_entry(entry("OP-001", "L1", Some("M-100"), "operator")).await;

    let (status, body) = app
        .post("/daily-production", entry("OP-002", "L1", Some("M-100"), "operator"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"].as_str().unwrap().contains("Machine 'M-100'"));

    // Helpers may stand at a machine already in use
    let (status, body) = app
        .post("/daily-production", entry("OP-003", "L1", Some("M-100"), "helper"))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
}

#[tokio::test]
async fn test_same_machine_allowed_on_another_day() {
    let app = setup_app().await;
    app.seed_operator("OP-001", "operator").await;
    app.create_entry(entry("OP-001", "L1", Some("M-100"), "operator")).await;

    let mut next_day = entry("OP-001", "L1", Some("M-100"), "operator");
    next_day["date"] = json!("2024-05-02");

    let (status, _) = app.post("/daily-production", next_day).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_unknown_operator_not_found() {
    let app = setup_app().await;

    let (status, body) = app
        .post("/daily-production", entry("OP-404", "L1", Some("M-100"), "operator"))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "NOT_FOUND");
}

#[tokio::test]
async fn test_entry_validation() {
    let app = setup_app().await;
    app.seed_operator("OP-001", "operator").await;

    let mut no_buyer = entry("OP-001", "L1", Some("M-100"), "operator");
    no_buyer["buyerId"] = json!(null);
    let (status, body) = app.post("/daily-production", no_buyer).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"].as_str().unwrap().contains("buyerId"));

    let mut bad_date = entry("OP-001", "L1", Some("M-100"), "operator");
    bad_date["date"] = json!("01/05/2024");
    let (status, _) = app.post("/daily-production", bad_date).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut negative = entry("OP-001", "L1", Some("M-100"), "operator");
    negative["target"] = json!(-10);
    let (status, _) = app.post("/daily-production", negative).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_row_numbers_per_line() {
    let app = setup_app().await;
    for op in ["OP-001", "OP-002", "OP-003"] {
        app.seed_operator(op, "operator").await;
    }

    app.create_entry(entry("OP-001", "L1", Some("M-1"), "operator")).await;
    app.create_entry(entry("OP-002", "L1", Some("M-2"), "operator")).await;
    app.create_entry(entry("OP-003", "L2", Some("M-3"), "operator")).await;

    let (_, body) = app
        .get(&format!("/daily-production?date={}&line=L1", DAY))
        .await;
    let rows: Vec<i64> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["rowNo"].as_i64().unwrap())
        .collect();
    assert_eq!(rows, vec![1, 2]);

    let (_, body) = app
        .get(&format!("/daily-production?date={}&line=L2", DAY))
        .await;
    assert_eq!(body["data"][0]["rowNo"], 1);
}

#[tokio::test]
async fn test_last_scan_update() {
    let app = setup_app().await;
    app.seed_operator("OP-001", "operator").await;

    let handle = gfpt_pt::services::spawn_last_scan_update(
        app.db.clone(),
        "OP-001".to_string(),
        Some("sewing-collar".to_string()),
        Some("M-100".to_string()),
    );
    handle.await.unwrap();

    let (_, body) = app.get("/operators/OP-001").await;
    assert_eq!(body["data"]["lastScan"]["machineId"], "M-100");
    assert_eq!(body["data"]["lastScan"]["process"], "sewing-collar");
}

// =============================================================================
// Hourly update
// =============================================================================

#[tokio::test]
async fn test_hours_append_and_overwrite() {
    let app = setup_app().await;
    app.seed_operator("OP-001", "operator").await;
    app.seed_defect("D1", "Broken stitch", "major").await;
    let id = app.create_entry(entry("OP-001", "L1", Some("M-100"), "operator")).await;

    let (status, body) = app
        .record_hours(
            &id,
            json!([
                { "hour": "08-09", "productionCount": 50, "defects": [{ "defectCode": "D1", "count": 2 }] },
                { "hour": "09-10", "productionCount": 60 }
            ]),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let (status, body) = app
        .record_hours(
            &id,
            json!([
                { "hour": "08-09", "productionCount": 52, "defects": [] },
                { "hour": "10-11", "productionCount": 55 }
            ]),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let hours = body["data"]["hourlyProduction"].as_array().unwrap();
    let labels: Vec<&str> = hours.iter().map(|h| h["hour"].as_str().unwrap()).collect();
    assert_eq!(labels, vec!["08-09", "09-10", "10-11"]);
    assert_eq!(hours[0]["productionCount"], 52);
    assert_eq!(hours[0]["defects"], json!([]));
    assert_eq!(hours[1]["productionCount"], 60);
}

#[tokio::test]
async fn test_hour_rejects_inactive_or_unknown_defect() {
    let app = setup_app().await;
    app.seed_operator("OP-001", "operator").await;
    app.seed_defect("D1", "Broken stitch", "major").await;
    app.put("/defects/D1/active", json!({ "active": false })).await;
    let id = app.create_entry(entry("OP-001", "L1", Some("M-100"), "operator")).await;

    let (status, body) = app
        .record_hours(
            &id,
            json!([{ "hour": "08-09", "productionCount": 50, "defects": [{ "defectCode": "D1", "count": 1 }] }]),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"].as_str().unwrap().contains("inactive"));

    let (status, _) = app
        .record_hours(
            &id,
            json!([{ "hour": "08-09", "productionCount": 50, "defects": [{ "defectCode": "ZZ", "count": 1 }] }]),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Nothing from the rejected batches was written
    let (_, body) = app.get(&format!("/daily-production/{}", id)).await;
    assert_eq!(body["data"]["hourlyProduction"], json!([]));
}

#[tokio::test]
async fn test_defect_codes_shared_across_hours() {
    let app = setup_app().await;
    app.seed_operator("OP-001", "operator").await;
    app.seed_defect("D1", "Broken stitch", "major").await;
    app.seed_defect("D2", "Skipped stitch", "minor").await;
    let id = app.create_entry(entry("OP-001", "L1", Some("M-100"), "operator")).await;

    let (status, body) = app
        .record_hours(
            &id,
            json!([
                { "hour": "08-09", "productionCount": 50, "defects": [
                    { "defectCode": "D1", "count": 1 },
                    { "defectCode": "D1", "count": 2 }
                ] },
                { "hour": "09-10", "productionCount": 45, "defects": [
                    { "defectCode": "D2", "count": 1 },
                    { "defectCode": "D1", "count": 4 }
                ] }
            ]),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let hours = body["data"]["hourlyProduction"].as_array().unwrap();
    assert_eq!(hours[0]["defects"], json!([{ "defectCode": "D1", "count": 3 }]));
    assert_eq!(hours[1]["defects"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_hour_validation() {
    let app = setup_app().await;
    app.seed_operator("OP-001", "operator").await;
    let id = app.create_entry(entry("OP-001", "L1", Some("M-100"), "operator")).await;

    let (status, _) = app
        .record_hours(&id, json!([{ "hour": "08-09", "productionCount": -5 }]))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .record_hours(
            &id,
            json!([
                { "hour": "08-09", "productionCount": 5 },
                { "hour": "08-09", "productionCount": 6 }
            ]),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_hour_on_unknown_record() {
    let app = setup_app().await;

    let (status, body) = app
        .record_hours(
            "7d1c7bd4-3f0e-4d8e-9d62-0c0b8f1f6a11",
            json!([{ "hour": "08-09", "productionCount": 5 }]),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "NOT_FOUND");
}

// =============================================================================
// Score ratchet
// =============================================================================

#[tokio::test]
async fn test_score_ratchet() {
    let app = setup_app().await;
    app.seed_operator("OP-001", "operator").await;
    let id = app.create_entry(entry("OP-001", "L1", Some("M-100"), "operator")).await;

    // First observation sets the score without a history entry
    app.record_hours(&id, json!([{ "hour": "08-09", "productionCount": 40 }]))
        .await;
    let (_, body) = app.get("/operators/OP-001").await;
    assert_eq!(body["data"]["processScores"]["sewing-collar"], 40);
    let (_, body) = app.get("/operators/OP-001/score-history").await;
    assert_eq!(body["data"], json!([]));

    // Lower observation leaves the score alone
    app.record_hours(&id, json!([{ "hour": "09-10", "productionCount": 35 }]))
        .await;
    let (_, body) = app.get("/operators/OP-001").await;
    assert_eq!(body["data"]["processScores"]["sewing-collar"], 40);
    let (_, body) = app.get("/operators/OP-001/score-history").await;
    assert_eq!(body["data"], json!([]));

    // Higher observation replaces it and logs the old value
    app.record_hours(&id, json!([{ "hour": "10-11", "productionCount": 55 }]))
        .await;
    let (_, body) = app.get("/operators/OP-001").await;
    assert_eq!(body["data"]["processScores"]["sewing-collar"], 55);

    let (status, body) = app.get("/operators/OP-001/score-history").await;
    assert_eq!(status, StatusCode::OK);
    let history = body["data"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["processName"], "sewing-collar");
    assert_eq!(history[0]["previousScore"], 40);
    assert_eq!(history[0]["newScore"], 55);
    assert_eq!(history[0]["line"], "L1");
    assert_eq!(history[0]["date"], DAY);
}

#[tokio::test]
async fn test_score_uses_process_override() {
    let app = setup_app().await;
    app.seed_operator("OP-001", "operator").await;
    let id = app.create_entry(entry("OP-001", "L1", Some("M-100"), "operator")).await;

    app.record_hours(
        &id,
        json!([{ "hour": "08-09", "productionCount": 70, "process": "button-attach" }]),
    )
    .await;

    let (_, body) = app.get("/operators/OP-001").await;
    assert_eq!(body["data"]["processScores"]["button-attach"], 70);
    assert!(body["data"]["processScores"]["sewing-collar"].is_null());
}

#[tokio::test]
async fn test_score_history_unknown_operator() {
    let app = setup_app().await;

    let (status, _) = app.get("/operators/OP-404/score-history").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
