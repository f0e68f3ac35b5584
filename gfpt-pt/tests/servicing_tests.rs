//! Integration tests for the machine servicing poll and notifications

mod common;

use axum::http::StatusCode;
use chrono::NaiveDate;
use common::{setup_app, TestApp};
use gfpt_common::GfptEvent;
use gfpt_pt::services::servicing::{run_servicing_scan, spawn_servicing_poll};
use serde_json::json;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
}

/// M-100 with a needle bar due 2024-05-01 and a bobbin case due much later
async fn setup_machine(app: &TestApp) -> String {
    let (status, body) = app
        .post(
            "/machines",
            json!({
                "machineId": "M-100",
                "machineType": "lockstitch",
                "parts": [
                    { "partName": "needle bar", "serviceIntervalDays": 30, "lastServiced": "2024-04-01" },
                    { "partName": "bobbin case", "serviceIntervalDays": 180, "lastServiced": "2024-04-01" }
                ]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);

    body["data"]["parts"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["partName"] == "needle bar")
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_scan_is_idempotent() {
    let app = setup_app().await;
    setup_machine(&app).await;

    let first = run_servicing_scan(&app.db, &app.event_bus, day(1)).await.unwrap();
    let second = run_servicing_scan(&app.db, &app.event_bus, day(1)).await.unwrap();

    assert_eq!(first.len(), 1);
    assert!(second.is_empty());

    let (_, body) = app.get("/notifications?unseenOnly=true").await;
    let unseen = body["data"].as_array().unwrap();
    assert_eq!(unseen.len(), 1);
    assert_eq!(unseen[0]["machineId"], "M-100");
    assert!(unseen[0]["message"].as_str().unwrap().contains("needle bar"));
}

#[tokio::test]
async fn test_part_not_yet_due() {
    let app = setup_app().await;
    setup_machine(&app).await;

    let created = run_servicing_scan(&app.db, &app.event_bus, day(1).pred_opt().unwrap())
        .await
        .unwrap();

    assert!(created.is_empty());
}

#[tokio::test]
async fn test_seen_notification_allows_a_new_one() {
    let app = setup_app().await;
    setup_machine(&app).await;

    let created = run_servicing_scan(&app.db, &app.event_bus, day(1)).await.unwrap();
    let id = created[0].id;

    let (status, _) = app
        .send("PUT", &format!("/notifications/{}/seen", id), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let again = run_servicing_scan(&app.db, &app.event_bus, day(2)).await.unwrap();
    assert_eq!(again.len(), 1);

    let (_, body) = app.get("/notifications").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_servicing_a_part_clears_and_reschedules() {
    let app = setup_app().await;
    let part_id = setup_machine(&app).await;
    run_servicing_scan(&app.db, &app.event_bus, day(1)).await.unwrap();

    let (status, body) = app
        .put(
            &format!("/machine-parts/{}/serviced", part_id),
            json!({ "servicedOn": "2024-05-03" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["lastServiced"], "2024-05-03");
    assert_eq!(body["data"]["nextServiceDate"], "2024-06-02");

    let (_, body) = app.get("/notifications?unseenOnly=true").await;
    assert_eq!(body["data"], json!([]));

    let created = run_servicing_scan(&app.db, &app.event_bus, day(3)).await.unwrap();
    assert!(created.is_empty());
}

#[tokio::test]
async fn test_unknown_part_and_notification() {
    let app = setup_app().await;
    let unknown = "7d1c7bd4-3f0e-4d8e-9d62-0c0b8f1f6a11";

    let (status, _) = app
        .put(&format!("/machine-parts/{}/serviced", unknown), json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send("PUT", &format!("/notifications/{}/seen", unknown), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_scan_broadcasts_service_due() {
    let app = setup_app().await;
    setup_machine(&app).await;
    let mut rx = app.event_bus.subscribe();

    let created = run_servicing_scan(&app.db, &app.event_bus, day(1)).await.unwrap();

    match rx.recv().await.unwrap() {
        GfptEvent::ServiceDue {
            notification_id,
            machine_id,
            part_name,
            ..
        } => {
            assert_eq!(notification_id, created[0].id);
            assert_eq!(machine_id, "M-100");
            assert_eq!(part_name, "needle bar");
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_poll_runs_and_stops_on_cancel() {
    let app = setup_app().await;
    // Due date long past, so the real clock finds it overdue
    setup_machine(&app).await;
    let mut rx = app.event_bus.subscribe();

    let cancel = CancellationToken::new();
    let handle = spawn_servicing_poll(
        app.db.clone(),
        app.event_bus.clone(),
        Duration::from_secs(3600),
        cancel.clone(),
    );

    let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("first tick should scan immediately")
        .unwrap();
    assert_eq!(event.event_type(), "ServiceDue");

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("poll should stop after cancel")
        .unwrap();
}
