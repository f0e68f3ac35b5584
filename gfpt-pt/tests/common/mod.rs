//! Shared helpers for gfpt-pt integration tests
//!
//! Every test gets a private in-memory database with the full schema.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use gfpt_common::EventBus;
use gfpt_pt::{build_router, AppState};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower::util::ServiceExt; // for `oneshot`

pub const DAY: &str = "2024-05-01";

pub struct TestApp {
    pub router: Router,
    pub db: SqlitePool,
    pub event_bus: EventBus,
}

pub async fn setup_app() -> TestApp {
    let db = gfpt_common::db::init_memory_database()
        .await
        .expect("Should create in-memory database");
    let event_bus = EventBus::new(64);
    let router = build_router(AppState::new(db.clone(), event_bus.clone()));

    TestApp {
        router,
        db,
        event_bus,
    }
}

impl TestApp {
    /// Send a request and return status plus parsed JSON body
    pub async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Should read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("Should parse JSON")
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send("GET", uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send("PUT", uri, Some(body)).await
    }

    pub async fn seed_operator(&self, external_id: &str, designation: &str) {
        let (status, body) = self
            .post(
                "/operators",
                json!({
                    "externalId": external_id,
                    "name": format!("Worker {}", external_id),
                    "designation": designation,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "seed operator failed: {}", body);
    }

    pub async fn seed_defect(&self, code: &str, name: &str, severity: &str) {
        let (status, body) = self
            .post(
                "/defects",
                json!({ "code": code, "name": name, "severity": severity }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "seed defect failed: {}", body);
    }

    /// Create an entry and return the new record's id
    pub async fn create_entry(&self, body: Value) -> String {
        let (status, response) = self.post("/daily-production", body).await;
        assert_eq!(status, StatusCode::CREATED, "create entry failed: {}", response);
        response["data"]["id"].as_str().unwrap().to_string()
    }

    pub async fn record_hours(&self, record_id: &str, hours: Value) -> (StatusCode, Value) {
        self.put(
            "/daily-production/update-hourly",
            json!({ "id": record_id, "hourlyProduction": hours }),
        )
        .await
    }
}

/// Request body for a daily entry with sensible defaults
pub fn entry(operator_id: &str, line: &str, machine_id: Option<&str>, work_as: &str) -> Value {
    json!({
        "date": DAY,
        "operatorId": operator_id,
        "supervisor": "Karim",
        "floor": "F1",
        "line": line,
        "buyerId": "B-10",
        "styleId": "ST-77",
        "process": "sewing-collar",
        "machineId": machine_id,
        "workAs": work_as,
        "target": 500,
    })
}

/// Assert the error envelope and return its code
pub fn error_code(body: &Value) -> &str {
    assert_eq!(body["success"], false, "expected error envelope: {}", body);
    body["error"]["code"].as_str().expect("error code")
}
