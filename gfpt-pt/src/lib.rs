//! gfpt-pt library - Production Tracking service
//!
//! Daily production entry, hourly output and defect capture, operator line
//! transfers, production reports, and the registries they depend on.

use axum::Router;
use chrono::{DateTime, Utc};
use gfpt_common::EventBus;
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod extract;
pub mod models;
pub mod services;

/// Capacity of the in-process event bus
pub const EVENT_BUS_CAPACITY: usize = 256;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Production and servicing events for SSE subscribers
    pub event_bus: EventBus,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, event_bus: EventBus) -> Self {
        Self {
            db,
            event_bus,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post, put};

    let production = Router::new()
        .route(
            "/daily-production",
            post(api::daily_production::create_entry).get(api::daily_production::list_entries),
        )
        .route(
            "/daily-production/update-hourly",
            put(api::daily_production::update_hourly),
        )
        .route("/daily-production/:id", get(api::daily_production::get_entry))
        .route(
            "/operator-line-transfer/transfer",
            put(api::line_transfer::transfer_operator),
        )
        .route(
            "/operator-line-transfer/history",
            get(api::line_transfer::transfer_history),
        );

    let reports = Router::new()
        .route(
            "/report/line-wise-production",
            get(api::reports::line_wise_production),
        )
        .route(
            "/report/floor-wise-production",
            get(api::reports::floor_wise_production),
        )
        .route(
            "/report/present-absent-operator-list",
            get(api::reports::attendance),
        )
        .route("/report/role-mismatch", get(api::reports::role_mismatch))
        .route(
            "/report/highest-achievement",
            get(api::reports::highest_achievement),
        )
        .route("/defects/search", post(api::reports::search_defects));

    let registries = Router::new()
        .route(
            "/operators",
            post(api::operators::create_operator).get(api::operators::list_operators),
        )
        .route("/operators/:external_id", get(api::operators::get_operator))
        .route(
            "/operators/:external_id/score-history",
            get(api::operators::score_history),
        )
        .route(
            "/defects",
            post(api::defects::create_defect).get(api::defects::list_defects),
        )
        .route("/defects/:code/active", put(api::defects::set_defect_active))
        .route(
            "/floors",
            post(api::layout::create_floor).get(api::layout::list_floors),
        )
        .route(
            "/lines",
            post(api::layout::create_line).get(api::layout::list_lines),
        )
        .route(
            "/machines",
            post(api::machines::create_machine).get(api::machines::list_machines),
        )
        .route("/machines/:machine_id/parts", post(api::machines::add_part))
        .route(
            "/machine-parts/:id/serviced",
            put(api::machines::mark_serviced),
        );

    let notifications = Router::new()
        .route(
            "/notifications",
            get(api::notifications::list_notifications),
        )
        .route(
            "/notifications/:id/seen",
            put(api::notifications::mark_seen),
        )
        .route(
            "/notifications/events",
            get(api::notifications::event_stream),
        );

    Router::new()
        .merge(production)
        .merge(reports)
        .merge(registries)
        .merge(notifications)
        .merge(api::health::health_routes())
        .route("/buildinfo", get(api::buildinfo::get_build_info))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
