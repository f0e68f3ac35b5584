//! Service notification endpoints

use axum::{
    extract::{Path, State},
    response::sse::{Event, Sse},
    Json,
};
use futures::stream::Stream;
use gfpt_common::api::ApiResponse;
use serde::Deserialize;
use std::convert::Infallible;

use super::parse_id;
use crate::db::notifications;
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiQuery;
use crate::models::ServiceNotification;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    #[serde(default)]
    pub unseen_only: bool,
}

/// GET /notifications?unseenOnly
pub async fn list_notifications(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<NotificationQuery>,
) -> ApiResult<Json<ApiResponse<Vec<ServiceNotification>>>> {
    let list = notifications::list_notifications(&state.db, query.unseen_only).await?;
    Ok(Json(ApiResponse::ok(list)))
}

/// PUT /notifications/:id/seen
pub async fn mark_seen(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<bool>>> {
    let id = parse_id("id", &id)?;
    if !notifications::mark_seen(&state.db, id).await? {
        return Err(ApiError::NotFound(format!("Notification {} not found", id)));
    }
    Ok(Json(ApiResponse::with_message(true, "Notification marked seen")))
}

/// GET /notifications/events
///
/// Streams `ServiceDue` and the production events published on the bus.
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    gfpt_common::sse::create_event_sse_stream(&state.event_bus, "gfpt-pt")
}
