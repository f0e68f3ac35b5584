//! Floor and line registry endpoints

use axum::{extract::State, http::StatusCode, Json};
use gfpt_common::{api::ApiResponse, time};
use serde::Deserialize;

use super::blank_to_none;
use crate::db::layout;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::models::{Floor, Line};
use crate::AppState;

fn conflict_or(err: gfpt_common::Error, message: String) -> ApiError {
    if err.is_unique_violation() {
        ApiError::Conflict(message)
    } else {
        err.into()
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateFloorRequest {
    pub name: String,
}

/// POST /floors
pub async fn create_floor(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateFloorRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Floor>>)> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }

    let floor = Floor {
        name: name.to_string(),
        created_at: time::now(),
    };
    layout::insert_floor(&state.db, &floor)
        .await
        .map_err(|e| conflict_or(e, format!("Floor '{}' already exists", floor.name)))?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(floor))))
}

/// GET /floors
pub async fn list_floors(State(state): State<AppState>) -> ApiResult<Json<ApiResponse<Vec<Floor>>>> {
    Ok(Json(ApiResponse::ok(layout::list_floors(&state.db).await?)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLineRequest {
    pub line_id: String,
    pub floor: String,
}

/// POST /lines
pub async fn create_line(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateLineRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Line>>)> {
    let line_id = request.line_id.trim();
    let floor = request.floor.trim();
    if line_id.is_empty() || floor.is_empty() {
        return Err(ApiError::BadRequest("lineId and floor are required".to_string()));
    }

    let line = Line {
        line_id: line_id.to_string(),
        floor: floor.to_string(),
        created_at: time::now(),
    };
    layout::insert_line(&state.db, &line)
        .await
        .map_err(|e| conflict_or(e, format!("Line '{}' already exists", line.line_id)))?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(line))))
}

#[derive(Debug, Deserialize)]
pub struct LineListQuery {
    pub floor: Option<String>,
}

/// GET /lines?floor
pub async fn list_lines(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<LineListQuery>,
) -> ApiResult<Json<ApiResponse<Vec<Line>>>> {
    let lines = layout::list_lines(&state.db, blank_to_none(&query.floor)).await?;
    Ok(Json(ApiResponse::ok(lines)))
}
