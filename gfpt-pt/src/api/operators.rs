//! Operator registry endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use gfpt_common::{api::ApiResponse, time, uuid_utils};
use serde::Deserialize;
use std::collections::HashMap;

use crate::db::operators;
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::models::{Operator, ScoreHistoryEntry};
use crate::services::ReportingService;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOperatorRequest {
    pub external_id: String,
    pub name: String,
    pub designation: String,
}

/// POST /operators
pub async fn create_operator(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateOperatorRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Operator>>)> {
    for (field, value) in [
        ("externalId", &request.external_id),
        ("name", &request.name),
        ("designation", &request.designation),
    ] {
        if value.trim().is_empty() {
            return Err(ApiError::BadRequest(format!("{} is required", field)));
        }
    }

    let operator = Operator {
        id: uuid_utils::generate(),
        external_id: request.external_id.trim().to_string(),
        name: request.name.trim().to_string(),
        designation: request.designation.trim().to_string(),
        process_scores: HashMap::new(),
        last_scan: None,
        created_at: time::now(),
    };

    operators::insert_operator(&state.db, &operator)
        .await
        .map_err(|e| {
            if e.is_unique_violation() {
                ApiError::Conflict(format!("Operator '{}' already exists", operator.external_id))
            } else {
                e.into()
            }
        })?;

    tracing::info!(operator_id = %operator.external_id, "Operator registered");

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(operator))))
}

/// GET /operators
pub async fn list_operators(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<Operator>>>> {
    let operators = operators::list_operators(&state.db).await?;
    Ok(Json(ApiResponse::ok(operators)))
}

/// GET /operators/:externalId
pub async fn get_operator(
    State(state): State<AppState>,
    Path(external_id): Path<String>,
) -> ApiResult<Json<ApiResponse<Operator>>> {
    let mut conn = state.db.acquire().await?;
    let operator = operators::find_by_external_id(&mut conn, &external_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Operator '{}' not found", external_id)))?;

    Ok(Json(ApiResponse::ok(operator)))
}

/// GET /operators/:externalId/score-history
pub async fn score_history(
    State(state): State<AppState>,
    Path(external_id): Path<String>,
) -> ApiResult<Json<ApiResponse<Vec<ScoreHistoryEntry>>>> {
    let history = ReportingService::new(state.db.clone())
        .score_history(&external_id)
        .await?;

    Ok(Json(ApiResponse::ok(history)))
}
