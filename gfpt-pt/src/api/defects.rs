//! Defect catalog endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use gfpt_common::{api::ApiResponse, time};
use serde::Deserialize;

use crate::db::defects;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::models::{Defect, Severity};
use crate::AppState;

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct CreateDefectRequest {
    pub code: String,
    pub name: String,
    pub severity: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

/// POST /defects
pub async fn create_defect(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateDefectRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Defect>>)> {
    let code = request.code.trim();
    if code.is_empty() || request.name.trim().is_empty() {
        return Err(ApiError::BadRequest("code and name are required".to_string()));
    }
    let severity = Severity::parse(&request.severity).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "severity must be minor, major or critical, got '{}'",
            request.severity
        ))
    })?;

    let defect = Defect {
        code: code.to_string(),
        name: request.name.trim().to_string(),
        severity,
        active: request.active,
        created_at: time::now(),
    };

    defects::insert_defect(&state.db, &defect)
        .await
        .map_err(|e| {
            if e.is_unique_violation() {
                ApiError::Conflict(format!("Defect '{}' already exists", defect.code))
            } else {
                e.into()
            }
        })?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(defect))))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefectListQuery {
    #[serde(default)]
    pub active_only: bool,
}

/// GET /defects?activeOnly
pub async fn list_defects(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DefectListQuery>,
) -> ApiResult<Json<ApiResponse<Vec<Defect>>>> {
    let defects = defects::list_defects(&state.db, query.active_only).await?;
    Ok(Json(ApiResponse::ok(defects)))
}

#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub active: bool,
}

/// PUT /defects/:code/active
pub async fn set_defect_active(
    State(state): State<AppState>,
    Path(code): Path<String>,
    ApiJson(request): ApiJson<SetActiveRequest>,
) -> ApiResult<Json<ApiResponse<Defect>>> {
    if !defects::set_active(&state.db, &code, request.active).await? {
        return Err(ApiError::NotFound(format!("Defect '{}' not found", code)));
    }

    let mut conn = state.db.acquire().await?;
    let defect = defects::find_defect(&mut conn, &code)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Defect '{}' not found", code)))?;

    Ok(Json(ApiResponse::ok(defect)))
}
