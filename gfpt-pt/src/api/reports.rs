//! Report endpoints

use axum::{extract::State, Json};
use gfpt_common::api::ApiResponse;
use serde::Deserialize;

use super::blank_to_none;
use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery};
use crate::models::report::{
    AttendanceReport, FloorWiseReport, HighestAchievements, LineWiseReport,
    OperatorDefectReport, RoleMismatch,
};
use crate::services::ReportingService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LineWiseQuery {
    pub date: String,
    pub floor: Option<String>,
    pub supervisor: Option<String>,
}

/// GET /report/line-wise-production?date&floor&supervisor
pub async fn line_wise_production(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<LineWiseQuery>,
) -> ApiResult<Json<ApiResponse<LineWiseReport>>> {
    let report = ReportingService::new(state.db.clone())
        .line_wise(
            &query.date,
            blank_to_none(&query.floor),
            blank_to_none(&query.supervisor),
        )
        .await?;

    Ok(Json(ApiResponse::ok(report)))
}

#[derive(Debug, Deserialize)]
pub struct DateQuery {
    pub date: String,
}

/// GET /report/floor-wise-production?date
pub async fn floor_wise_production(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DateQuery>,
) -> ApiResult<Json<ApiResponse<FloorWiseReport>>> {
    let report = ReportingService::new(state.db.clone())
        .floor_wise(&query.date)
        .await?;

    Ok(Json(ApiResponse::ok(report)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefectSearchRequest {
    pub operator_id: String,
    pub start_date: String,
    pub end_date: String,
}

/// POST /defects/search
pub async fn search_defects(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<DefectSearchRequest>,
) -> ApiResult<Json<ApiResponse<OperatorDefectReport>>> {
    let report = ReportingService::new(state.db.clone())
        .operator_defects(&request.operator_id, &request.start_date, &request.end_date)
        .await?;

    Ok(Json(ApiResponse::ok(report)))
}

/// GET /report/present-absent-operator-list?date
pub async fn attendance(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DateQuery>,
) -> ApiResult<Json<ApiResponse<AttendanceReport>>> {
    let report = ReportingService::new(state.db.clone())
        .attendance(&query.date)
        .await?;

    Ok(Json(ApiResponse::ok(report)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleMismatchQuery {
    pub date: String,
    pub designation: Option<String>,
    pub work_as: Option<String>,
}

/// GET /report/role-mismatch?date&designation&workAs
pub async fn role_mismatch(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<RoleMismatchQuery>,
) -> ApiResult<Json<ApiResponse<Vec<RoleMismatch>>>> {
    let rows = ReportingService::new(state.db.clone())
        .role_mismatch(
            &query.date,
            blank_to_none(&query.designation),
            blank_to_none(&query.work_as),
        )
        .await?;

    Ok(Json(ApiResponse::ok(rows)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementQuery {
    pub operator_id: String,
    pub process: String,
}

/// GET /report/highest-achievement?operatorId&process
pub async fn highest_achievement(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AchievementQuery>,
) -> ApiResult<Json<ApiResponse<HighestAchievements>>> {
    let report = ReportingService::new(state.db.clone())
        .highest_achievements(&query.operator_id, &query.process)
        .await?;

    Ok(Json(ApiResponse::ok(report)))
}
