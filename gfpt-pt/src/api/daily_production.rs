//! Daily production entry endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use gfpt_common::{api::ApiResponse, time};
use serde::Deserialize;

use super::{blank_to_none, parse_id};
use crate::db::production::{self, RecordFilter};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::models::ProductionRecord;
use crate::services::{
    CreateEntryRequest, DailyEntryService, HourlyUpdateRequest, HourlyUpdateService,
};
use crate::AppState;

/// POST /daily-production
pub async fn create_entry(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateEntryRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<ProductionRecord>>)> {
    let service = DailyEntryService::new(state.db.clone(), state.event_bus.clone());
    let record = service.create_entry(&request).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(record, "Production entry created")),
    ))
}

/// PUT /daily-production/update-hourly
pub async fn update_hourly(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<HourlyUpdateRequest>,
) -> ApiResult<Json<ApiResponse<ProductionRecord>>> {
    let service = HourlyUpdateService::new(state.db.clone(), state.event_bus.clone());
    let record = service.record_hours(&request).await?;

    Ok(Json(ApiResponse::with_message(record, "Hourly production updated")))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub date: Option<String>,
    pub line: Option<String>,
    pub floor: Option<String>,
}

/// GET /daily-production?date&line&floor
pub async fn list_entries(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Json<ApiResponse<Vec<ProductionRecord>>>> {
    let date = blank_to_none(&query.date)
        .ok_or_else(|| ApiError::BadRequest("date is required".to_string()))?;

    let filter = RecordFilter {
        line: blank_to_none(&query.line).map(str::to_string),
        floor: blank_to_none(&query.floor).map(str::to_string),
        ..RecordFilter::for_day(time::parse_day(date)?)
    };

    let records = production::list_records(&state.db, &filter).await?;
    Ok(Json(ApiResponse::ok(records)))
}

/// GET /daily-production/:id
pub async fn get_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<ProductionRecord>>> {
    let id = parse_id("id", &id)?;

    let mut conn = state.db.acquire().await?;
    let record = production::load_record(&mut conn, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Production record {} not found", id)))?;

    Ok(Json(ApiResponse::ok(record)))
}
