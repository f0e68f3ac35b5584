//! Operator line transfer endpoints

use axum::{extract::State, Json};
use gfpt_common::api::ApiResponse;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery};
use crate::models::ProductionRecord;
use crate::services::{LineTransferService, TransferRequest};
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferResponse {
    pub success: bool,
    pub message: String,
    pub net_minutes_saved: i64,
    pub record: ProductionRecord,
    pub history: ProductionRecord,
}

/// PUT /operator-line-transfer/transfer
pub async fn transfer_operator(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<TransferRequest>,
) -> ApiResult<Json<TransferResponse>> {
    let service = LineTransferService::new(state.db.clone(), state.event_bus.clone());
    let outcome = service.transfer(&request).await?;

    Ok(Json(TransferResponse {
        success: true,
        message: format!(
            "Operator moved from {} to {}, {} minutes banked",
            outcome.history.line, outcome.record.line, outcome.net_minutes_saved
        ),
        net_minutes_saved: outcome.net_minutes_saved,
        record: outcome.record,
        history: outcome.history,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub operator_id: String,
    pub date: String,
}

/// GET /operator-line-transfer/history?operatorId&date
pub async fn transfer_history(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<HistoryQuery>,
) -> ApiResult<Json<ApiResponse<Vec<ProductionRecord>>>> {
    let service = LineTransferService::new(state.db.clone(), state.event_bus.clone());
    let records = service.history(&query.operator_id, &query.date).await?;

    Ok(Json(ApiResponse::ok(records)))
}
