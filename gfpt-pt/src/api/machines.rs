//! Machine registry and servicing endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use gfpt_common::{api::ApiResponse, time, uuid_utils};
use serde::Deserialize;

use super::parse_id;
use crate::db::machines;
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::models::machine::next_service_date;
use crate::models::{Machine, MachinePart};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartRequest {
    pub part_name: String,
    pub service_interval_days: i64,
    pub last_serviced: String,
}

impl PartRequest {
    fn into_part(self, machine_id: &str) -> ApiResult<MachinePart> {
        let part_name = self.part_name.trim();
        if part_name.is_empty() {
            return Err(ApiError::BadRequest("partName is required".to_string()));
        }
        if self.service_interval_days <= 0 {
            return Err(ApiError::BadRequest(format!(
                "serviceIntervalDays must be positive, got {}",
                self.service_interval_days
            )));
        }
        let last_serviced = time::parse_day(&self.last_serviced)?;

        Ok(MachinePart {
            id: uuid_utils::generate(),
            machine_id: machine_id.to_string(),
            part_name: part_name.to_string(),
            service_interval_days: self.service_interval_days,
            last_serviced,
            next_service_date: next_service_date(last_serviced, self.service_interval_days)?,
            active: true,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMachineRequest {
    pub machine_id: String,
    pub machine_type: String,
    #[serde(default)]
    pub floor: Option<String>,
    #[serde(default)]
    pub line: Option<String>,
    #[serde(default)]
    pub parts: Vec<PartRequest>,
}

/// POST /machines
pub async fn create_machine(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateMachineRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Machine>>)> {
    let machine_id = request.machine_id.trim().to_string();
    if machine_id.is_empty() || request.machine_type.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "machineId and machineType are required".to_string(),
        ));
    }

    let parts = request
        .parts
        .into_iter()
        .map(|p| p.into_part(&machine_id))
        .collect::<ApiResult<Vec<_>>>()?;

    let machine = Machine {
        machine_id,
        machine_type: request.machine_type.trim().to_string(),
        floor: super::blank_to_none(&request.floor).map(str::to_string),
        line: super::blank_to_none(&request.line).map(str::to_string),
        active: true,
        parts,
        created_at: time::now(),
    };

    machines::insert_machine(&state.db, &machine)
        .await
        .map_err(|e| {
            if e.is_unique_violation() {
                ApiError::Conflict(format!("Machine '{}' already exists", machine.machine_id))
            } else {
                e.into()
            }
        })?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(machine))))
}

/// GET /machines
pub async fn list_machines(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<Machine>>>> {
    Ok(Json(ApiResponse::ok(machines::list_machines(&state.db).await?)))
}

/// POST /machines/:machineId/parts
pub async fn add_part(
    State(state): State<AppState>,
    Path(machine_id): Path<String>,
    ApiJson(request): ApiJson<PartRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<MachinePart>>)> {
    let part = request.into_part(&machine_id)?;
    machines::insert_part(&state.db, &part).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(part))))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicedRequest {
    /// Defaults to today
    #[serde(default)]
    pub serviced_on: Option<String>,
}

/// PUT /machine-parts/:id/serviced
///
/// The body is optional; without one the part counts as serviced today.
pub async fn mark_serviced(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<ApiJson<ServicedRequest>>,
) -> ApiResult<Json<ApiResponse<MachinePart>>> {
    let id = parse_id("id", &id)?;
    let request = body.map(|ApiJson(request)| request).unwrap_or_default();
    let serviced_on = match super::blank_to_none(&request.serviced_on) {
        Some(day) => time::parse_day(day)?,
        None => time::today(),
    };

    let part = machines::mark_part_serviced(&state.db, id, serviced_on)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Machine part {} not found", id)))?;

    Ok(Json(ApiResponse::with_message(part, "Part marked serviced")))
}
