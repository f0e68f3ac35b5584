//! HTTP API handlers for gfpt-pt

pub mod buildinfo;
pub mod daily_production;
pub mod defects;
pub mod health;
pub mod layout;
pub mod line_transfer;
pub mod machines;
pub mod notifications;
pub mod operators;
pub mod reports;

use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// Parse a UUID path segment, reporting failures in the API envelope
pub(crate) fn parse_id(field: &str, value: &str) -> ApiResult<Uuid> {
    gfpt_common::uuid_utils::parse(value)
        .map_err(|_| ApiError::BadRequest(format!("{} '{}' is not a valid id", field, value)))
}

/// Treat blank optional query values as absent
pub(crate) fn blank_to_none(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
