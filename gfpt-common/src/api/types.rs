//! Shared API request/response types
//!
//! Every response carries a `success` flag. Successful bodies put the
//! payload under `data`; failures carry an `error` object with a stable
//! code and a human-readable message.

use serde::{Deserialize, Serialize};

/// Success envelope
///
/// # Examples
///
/// ```
/// use gfpt_common::api::types::ApiResponse;
///
/// let body = ApiResponse::with_message(42, "Saved");
/// assert!(body.success);
/// assert_eq!(body.data, 42);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data,
        }
    }
}

/// Error detail inside [`ErrorBody`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Stable error identifier (e.g. `BAD_REQUEST`)
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

/// Failure envelope
///
/// # Examples
///
/// ```
/// use gfpt_common::api::types::ErrorBody;
///
/// let body = ErrorBody::new("NOT_FOUND", "Production record not found");
/// assert!(!body.success);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: ErrorDetail,
}

impl ErrorBody {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope_omits_empty_message() {
        let json = serde_json::to_value(ApiResponse::ok(vec![1, 2, 3])).unwrap();
        assert_eq!(json["success"], true);
        assert!(json.get("message").is_none());
        assert_eq!(json["data"][2], 3);
    }

    #[test]
    fn test_error_envelope_shape() {
        let json = serde_json::to_value(ErrorBody::new("CONFLICT", "Duplicate entry")).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "CONFLICT");
        assert_eq!(json["error"]["message"], "Duplicate entry");
    }
}
