//! Shared HTTP API types
//!
//! Framework-free response envelopes used by every GFPT service. Each
//! service wraps them in its own axum `IntoResponse` implementations.

pub mod types;

pub use types::{ApiResponse, ErrorBody, ErrorDetail};
