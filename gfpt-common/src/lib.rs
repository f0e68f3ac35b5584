//! # GFPT Common Library
//!
//! Shared code for the garment factory production tracker services:
//! - Error and result types
//! - Configuration loading and root folder resolution
//! - Database initialization and migrations
//! - Event bus and SSE helpers
//! - Calendar-day and UUID utilities

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod sse;
pub mod time;
pub mod uuid_utils;

pub use error::{Error, Result};
pub use events::{EventBus, GfptEvent};
