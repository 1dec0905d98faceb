//! # API Shared
//!
//! Shared utilities and definitions for the LIMS APIs.
//!
//! Contains:
//! - Request/response bodies with OpenAPI schemas (`dto` module)
//! - Shared services like `HealthService`
//! - API key validation

pub mod auth;
pub mod dto;
pub mod health;

pub use auth::{validate_api_key, AuthError};
pub use dto::*;
pub use health::HealthService;
