//! Request and Response models for the administrative API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{ClearParams, InvalidateRequest};
pub use responses::{
    ErrorResponse, FlushResponse, HealthResponse, InvalidateResponse, StatsResponse,
    TierStatsResponse,
};
