//! # genhub-api
//!
//! HTTP API layer for GenHub built on Axum.
//!
//! Provides the job submission and polling endpoints, read-only admin
//! diagnostics, middleware (CORS, logging, compression, timeouts),
//! extractors, DTOs, and error mapping.

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
