//! HTTP handlers, one module per resource

pub mod deployment;
pub mod logs;
pub mod monitoring;
pub mod notifications;
pub mod session;
pub mod sites;
pub mod system;
pub mod users;

use axum::response::{IntoResponse, Json};

use crate::ApiResponse;

pub async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION")
    })))
}
